//! Token flow orchestration: session token, then authorization code, then access token.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use super::config::{validate, ClientRegistration, Credentials};
use super::gateway::IdentityGateway;
use super::http_client::OAuthHttpClient;
use super::sink::TokenSink;
use super::types::{AccessToken, VendorError};

/// Position of a single flow invocation.
///
/// `Complete` and `Aborted` are terminal. Nothing is retried from inside; a
/// retry is a new flow with a new verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    Start,
    AwaitingSessionToken,
    AwaitingAuthorizationCode,
    AwaitingAccessToken,
    Complete,
    Aborted(String),
}

impl FlowState {
    /// Next state on success. Terminal states stay put.
    pub fn advance(self) -> FlowState {
        match self {
            FlowState::Start => FlowState::AwaitingSessionToken,
            FlowState::AwaitingSessionToken => FlowState::AwaitingAuthorizationCode,
            FlowState::AwaitingAuthorizationCode => FlowState::AwaitingAccessToken,
            FlowState::AwaitingAccessToken => FlowState::Complete,
            terminal => terminal,
        }
    }

    /// Abort with `reason`. Terminal states stay put.
    pub fn abort(self, reason: impl Into<String>) -> FlowState {
        if self.is_terminal() { self } else { FlowState::Aborted(reason.into()) }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowState::Complete | FlowState::Aborted(_))
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowState::Start => write!(f, "start"),
            FlowState::AwaitingSessionToken => write!(f, "awaiting session token"),
            FlowState::AwaitingAuthorizationCode => write!(f, "awaiting authorization code"),
            FlowState::AwaitingAccessToken => write!(f, "awaiting access token"),
            FlowState::Complete => write!(f, "complete"),
            FlowState::Aborted(reason) => write!(f, "aborted: {reason}"),
        }
    }
}

/// Acquires access tokens for resource owners.
///
/// Reusable across flows: every call to [`TokenVendor::acquire`] owns its own
/// session token, verifier and code.
#[derive(Clone)]
pub struct TokenVendor<C> {
    gateway: IdentityGateway<C>,
    sink: Option<Arc<dyn TokenSink>>,
}

impl<C: OAuthHttpClient> TokenVendor<C> {
    pub fn new(http_client: C, registration: ClientRegistration) -> Self {
        TokenVendor { gateway: IdentityGateway::new(http_client, registration), sink: None }
    }

    /// Hand the access token to `sink` after every successful flow.
    pub fn with_sink(mut self, sink: Arc<dyn TokenSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn gateway(&self) -> &IdentityGateway<C> {
        &self.gateway
    }

    pub fn registration(&self) -> &ClientRegistration {
        self.gateway.registration()
    }

    /// Run one full flow. Any failure aborts the remaining steps and comes back unchanged.
    #[instrument(skip(self, credentials), fields(username = %credentials.username), level = "debug")]
    pub async fn acquire(&self, credentials: &Credentials) -> Result<AccessToken, VendorError> {
        let mut state = FlowState::Start;
        match self.run(credentials, &mut state).await {
            Ok(token) => {
                if let Some(sink) = &self.sink {
                    sink.on_token_received(&token.access_token);
                }
                Ok(token)
            }
            Err(e) => {
                state = state.abort(e.to_string());
                info!(%state, "token flow stopped");
                Err(e)
            }
        }
    }

    async fn run(&self, credentials: &Credentials, state: &mut FlowState) -> Result<AccessToken, VendorError> {
        validate(credentials, self.gateway.registration())?;

        transition(state);
        let session = self
            .gateway
            .exchange_credentials_for_session_token(&credentials.username, &credentials.password)
            .await?;

        transition(state);
        let authorization = self
            .gateway
            .exchange_session_token_for_authorization_code(&session.token)
            .await?;
        drop(session);

        transition(state);
        let token = self
            .gateway
            .exchange_authorization_code_for_access_token(&authorization.code_verifier, &authorization.code)
            .await?;

        transition(state);
        Ok(token)
    }
}

fn transition(state: &mut FlowState) {
    let next = std::mem::replace(state, FlowState::Start).advance();
    debug!(state = %next, "token flow advanced");
    *state = next;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_advance_in_protocol_order() {
        let mut state = FlowState::Start;
        let mut seen = vec![state.clone()];
        while !state.is_terminal() {
            state = state.advance();
            seen.push(state.clone());
        }
        assert_eq!(
            seen,
            vec![
                FlowState::Start,
                FlowState::AwaitingSessionToken,
                FlowState::AwaitingAuthorizationCode,
                FlowState::AwaitingAccessToken,
                FlowState::Complete,
            ]
        );
    }

    #[test]
    fn terminal_states_are_sticky() {
        assert_eq!(FlowState::Complete.advance(), FlowState::Complete);
        assert_eq!(FlowState::Complete.abort("late"), FlowState::Complete);

        let aborted = FlowState::AwaitingAuthorizationCode.abort("status 404");
        assert_eq!(aborted, FlowState::Aborted("status 404".to_string()));
        assert_eq!(aborted.clone().advance(), aborted);
        assert_eq!(aborted.clone().abort("again"), aborted);
    }
}
