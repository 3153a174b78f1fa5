//! Wire payloads, flow artifacts and the error taxonomy.

use std::fmt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status the authentication endpoint reports for a locked account.
pub const LOCKED_OUT: &str = "LOCKED_OUT";

/// Step 1 request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTokenRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub multi_optional_factor_enroll: bool,
    pub warn_before_password_expired: bool,
}

impl<'a> SessionTokenRequest<'a> {
    pub fn new(username: &'a str, password: &'a str) -> Self {
        SessionTokenRequest {
            username,
            password,
            multi_optional_factor_enroll: true,
            warn_before_password_expired: true,
        }
    }
}

/// Step 1 success payload: short-lived proof of primary authentication.
#[derive(Clone, Default, Deserialize, Serialize)]
pub struct SessionToken {
    #[serde(rename = "expiresAt", default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "sessionToken", default)]
    pub token: String,
}

impl SessionToken {
    pub fn is_locked_out(&self) -> bool {
        self.status == LOCKED_OUT
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("expires_at", &self.expires_at)
            .field("status", &self.status)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Step 2 result: the code together with the verifier whose challenge obtained it.
///
/// The pair must be redeemed together; a code is only valid with its own verifier.
#[derive(Clone)]
pub struct AuthorizationCode {
    pub code: String,
    pub code_verifier: String,
}

impl fmt::Debug for AuthorizationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationCode")
            .field("code", &self.code)
            .field("code_verifier", &"<redacted>")
            .finish()
    }
}

/// Step 3 success payload.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AccessToken {
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

impl fmt::Display for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Access Token:")?;
        writeln!(f)?;
        writeln!(f, "Type: {}", self.token_type)?;
        writeln!(f, "Expires In: {}", self.expires_in)?;
        writeln!(f, "Access Token: {}", self.access_token)?;
        write!(f, "Scope: {}", self.scope)
    }
}

/// Error envelope the identity provider returns in place of a success payload.
///
/// It can arrive with any status, 200 included.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderError {
    pub error_code: String,
    pub error_summary: String,
    pub error_link: String,
    pub error_id: String,
    pub error_causes: Vec<serde_json::Value>,
}

impl ProviderError {
    /// Whether the envelope actually names an error.
    pub fn is_present(&self) -> bool {
        !self.error_code.trim().is_empty()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Code: [{}] Summary: [{}]", self.error_code, self.error_summary)
    }
}

/// The three exchanges, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStep {
    SessionToken,
    AuthorizationCode,
    AccessToken,
}

impl fmt::Display for FlowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowStep::SessionToken => write!(f, "SESSION TOKEN"),
            FlowStep::AuthorizationCode => write!(f, "AUTHORIZATION CODE"),
            FlowStep::AccessToken => write!(f, "ACCESS TOKEN"),
        }
    }
}

/// Required configuration values, in the order they are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    Username,
    Password,
    ClientId,
    Issuer,
    RedirectUri,
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingField::Username | MissingField::Password => {
                write!(f, "You must specify both your username and password")
            }
            MissingField::ClientId => write!(f, "You must specify a CLIENT ID"),
            MissingField::Issuer => write!(f, "You must specify an ISSUER"),
            MissingField::RedirectUri => write!(f, "You must specify a Redirect URI"),
        }
    }
}

/// Everything that can abort a token flow.
#[derive(Debug, thiserror::Error)]
pub enum VendorError {
    /// Required configuration missing; raised before any request is sent.
    #[error("{0}")]
    Validation(MissingField),
    /// The transport could not produce a response.
    #[error("request for the {step} failed: {message}")]
    Transport { step: FlowStep, message: String },
    /// The provider answered with an error envelope.
    #[error("error received from the identity provider while fetching the {step}: {error}")]
    Provider { step: FlowStep, error: ProviderError },
    /// The authentication endpoint reported the account as locked.
    #[error("issuer is reporting LOCKED_OUT")]
    LockedOut,
    /// A step succeeded on the wire but returned a blank token.
    #[error("failed to retrieve the {step}")]
    EmptyToken { step: FlowStep },
    /// The authorize step returned no code.
    #[error("failed to retrieve the AUTHORIZATION CODE")]
    EmptyCode,
    /// The authorize step answered with something other than 200 or 302.
    #[error("something unexpected occurred. Status Code [{0}]")]
    UnexpectedStatus(u16),
    /// An issuer or redirect location did not parse.
    #[error("malformed URL: {0}")]
    MalformedUrl(String),
    /// A success payload did not match its schema.
    #[error("could not decode the {step} response: {message}")]
    Decode { step: FlowStep, message: String },
}

impl VendorError {
    /// The step this error belongs to, if it happened during an exchange.
    pub fn step(&self) -> Option<FlowStep> {
        match self {
            VendorError::Validation(_) => None,
            VendorError::Transport { step, .. }
            | VendorError::Provider { step, .. }
            | VendorError::EmptyToken { step }
            | VendorError::Decode { step, .. } => Some(*step),
            VendorError::LockedOut => Some(FlowStep::SessionToken),
            VendorError::EmptyCode | VendorError::UnexpectedStatus(_) => Some(FlowStep::AuthorizationCode),
            VendorError::MalformedUrl(_) => None,
        }
    }

    /// Provider envelope carried by this error, if any.
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            VendorError::Provider { error, .. } => Some(error),
            _ => None,
        }
    }
}
