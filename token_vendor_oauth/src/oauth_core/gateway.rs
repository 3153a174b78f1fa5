use serde::de::DeserializeOwned;
use tracing::{instrument, warn};
use url::Url;
use token_vendor_lib::encode_form;
use super::config::{is_blank, ClientRegistration};
use super::http_client::{HttpRequest, HttpResponse, OAuthHttpClient};
use super::pkce;
use super::types::{
    AccessToken, AuthorizationCode, FlowStep, ProviderError, SessionToken, SessionTokenRequest,
    VendorError,
};

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Performs the three exchanges against one identity provider.
///
/// Holds no per-flow state, so one gateway can serve any number of flows.
#[derive(Clone, Debug)]
pub struct IdentityGateway<C> {
    http_client: C,
    registration: ClientRegistration,
}

impl<C: OAuthHttpClient> IdentityGateway<C> {
    pub fn new(http_client: C, registration: ClientRegistration) -> Self {
        IdentityGateway { http_client, registration }
    }

    pub fn registration(&self) -> &ClientRegistration {
        &self.registration
    }

    pub fn http_client(&self) -> &C {
        &self.http_client
    }

    /// Step 1: trade username and password for a session token.
    #[instrument(skip(self, password), level = "debug")]
    pub async fn exchange_credentials_for_session_token(
        &self,
        username: &str,
        password: &str,
    ) -> Result<SessionToken, VendorError> {
        let step = FlowStep::SessionToken;
        let url = endpoint(pkce::authn_url(&self.registration.issuer), &self.registration.issuer)?;
        let body = serde_json::to_vec(&SessionTokenRequest::new(username, password))
            .map_err(|e| VendorError::Decode { step, message: e.to_string() })?;

        let response = self.send(step, HttpRequest::post(url, JSON_CONTENT_TYPE, body)).await?;
        check_provider_error(step, &response)?;
        let token: SessionToken = decode(step, &response)?;

        if token.is_locked_out() {
            return Err(VendorError::LockedOut);
        }
        if is_blank(&token.token) {
            return Err(VendorError::EmptyToken { step });
        }
        Ok(token)
    }

    /// Step 2: trade a session token for an authorization code, bound to a fresh
    /// PKCE verifier.
    #[instrument(skip(self, session_token), level = "debug")]
    pub async fn exchange_session_token_for_authorization_code(
        &self,
        session_token: &str,
    ) -> Result<AuthorizationCode, VendorError> {
        let step = FlowStep::AuthorizationCode;
        let base = endpoint(pkce::oauth2_url(&self.registration.issuer, "authorize"), &self.registration.issuer)?;
        let authorize = pkce::authorization_request(
            &self.registration.client_id,
            &self.registration.redirect_uri,
            session_token,
        )
        .map_err(|e| VendorError::Transport { step, message: e.to_string() })?;

        let response = self.send(step, HttpRequest::get(format!("{base}{}", authorize.query))).await?;

        let code = match response.status {
            302 => {
                let location = response.header("location").unwrap_or_default();
                let redirect = Url::parse(location).map_err(|_| VendorError::MalformedUrl(location.to_string()))?;
                query_value(&redirect, "code")
            }
            // The provider resolved the redirect itself; the code rides on the final URL
            200 => match Url::parse(&response.url) {
                Ok(resolved) => query_value(&resolved, "code"),
                Err(_) => String::new(),
            },
            other => {
                if let Some(error) = detect_provider_error(&response) {
                    warn!(%step, status = other, code = %error.error_code, summary = %error.error_summary, "identity provider returned an error");
                }
                return Err(VendorError::UnexpectedStatus(other));
            }
        };
        check_provider_error(step, &response)?;

        if is_blank(&code) {
            return Err(VendorError::EmptyCode);
        }
        Ok(AuthorizationCode { code, code_verifier: authorize.code_verifier })
    }

    /// Step 3: redeem the authorization code, proving possession of its verifier.
    #[instrument(skip(self, code_verifier, code), level = "debug")]
    pub async fn exchange_authorization_code_for_access_token(
        &self,
        code_verifier: &str,
        code: &str,
    ) -> Result<AccessToken, VendorError> {
        let step = FlowStep::AccessToken;
        let url = endpoint(pkce::oauth2_url(&self.registration.issuer, "token"), &self.registration.issuer)?;
        let form = [
            ("client_id", self.registration.client_id.as_str()),
            ("redirect_uri", self.registration.redirect_uri.as_str()),
            ("code_verifier", code_verifier),
            ("code", code),
            ("grant_type", "authorization_code"),
        ];
        let body = encode_form(&form).into_bytes();

        let response = self.send(step, HttpRequest::post(url, FORM_CONTENT_TYPE, body)).await?;
        check_provider_error(step, &response)?;
        let token: AccessToken = decode(step, &response)?;

        if is_blank(&token.access_token) {
            return Err(VendorError::EmptyToken { step });
        }
        Ok(token)
    }

    async fn send(&self, step: FlowStep, request: HttpRequest) -> Result<HttpResponse, VendorError> {
        self.http_client
            .execute(request)
            .await
            .map_err(|e| VendorError::Transport { step, message: e.to_string() })
    }
}

/// Look for a provider error envelope in the response body.
///
/// The body is only borrowed, so when nothing is found the caller decodes the
/// same bytes without another round trip. Status is ignored on purpose: the
/// provider sends envelopes with 200 too.
pub fn detect_provider_error(response: &HttpResponse) -> Option<ProviderError> {
    serde_json::from_slice::<ProviderError>(&response.body)
        .ok()
        .filter(ProviderError::is_present)
}

fn check_provider_error(step: FlowStep, response: &HttpResponse) -> Result<(), VendorError> {
    match detect_provider_error(response) {
        Some(error) => {
            warn!(%step, status = response.status, code = %error.error_code, summary = %error.error_summary, "identity provider returned an error");
            Err(VendorError::Provider { step, error })
        }
        None => Ok(()),
    }
}

fn decode<T: DeserializeOwned>(step: FlowStep, response: &HttpResponse) -> Result<T, VendorError> {
    serde_json::from_slice(&response.body).map_err(|e| VendorError::Decode { step, message: e.to_string() })
}

fn endpoint(derived: String, issuer: &str) -> Result<String, VendorError> {
    if derived.is_empty() {
        Err(VendorError::MalformedUrl(issuer.to_string()))
    } else {
        Ok(derived)
    }
}

fn query_value(url: &Url, key: &str) -> String {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default()
}
