//! PKCE material and provider URL derivation, using `ring` for SHA-256 and randomness.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use ring::digest;
use ring::rand::{SecureRandom, SystemRandom};
use token_vendor_lib::encode_form;
use url::Url;

/// Random bytes behind a code verifier (80 characters once encoded).
pub const CODE_VERIFIER_BYTES: usize = 60;
/// Random bytes behind the `nonce` and `state` parameters.
pub const NONCE_BYTES: usize = 20;

/// Error raised when the system random source fails.
#[derive(Debug, thiserror::Error)]
#[error("system random source unavailable")]
pub struct RandomSourceError;

/// Authorize request produced for one attempt.
///
/// The verifier must be kept for the token exchange; everything else is already
/// folded into `query`.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// PKCE code verifier. Never sent until the token exchange.
    pub code_verifier: String,
    /// Encoded query string, including the leading `?`.
    pub query: String,
}

/// Authentication endpoint for the issuer: `scheme://host/api/v1/authn`.
///
/// Returns an empty string when the issuer does not parse.
pub fn authn_url(issuer: &str) -> String {
    match origin(issuer) {
        Some((origin, _)) => format!("{origin}/api/v1/authn"),
        None => String::new(),
    }
}

/// OAuth2 endpoint for the issuer: `scheme://host/oauth2/{realm}/v1/{endpoint}`,
/// where `realm` is the final path segment of the issuer.
///
/// Returns an empty string when the issuer does not parse.
pub fn oauth2_url(issuer: &str, endpoint: &str) -> String {
    match origin(issuer) {
        Some((origin, url)) => {
            let realm = url.path().rsplit('/').next().unwrap_or_default();
            format!("{origin}/oauth2/{realm}/v1/{endpoint}")
        }
        None => String::new(),
    }
}

fn origin(issuer: &str) -> Option<(String, Url)> {
    let url = Url::parse(issuer.trim()).ok()?;
    let host = url.host_str()?;
    let origin = match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    };
    Some((origin, url))
}

/// Generate a PKCE code challenge from the given verifier using SHA-256 and base64url (no padding).
pub fn pkce_code_challenge(verifier: &str) -> String {
    // SHA-256 hash of the verifier
    let hash = digest::digest(&digest::SHA256, verifier.as_bytes());
    // Base64URL encode without padding
    URL_SAFE_NO_PAD.encode(hash.as_ref())
}

/// Fresh code verifier: 60 random bytes, base64url without padding.
pub fn generate_code_verifier(rng: &dyn SecureRandom) -> Result<String, RandomSourceError> {
    Ok(URL_SAFE_NO_PAD.encode(random_bytes::<CODE_VERIFIER_BYTES>(rng)?))
}

fn random_standard_base64<const N: usize>(rng: &dyn SecureRandom) -> Result<String, RandomSourceError> {
    Ok(STANDARD.encode(random_bytes::<N>(rng)?))
}

fn random_bytes<const N: usize>(rng: &dyn SecureRandom) -> Result<[u8; N], RandomSourceError> {
    let mut buf = [0u8; N];
    rng.fill(&mut buf).map_err(|_| RandomSourceError)?;
    Ok(buf)
}

/// Builds the authorize query for the given session token along with a fresh verifier.
///
/// Every call draws a new verifier, nonce and state.
pub fn authorization_request(
    client_id: &str,
    redirect_uri: &str,
    session_token: &str,
) -> Result<AuthorizationRequest, RandomSourceError> {
    authorization_request_with(&SystemRandom::new(), client_id, redirect_uri, session_token)
}

/// Same as [`authorization_request`], drawing randomness from `rng`.
pub fn authorization_request_with(
    rng: &dyn SecureRandom,
    client_id: &str,
    redirect_uri: &str,
    session_token: &str,
) -> Result<AuthorizationRequest, RandomSourceError> {
    let code_verifier = generate_code_verifier(rng)?;
    let code_challenge = pkce_code_challenge(&code_verifier);
    let nonce = random_standard_base64::<NONCE_BYTES>(rng)?;
    let state = random_standard_base64::<NONCE_BYTES>(rng)?;

    let params = [
        ("client_id", client_id),
        ("code_challenge_method", "S256"),
        ("code_challenge", code_challenge.as_str()),
        ("redirect_uri", redirect_uri),
        ("response_type", "code"),
        ("scope", "openid"),
        ("nonce", nonce.as_str()),
        ("state", state.as_str()),
        ("sessionToken", session_token),
    ];
    let query = format!("?{}", encode_form(&params));
    Ok(AuthorizationRequest { code_verifier, query })
}
