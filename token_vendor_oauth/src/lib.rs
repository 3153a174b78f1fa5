pub mod oauth_core;

pub use oauth_core::config::{ClientRegistration, Credentials};
pub use oauth_core::flow::{FlowState, TokenVendor};
pub use oauth_core::gateway::{detect_provider_error, IdentityGateway};
pub use oauth_core::http_client::{OAuthHttpClient, HttpRequest, HttpResponse, HttpMethod, HttpClientError, InMemoryHttpClient, TracingHttpClient};
#[cfg(feature = "reqwest")]
pub use oauth_core::http_client::ReqwestHttpClient;
pub use oauth_core::pkce::{authn_url, oauth2_url, authorization_request, pkce_code_challenge, AuthorizationRequest};
pub use oauth_core::sink::TokenSink;
pub use oauth_core::types::{AccessToken, AuthorizationCode, FlowStep, MissingField, ProviderError, SessionToken, VendorError};
