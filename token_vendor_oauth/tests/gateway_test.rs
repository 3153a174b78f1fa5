use token_vendor_oauth::{ClientRegistration, IdentityGateway, InMemoryHttpClient, HttpMethod, FlowStep, VendorError, pkce_code_challenge};
use token_vendor_oauth::oauth_core::http_client::HttpResponse;
use token_vendor_lib::parse_form;
use serde_json::json;
use std::io;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

const ISSUER: &str = "https://host.com/oauth2/randomString";
const AUTHN: &str = "https://host.com/api/v1/authn";
const AUTHORIZE: &str = "https://host.com/oauth2/randomString/v1/authorize";
const TOKEN: &str = "https://host.com/oauth2/randomString/v1/token";

fn gateway(client: &InMemoryHttpClient) -> IdentityGateway<InMemoryHttpClient> {
    IdentityGateway::new(
        client.clone(),
        ClientRegistration::new("CLIENT_ID", ISSUER, "http://host/login/callback"),
    )
}

fn json_response(status: u16, body: serde_json::Value) -> HttpResponse {
    HttpResponse::new(status, serde_json::to_vec(&body).unwrap())
}

/// Log sink for asserting on what a subscriber wrote.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn param(pairs: &[(String, String)], key: &str) -> String {
    pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone()).unwrap_or_default()
}

#[tokio::test]
async fn test_session_token_success_posts_json_credentials() {
    let client = InMemoryHttpClient::new();
    client.insert_response(AUTHN, json_response(200, json!({
        "expiresAt": "2026-10-16T10:15:00.000Z",
        "status": "SUCCESS",
        "sessionToken": "token"
    })));

    let token = gateway(&client).exchange_credentials_for_session_token("user", "pw").await.unwrap();
    assert_eq!(token.token, "token");

    let requests = client.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, HttpMethod::POST);
    assert_eq!(requests[0].url, AUTHN);
    assert!(requests[0].header("content-type").unwrap().starts_with("application/json"));
    let body: serde_json::Value = serde_json::from_slice(requests[0].body.as_ref().unwrap()).unwrap();
    assert_eq!(body, json!({
        "username": "user",
        "password": "pw",
        "multiOptionalFactorEnroll": true,
        "warnBeforePasswordExpired": true
    }));
}

#[tokio::test]
async fn test_session_token_failures() {
    let cases = vec![
        json!({"errorCode": "E0000022", "errorSummary": "The endpoint does not support the provided HTTP method"}),
        json!({"sessionToken": " "}),
        json!({"status": "LOCKED_OUT", "sessionToken": ""}),
    ];
    let mut results = Vec::new();
    for body in cases {
        let client = InMemoryHttpClient::with_default(json_response(200, body));
        results.push(gateway(&client).exchange_credentials_for_session_token("user", "pw").await.unwrap_err());
    }

    match &results[0] {
        VendorError::Provider { step, error } => {
            assert_eq!(*step, FlowStep::SessionToken);
            assert_eq!(error.error_code, "E0000022");
        }
        other => panic!("expected provider error, got {other:?}"),
    }
    assert!(matches!(results[1], VendorError::EmptyToken { step: FlowStep::SessionToken }));
    assert!(matches!(results[2], VendorError::LockedOut));
}

#[tokio::test]
async fn test_session_token_transport_and_decode_errors() {
    // No fixture registered: the stub fails like a dead connection
    let client = InMemoryHttpClient::new();
    let err = gateway(&client).exchange_credentials_for_session_token("user", "pw").await.unwrap_err();
    assert!(matches!(err, VendorError::Transport { step: FlowStep::SessionToken, .. }));

    let client = InMemoryHttpClient::with_default(HttpResponse::new(200, b"<html>maintenance</html>".to_vec()));
    let err = gateway(&client).exchange_credentials_for_session_token("user", "pw").await.unwrap_err();
    assert!(matches!(err, VendorError::Decode { step: FlowStep::SessionToken, .. }));
}

#[tokio::test]
async fn test_malformed_issuer_sends_nothing() {
    let client = InMemoryHttpClient::with_default(json_response(200, json!({"sessionToken": "token"})));
    let gateway = IdentityGateway::new(client.clone(), ClientRegistration::new("cid", "not a url", "http://cb"));
    let err = gateway.exchange_credentials_for_session_token("user", "pw").await.unwrap_err();
    assert!(matches!(err, VendorError::MalformedUrl(_)));
    assert_eq!(client.request_count(), 0);
}

#[tokio::test]
async fn test_authorization_code_from_redirect() {
    let client = InMemoryHttpClient::new();
    client.insert_response(
        AUTHORIZE,
        HttpResponse::new(302, Vec::new()).with_header("Location", "https://host/cb?code=abc123&state=xyz"),
    );

    let code = gateway(&client).exchange_session_token_for_authorization_code("session-token").await.unwrap();
    assert_eq!(code.code, "abc123");

    let requests = client.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, HttpMethod::GET);
    assert_eq!(requests[0].url_without_query(), AUTHORIZE);
    let query = parse_form(requests[0].url.split_once('?').unwrap().1);
    assert_eq!(param(&query, "sessionToken"), "session-token");
    assert_eq!(param(&query, "client_id"), "CLIENT_ID");
    assert_eq!(param(&query, "code_challenge"), pkce_code_challenge(&code.code_verifier));
}

#[tokio::test]
async fn test_authorization_code_from_resolved_url() {
    let client = InMemoryHttpClient::new();
    client.insert_response(
        AUTHORIZE,
        HttpResponse::new(200, b"<html>signed in</html>".to_vec()).with_url("http://host/login/callback?code=inline-code"),
    );

    let code = gateway(&client).exchange_session_token_for_authorization_code("session-token").await.unwrap();
    assert_eq!(code.code, "inline-code");
    assert!(!code.code_verifier.is_empty());
}

#[tokio::test]
async fn test_authorization_code_failures() {
    let not_found = InMemoryHttpClient::with_default(HttpResponse::new(404, b"{}".to_vec()));
    let err = gateway(&not_found).exchange_session_token_for_authorization_code("s").await.unwrap_err();
    assert!(matches!(err, VendorError::UnexpectedStatus(404)));

    // A 200 whose URL carries no code
    let no_code = InMemoryHttpClient::with_default(HttpResponse::new(200, b"{}".to_vec()));
    let err = gateway(&no_code).exchange_session_token_for_authorization_code("s").await.unwrap_err();
    assert!(matches!(err, VendorError::EmptyCode));

    let blank_redirect = InMemoryHttpClient::with_default(
        HttpResponse::new(302, Vec::new()).with_header("location", "https://host/cb?code=%20"),
    );
    let err = gateway(&blank_redirect).exchange_session_token_for_authorization_code("s").await.unwrap_err();
    assert!(matches!(err, VendorError::EmptyCode));

    let bad_location = InMemoryHttpClient::with_default(
        HttpResponse::new(302, Vec::new()).with_header("location", "::not a url::"),
    );
    let err = gateway(&bad_location).exchange_session_token_for_authorization_code("s").await.unwrap_err();
    assert!(matches!(err, VendorError::MalformedUrl(_)));

    let envelope = InMemoryHttpClient::with_default(
        json_response(200, json!({"errorCode": "E0000011", "errorSummary": "Invalid session"}))
            .with_url("http://host/login/callback?code=ignored"),
    );
    let err = gateway(&envelope).exchange_session_token_for_authorization_code("s").await.unwrap_err();
    assert!(matches!(err, VendorError::Provider { step: FlowStep::AuthorizationCode, .. }));
}

#[tokio::test]
async fn test_error_status_from_authorize_logs_provider_detail() {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt().with_writer(logs.clone()).with_ansi(false).finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let client = InMemoryHttpClient::with_default(json_response(403, json!({
        "errorCode": "E0000006",
        "errorSummary": "You do not have permission to perform the requested action"
    })));
    let err = gateway(&client).exchange_session_token_for_authorization_code("s").await.unwrap_err();
    assert!(matches!(err, VendorError::UnexpectedStatus(403)));

    let output = logs.contents();
    assert!(output.contains("identity provider returned an error"), "{output}");
    assert!(output.contains("E0000006"), "{output}");
    assert!(output.contains("You do not have permission"), "{output}");
}

#[tokio::test]
async fn test_access_token_posts_form_and_parses_payload() {
    let client = InMemoryHttpClient::new();
    client.insert_response(TOKEN, json_response(200, json!({
        "token_type": "Bearer",
        "expires_in": 3600,
        "access_token": "ACCESS123",
        "scope": "openid",
        "id_token": "ID456"
    })));

    let token = gateway(&client)
        .exchange_authorization_code_for_access_token("verifier", "auth-code")
        .await
        .unwrap();
    assert_eq!(token.access_token, "ACCESS123");
    assert_eq!(token.token_type, "Bearer");
    assert_eq!(token.expires_in, 3600);
    assert_eq!(token.id_token.as_deref(), Some("ID456"));

    let requests = client.requests();
    let request = &requests[0];
    assert_eq!(request.header("Content-Type"), Some("application/x-www-form-urlencoded"));
    let form = parse_form(std::str::from_utf8(request.body.as_ref().unwrap()).unwrap());
    assert_eq!(param(&form, "client_id"), "CLIENT_ID");
    assert_eq!(param(&form, "redirect_uri"), "http://host/login/callback");
    assert_eq!(param(&form, "code_verifier"), "verifier");
    assert_eq!(param(&form, "code"), "auth-code");
    assert_eq!(param(&form, "grant_type"), "authorization_code");
}

#[tokio::test]
async fn test_access_token_failures() {
    let blank = InMemoryHttpClient::with_default(json_response(200, json!({"access_token": " "})));
    let err = gateway(&blank).exchange_authorization_code_for_access_token("v", "c").await.unwrap_err();
    assert!(matches!(err, VendorError::EmptyToken { step: FlowStep::AccessToken }));

    let envelope = InMemoryHttpClient::with_default(json_response(400, json!({
        "errorCode": "invalid_grant",
        "errorSummary": "PKCE verification failed"
    })));
    let err = gateway(&envelope).exchange_authorization_code_for_access_token("v", "c").await.unwrap_err();
    let provider = err.provider_error().unwrap();
    assert_eq!(provider.error_summary, "PKCE verification failed");
}
