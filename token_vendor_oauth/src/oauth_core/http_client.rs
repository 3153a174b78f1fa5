use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::error::Error;
use dashmap::DashMap;

/// HTTP methods used by the token flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    GET,
    POST,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::GET => write!(f, "GET"),
            HttpMethod::POST => write!(f, "POST"),
        }
    }
}

/// HTTP request for executing a call.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method (GET, POST, etc.).
    pub method: HttpMethod,
    /// Target URL.
    pub url: String,
    /// Request headers.
    pub headers: Vec<(String, String)>,
    /// Optional request body.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// A bodiless GET.
    pub fn get(url: impl Into<String>) -> Self {
        HttpRequest {
            method: HttpMethod::GET,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// A POST carrying `body` with the given content type.
    pub fn post(url: impl Into<String>, content_type: &str, body: Vec<u8>) -> Self {
        HttpRequest {
            method: HttpMethod::POST,
            url: url.into(),
            headers: vec![("Content-Type".to_string(), content_type.to_string())],
            body: Some(body),
        }
    }

    /// Look up a request header, ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// The URL with any query string removed. Safe to log.
    pub fn url_without_query(&self) -> &str {
        strip_query(&self.url)
    }
}

/// HTTP response from executing a call.
///
/// The body is read in full by the transport, so inspecting it (for a provider
/// error envelope, say) never consumes it.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: Vec<(String, String)>,
    /// Response body.
    pub body: Vec<u8>,
    /// URL of the request that produced this response.
    pub url: String,
}

impl HttpResponse {
    /// Response with the given status and body, no headers and no URL.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        HttpResponse { status, headers: Vec::new(), body: body.into(), url: String::new() }
    }

    /// Builder-style header insertion.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Builder-style final URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Look up a response header, ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

fn strip_query(url: &str) -> &str {
    match url.find('?') {
        Some(idx) => &url[..idx],
        None => url,
    }
}

/// Error type for HTTP client operations.
pub type HttpClientError = Box<dyn Error + Send + Sync>;

/// Future returned by [`OAuthHttpClient::execute`].
pub type HttpFuture = Pin<Box<dyn Future<Output = Result<HttpResponse, HttpClientError>> + Send + 'static>>;

/// Generic HTTP client interface for OAuth flows.
///
/// Implementations send exactly one request and hand back exactly one response.
/// Redirects are never followed: a 3xx comes back as-is, `Location` included.
pub trait OAuthHttpClient: Send + Sync + Clone + 'static {
    /// Execute an HTTP request asynchronously.
    fn execute(&self, request: HttpRequest) -> HttpFuture;
}

/// In-memory HTTP client stub for testing.
///
/// Responses are matched on the request URL without its query string, since
/// the authorize request carries fresh random parameters on every call.
/// Every request is recorded.
#[derive(Clone, Default)]
pub struct InMemoryHttpClient {
    responses: Arc<DashMap<String, HttpResponse>>,
    default_response: Option<HttpResponse>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl InMemoryHttpClient {
    /// Creates a new in-memory HTTP client with no default response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory HTTP client with a default response on miss.
    pub fn with_default(response: HttpResponse) -> Self {
        Self { default_response: Some(response), ..Self::default() }
    }

    /// Register a mock response for a specific URL (query string ignored).
    pub fn insert_response(&self, url: impl Into<String>, response: HttpResponse) {
        let url = url.into();
        self.responses.insert(strip_query(&url).to_string(), response);
    }

    /// Requests executed so far, oldest first.
    pub fn requests(&self) -> Vec<HttpRequest> {
        match self.requests.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of requests executed so far.
    pub fn request_count(&self) -> usize {
        self.requests().len()
    }
}

impl OAuthHttpClient for InMemoryHttpClient {
    fn execute(&self, request: HttpRequest) -> HttpFuture {
        let responses = self.responses.clone();
        let default = self.default_response.clone();
        let requests = self.requests.clone();
        Box::pin(async move {
            let key = strip_query(&request.url).to_string();
            let url = request.url.clone();
            match requests.lock() {
                Ok(mut guard) => guard.push(request),
                Err(poisoned) => poisoned.into_inner().push(request),
            }
            let found = responses.get(&key).map(|entry| entry.value().clone()).or(default);
            match found {
                // Stamp the request URL when the fixture did not set one
                Some(mut resp) => {
                    if resp.url.is_empty() {
                        resp.url = url;
                    }
                    Ok(resp)
                }
                None => Err(format!("no mock response for url {key}").into()),
            }
        })
    }
}

/// Logs every request and its outcome through `tracing`.
///
/// Query strings are stripped before logging; the authorize request carries
/// the session token there.
#[derive(Clone)]
pub struct TracingHttpClient<C> {
    inner: C,
}

impl<C: OAuthHttpClient> TracingHttpClient<C> {
    pub fn new(inner: C) -> Self {
        TracingHttpClient { inner }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: OAuthHttpClient> OAuthHttpClient for TracingHttpClient<C> {
    fn execute(&self, request: HttpRequest) -> HttpFuture {
        let method = request.method;
        let target = request.url_without_query().to_string();
        let fut = self.inner.execute(request);
        Box::pin(async move {
            tracing::info!(%method, url = %target, "sending request");
            let result = fut.await;
            match &result {
                Ok(resp) => tracing::info!(%method, url = %target, status = resp.status, "response received"),
                Err(e) => tracing::warn!(%method, url = %target, error = %e, "request failed"),
            }
            result
        })
    }
}

#[cfg(feature = "reqwest")]
pub use self::reqwest_client::{ReqwestHttpClient, DEFAULT_MAX_BODY_SIZE};

#[cfg(feature = "reqwest")]
mod reqwest_client {
    use super::*;
    use std::time::Duration;

    /// Default cap on a buffered response body.
    pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

    /// HTTP client backed by reqwest.
    ///
    /// Never follows redirects. Bodies are read chunk by chunk and the read
    /// stops as soon as the cap is passed.
    #[derive(Clone)]
    pub struct ReqwestHttpClient {
        client: reqwest::Client,
        max_body_size: usize,
    }

    impl ReqwestHttpClient {
        /// Create a client that buffers at most `DEFAULT_MAX_BODY_SIZE` bytes per response.
        pub fn new() -> Result<Self, HttpClientError> {
            Self::with_limits(DEFAULT_MAX_BODY_SIZE, None)
        }

        /// Create a client with a body cap and an optional deadline for every request.
        pub fn with_limits(max_body_size: usize, timeout: Option<Duration>) -> Result<Self, HttpClientError> {
            let mut builder = reqwest::Client::builder().redirect(reqwest::redirect::Policy::none());
            if let Some(timeout) = timeout {
                builder = builder.timeout(timeout);
            }
            Ok(ReqwestHttpClient { client: builder.build()?, max_body_size })
        }
    }

    fn too_large(max_body: usize) -> HttpClientError {
        format!("response body exceeds {max_body} bytes").into()
    }

    impl OAuthHttpClient for ReqwestHttpClient {
        fn execute(&self, request: HttpRequest) -> HttpFuture {
            let client = self.client.clone();
            let max_body = self.max_body_size;
            Box::pin(async move {
                let method = match request.method {
                    HttpMethod::GET => reqwest::Method::GET,
                    HttpMethod::POST => reqwest::Method::POST,
                };
                let mut builder = client.request(method, request.url.as_str());
                for (k, v) in &request.headers {
                    builder = builder.header(k.as_str(), v.as_str());
                }
                if let Some(body) = request.body {
                    builder = builder.body(body);
                }
                let mut resp = builder.send().await?;

                if resp.content_length().is_some_and(|len| len > max_body as u64) {
                    return Err(too_large(max_body));
                }
                let status = resp.status().as_u16();
                let url = resp.url().to_string();
                let headers = resp
                    .headers()
                    .iter()
                    .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
                    .collect();

                // Chunked bodies carry no length up front
                let mut body = Vec::new();
                while let Some(chunk) = resp.chunk().await? {
                    if body.len() + chunk.len() > max_body {
                        return Err(too_large(max_body));
                    }
                    body.extend_from_slice(&chunk);
                }
                Ok(HttpResponse { status, headers, body, url })
            })
        }
    }
}
