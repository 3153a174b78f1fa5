//! Receiver for the access token at the end of a successful flow.

/// Called once, after the flow completes, with the raw access token.
///
/// A sink reports its own failures (persisting to disk, say); the flow has
/// already finished and does not retry.
pub trait TokenSink: Send + Sync {
    fn on_token_received(&self, access_token: &str);
}

impl<F> TokenSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn on_token_received(&self, access_token: &str) {
        self(access_token)
    }
}
