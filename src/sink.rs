use std::fs;
use std::path::{Path, PathBuf};
use token_vendor_oauth::TokenSink;

/// Writes the access token to a file, replacing any previous content.
///
/// Write failures are logged; the token has already been issued by then.
#[derive(Debug, Clone)]
pub struct FileTokenSink {
    path: PathBuf,
}

impl FileTokenSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileTokenSink { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenSink for FileTokenSink {
    fn on_token_received(&self, access_token: &str) {
        match fs::write(&self.path, access_token) {
            Ok(()) => tracing::info!(path = %self.path.display(), "access token written"),
            Err(e) => tracing::error!(path = %self.path.display(), error = %e, "could not write the access token"),
        }
    }
}
