//! Client registration and resource-owner credentials.

use std::fmt;
use super::types::{MissingField, VendorError};

/// Client registration at the identity provider.
///
/// Build one with [`ClientRegistration::new`] or layer sources with
/// [`ClientRegistration::merge`]; blank fields are rejected when a flow starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientRegistration {
    pub client_id: String,
    pub issuer: String,
    pub redirect_uri: String,
}

impl ClientRegistration {
    pub fn new(
        client_id: impl Into<String>,
        issuer: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        ClientRegistration {
            client_id: client_id.into(),
            issuer: issuer.into(),
            redirect_uri: redirect_uri.into(),
        }
    }

    /// Overlay `overrides` on `self`. A blank override never replaces a value.
    pub fn merge(self, overrides: ClientRegistration) -> Self {
        ClientRegistration {
            client_id: pick(self.client_id, overrides.client_id),
            issuer: pick(self.issuer, overrides.issuer),
            redirect_uri: pick(self.redirect_uri, overrides.redirect_uri),
        }
    }

    /// First blank field, in check order.
    pub fn missing_field(&self) -> Option<MissingField> {
        if is_blank(&self.client_id) {
            Some(MissingField::ClientId)
        } else if is_blank(&self.issuer) {
            Some(MissingField::Issuer)
        } else if is_blank(&self.redirect_uri) {
            Some(MissingField::RedirectUri)
        } else {
            None
        }
    }
}

fn pick(base: String, candidate: String) -> String {
    if is_blank(&candidate) { base } else { candidate }
}

pub(crate) fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Resource-owner username and password.
#[derive(Clone, Default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials { username: username.into(), password: password.into() }
    }

    pub fn missing_field(&self) -> Option<MissingField> {
        if is_blank(&self.username) {
            Some(MissingField::Username)
        } else if is_blank(&self.password) {
            Some(MissingField::Password)
        } else {
            None
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Check credentials, then registration, stopping at the first blank value.
pub fn validate(credentials: &Credentials, registration: &ClientRegistration) -> Result<(), VendorError> {
    match credentials.missing_field().or_else(|| registration.missing_field()) {
        Some(field) => Err(VendorError::Validation(field)),
        None => Ok(()),
    }
}
