//! Per-request identity context.
//!
//! Credentials are read once from the request headers and passed to the guard
//! explicitly. A bearer token wins over the session cookie. Empty values are
//! treated as absent.

use axum::http::{
    HeaderMap,
    header::{AUTHORIZATION, COOKIE},
};
use secrecy::SecretString;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Where the credential was found; the provider forwards it the same way.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialSource {
    Cookie,
    Bearer,
}

/// Opaque session credential. Never parsed, never logged.
#[derive(Clone, Debug)]
pub struct SessionCredential {
    source: CredentialSource,
    token: SecretString,
}

impl SessionCredential {
    #[must_use]
    pub fn new(source: CredentialSource, token: impl Into<String>) -> Self {
        Self {
            source,
            token: SecretString::from(token.into()),
        }
    }

    #[must_use]
    pub const fn source(&self) -> CredentialSource {
        self.source
    }

    #[must_use]
    pub const fn token(&self) -> &SecretString {
        &self.token
    }
}

/// Ambient identity of the current request, made explicit.
#[derive(Clone, Debug, Default)]
pub struct IdentityContext {
    credential: Option<SessionCredential>,
    request_id: Option<String>,
}

impl IdentityContext {
    /// Context with no credential at all.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_credential(credential: SessionCredential) -> Self {
        Self {
            credential: Some(credential),
            request_id: None,
        }
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Read the credential and request id from request headers.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap, cookie_name: &str) -> Self {
        let credential = extract_bearer_token(headers)
            .map(|token| SessionCredential::new(CredentialSource::Bearer, token))
            .or_else(|| {
                extract_cookie(headers, cookie_name)
                    .map(|token| SessionCredential::new(CredentialSource::Cookie, token))
            });

        let request_id = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string);

        Self {
            credential,
            request_id,
        }
    }

    #[must_use]
    pub const fn credential(&self) -> Option<&SessionCredential> {
        self.credential.as_ref()
    }

    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }
}

fn extract_cookie(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    // Browsers may send several Cookie headers over HTTP/2.
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            (key.trim() == cookie_name).then(|| val.trim().to_string())
        })
        .find(|val| !val.is_empty())
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
