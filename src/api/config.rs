//! Site routing configuration: where the protected view lives and which
//! static redirects sit in front of it.

use axum::http::HeaderValue;
use thiserror::Error;

pub const DEFAULT_PROTECTED_PATH: &str = "/workflows";

/// Paths owned by the service itself.
const RESERVED_PATHS: [&str; 2] = ["/health", "/logout"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("path must start with '/': {0}")]
    NotAbsolute(String),

    #[error("path must be static (no '{{', '}}', '*' or segments starting with ':'): {0}")]
    NotStatic(String),

    #[error("path must be visible ASCII without '?' or '#': {0:?}")]
    InvalidCharacter(String),

    #[error("redirect destination is not a valid Location header: {0:?}")]
    InvalidDestination(String),

    #[error("protected path cannot be the site root")]
    ProtectedRoot,

    #[error("path is reserved: {0}")]
    Reserved(String),

    #[error("redirect from {0} would shadow the protected path")]
    ShadowsProtected(String),

    #[error("duplicate redirect source: {0}")]
    DuplicateRedirect(String),
}

/// Static redirect, evaluated without consulting the guard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedirectRule {
    pub source: String,
    pub destination: String,
    pub permanent: bool,
}

impl RedirectRule {
    #[must_use]
    pub fn new(source: impl Into<String>, destination: impl Into<String>, permanent: bool) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            permanent,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SiteConfig {
    protected_path: String,
    redirects: Vec<RedirectRule>,
    session_cookie_secure: bool,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PROTECTED_PATH)
    }
}

impl SiteConfig {
    /// Site with the root redirected (non-permanently) to `protected_path`.
    #[must_use]
    pub fn new(protected_path: impl Into<String>) -> Self {
        let protected_path = protected_path.into();
        Self {
            redirects: vec![RedirectRule::new("/", protected_path.clone(), false)],
            protected_path,
            session_cookie_secure: false,
        }
    }

    #[must_use]
    pub fn with_redirects(mut self, redirects: Vec<RedirectRule>) -> Self {
        self.redirects = redirects;
        self
    }

    #[must_use]
    pub const fn with_session_cookie_secure(mut self, secure: bool) -> Self {
        self.session_cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn protected_path(&self) -> &str {
        &self.protected_path
    }

    #[must_use]
    pub fn redirects(&self) -> &[RedirectRule] {
        &self.redirects
    }

    #[must_use]
    pub const fn session_cookie_secure(&self) -> bool {
        self.session_cookie_secure
    }

    /// Check the paths before they are mounted on the router.
    ///
    /// # Errors
    /// Returns the first invalid or conflicting path.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_path(&self.protected_path)?;
        if self.protected_path == "/" {
            return Err(ConfigError::ProtectedRoot);
        }

        let mut seen: Vec<&str> = Vec::with_capacity(self.redirects.len());
        for rule in &self.redirects {
            validate_path(&rule.source)?;
            validate_destination(&rule.destination)?;
            if rule.source == self.protected_path {
                return Err(ConfigError::ShadowsProtected(rule.source.clone()));
            }
            if seen.contains(&rule.source.as_str()) {
                return Err(ConfigError::DuplicateRedirect(rule.source.clone()));
            }
            seen.push(&rule.source);
        }

        Ok(())
    }
}

/// Only literal routes are accepted; the router panics on anything it would
/// read as a capture or wildcard.
fn validate_path(path: &str) -> Result<(), ConfigError> {
    if !path.starts_with('/') {
        return Err(ConfigError::NotAbsolute(path.to_string()));
    }
    if !path.chars().all(|c| c.is_ascii_graphic()) || path.contains(['?', '#']) {
        return Err(ConfigError::InvalidCharacter(path.to_string()));
    }
    if path.contains(['{', '}', '*']) || path.split('/').any(|segment| segment.starts_with(':')) {
        return Err(ConfigError::NotStatic(path.to_string()));
    }
    if RESERVED_PATHS.contains(&path) {
        return Err(ConfigError::Reserved(path.to_string()));
    }
    Ok(())
}

/// Check that `location` can be sent as a `Location` header.
///
/// # Errors
/// Returns [`ConfigError::InvalidDestination`] for empty values or bytes a header cannot carry.
pub fn validate_destination(location: &str) -> Result<(), ConfigError> {
    if location.is_empty() || HeaderValue::from_str(location).is_err() {
        return Err(ConfigError::InvalidDestination(location.to_string()));
    }
    Ok(())
}
