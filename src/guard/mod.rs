//! Access Guard.
//!
//! Flow Overview: take the request's [`IdentityContext`], ask the identity
//! provider to verify the credential, and produce exactly one [`Verdict`]:
//! `Verified` with the confirmed identity, or `Denied` with a diversion to the
//! login URL. Protected content is composed only after `Verified`.
//!
//! Security boundaries: every failure (no credential, unknown session,
//! provider error, timeout) yields the same diversion. Nothing is cached or
//! shared between invocations.

pub mod context;
pub mod extract;

pub use self::context::{CredentialSource, IdentityContext, SessionCredential};
pub use self::extract::Authenticated;

use crate::provider::{Identity, IdentityProvider};
use axum::{
    http::header::CACHE_CONTROL,
    response::{IntoResponse, Redirect, Response},
};
use std::{fmt, sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{Span, debug, instrument, warn};

pub const DEFAULT_LOGIN_URL: &str = "/login";
pub const DEFAULT_SESSION_COOKIE: &str = "session";
pub const DEFAULT_VERIFY_TIMEOUT_SECONDS: u64 = 5;

#[derive(Clone, Debug)]
pub struct GuardConfig {
    login_url: String,
    session_cookie: String,
    verify_timeout: Duration,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            login_url: DEFAULT_LOGIN_URL.to_string(),
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
            verify_timeout: Duration::from_secs(DEFAULT_VERIFY_TIMEOUT_SECONDS),
        }
    }
}

impl GuardConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_login_url(mut self, login_url: impl Into<String>) -> Self {
        self.login_url = login_url.into();
        self
    }

    #[must_use]
    pub fn with_session_cookie(mut self, session_cookie: impl Into<String>) -> Self {
        self.session_cookie = session_cookie.into();
        self
    }

    #[must_use]
    pub const fn with_verify_timeout(mut self, verify_timeout: Duration) -> Self {
        self.verify_timeout = verify_timeout;
        self
    }

    #[must_use]
    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    #[must_use]
    pub fn session_cookie(&self) -> &str {
        &self.session_cookie
    }

    #[must_use]
    pub const fn verify_timeout(&self) -> Duration {
        self.verify_timeout
    }
}

/// Lifecycle of one guard invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardState {
    Unverified,
    Verified,
    Denied,
}

impl GuardState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unverified => "unverified",
            Self::Verified => "verified",
            Self::Denied => "denied",
        }
    }
}

/// Why a request was denied. Only used for logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DenyReason {
    MissingCredential,
    NoSession,
    ProviderError,
    Timeout,
}

impl DenyReason {
    const fn as_str(self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::NoSession => "no_session",
            Self::ProviderError => "provider_error",
            Self::Timeout => "timeout",
        }
    }
}

/// Instruction to navigate away from protected content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diversion {
    location: String,
}

impl Diversion {
    #[must_use]
    pub fn to(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }

    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }
}

impl IntoResponse for Diversion {
    fn into_response(self) -> Response {
        (
            [(CACHE_CONTROL, "no-store")],
            Redirect::to(&self.location),
        )
            .into_response()
    }
}

/// Outcome of one guard invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Verified(Identity),
    Denied(Diversion),
}

impl Verdict {
    #[must_use]
    pub const fn state(&self) -> GuardState {
        match self {
            Self::Verified(_) => GuardState::Verified,
            Self::Denied(_) => GuardState::Denied,
        }
    }

    #[must_use]
    pub const fn is_verified(&self) -> bool {
        matches!(self, Self::Verified(_))
    }
}

/// The single error kind of the guard.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("not authenticated")]
pub struct NotAuthenticated {
    diversion: Diversion,
}

impl NotAuthenticated {
    #[must_use]
    pub const fn diversion(&self) -> &Diversion {
        &self.diversion
    }
}

impl IntoResponse for NotAuthenticated {
    fn into_response(self) -> Response {
        self.diversion.into_response()
    }
}

pub struct AccessGuard {
    provider: Arc<dyn IdentityProvider>,
    config: GuardConfig,
}

impl fmt::Debug for AccessGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessGuard")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AccessGuard {
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>, config: GuardConfig) -> Self {
        Self { provider, config }
    }

    #[must_use]
    pub const fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Verify the request and decide between rendering and diverting.
    ///
    /// Waits for the provider (up to the configured timeout) before returning.
    #[instrument(
        name = "guard.check",
        skip_all,
        fields(request_id = context.request_id().unwrap_or("none"), state = GuardState::Unverified.as_str())
    )]
    pub async fn check(&self, context: &IdentityContext) -> Verdict {
        let verdict = match self.verify(context).await {
            Ok(identity) => {
                debug!(user_id = %identity.user_id, "session verified");
                Verdict::Verified(identity)
            }
            Err(reason) => {
                debug!(reason = reason.as_str(), "session denied");
                Verdict::Denied(Diversion::to(self.config.login_url()))
            }
        };

        Span::current().record("state", verdict.state().as_str());

        verdict
    }

    /// `?`-friendly form of [`AccessGuard::check`].
    ///
    /// # Errors
    /// Returns [`NotAuthenticated`] carrying the diversion when the session is not confirmed.
    pub async fn require(&self, context: &IdentityContext) -> Result<Identity, NotAuthenticated> {
        match self.check(context).await {
            Verdict::Verified(identity) => Ok(identity),
            Verdict::Denied(diversion) => Err(NotAuthenticated { diversion }),
        }
    }

    /// Ask the provider to end the session. Best effort: failures are only logged.
    #[instrument(name = "guard.sign_out", skip_all, fields(request_id = context.request_id().unwrap_or("none")))]
    pub async fn sign_out(&self, context: &IdentityContext) {
        let Some(credential) = context.credential() else {
            debug!("no credential to sign out");
            return;
        };

        match tokio::time::timeout(
            self.config.verify_timeout(),
            self.provider.end_session(credential),
        )
        .await
        {
            Ok(Ok(())) => debug!("session ended"),
            Ok(Err(err)) => warn!("Failed to end session: {err}"),
            Err(_) => warn!("Timed out ending session"),
        }
    }

    async fn verify(&self, context: &IdentityContext) -> Result<Identity, DenyReason> {
        let credential = context.credential().ok_or(DenyReason::MissingCredential)?;

        match tokio::time::timeout(
            self.config.verify_timeout(),
            self.provider.verify_session(credential),
        )
        .await
        {
            Ok(Ok(Some(identity))) => Ok(identity),
            Ok(Ok(None)) => Err(DenyReason::NoSession),
            Ok(Err(err)) => {
                warn!("Failed to verify session: {err}");
                Err(DenyReason::ProviderError)
            }
            Err(_) => {
                warn!(
                    "Timed out verifying session after {:?}",
                    self.config.verify_timeout()
                );
                Err(DenyReason::Timeout)
            }
        }
    }
}
