//! # Gatehouse (session-gated page server)
//!
//! `gatehouse` serves a protected page that is only composed after an upstream
//! identity service has confirmed the caller's session.
//!
//! ## Access Guard
//!
//! Every request for the protected path passes through the [`guard::AccessGuard`]:
//!
//! - The session credential is read from the request (session cookie or
//!   `Authorization: Bearer`) into an explicit [`guard::IdentityContext`].
//! - The guard awaits the [`provider::IdentityProvider`], bounded by a timeout.
//! - A confirmed identity lets the handler render; anything else (no credential,
//!   unknown session, provider error, timeout) is a redirect to the login URL.
//!   Failure subtypes are logged but never change the outcome.
//!
//! ## Routing
//!
//! Static redirect rules (by default `/` to the protected path) are mounted
//! next to the guarded route and never consult the guard. `POST /logout` ends
//! the upstream session, clears the cookie and redirects to the login URL.

pub mod api;
pub mod cli;
pub mod guard;
pub mod provider;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
