//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to the action to run, with its full
//! configuration.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{ARG_PORT, identity, site};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    let identity_opts = identity::Options::parse(matches)?;
    let site_opts = site::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        identity_url: identity_opts.identity_url,
        login_url: identity_opts.login_url,
        session_cookie: identity_opts.session_cookie,
        verify_timeout_seconds: identity_opts.verify_timeout_seconds,
        protected_path: site_opts.protected_path,
        session_cookie_secure: site_opts.session_cookie_secure,
    }))
}
