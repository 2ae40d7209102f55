use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};

pub const ARG_PROTECTED_PATH: &str = "protected-path";
pub const ARG_SESSION_COOKIE_SECURE: &str = "session-cookie-secure";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PROTECTED_PATH)
                .long(ARG_PROTECTED_PATH)
                .help("Path of the protected view; `/` redirects here")
                .env("GATEHOUSE_PROTECTED_PATH")
                .default_value("/workflows"),
        )
        .arg(
            Arg::new(ARG_SESSION_COOKIE_SECURE)
                .long(ARG_SESSION_COOKIE_SECURE)
                .help("Mark the cleared session cookie as Secure (site served over HTTPS)")
                .env("GATEHOUSE_SESSION_COOKIE_SECURE")
                .action(ArgAction::SetTrue),
        )
}

#[derive(Debug, Clone)]
pub struct Options {
    pub protected_path: String,
    pub session_cookie_secure: bool,
}

impl Options {
    /// Read the site options from validated matches.
    ///
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        Ok(Self {
            protected_path: matches
                .get_one::<String>(ARG_PROTECTED_PATH)
                .cloned()
                .context("missing required argument: --protected-path")?,
            session_cookie_secure: matches.get_flag(ARG_SESSION_COOKIE_SECURE),
        })
    }
}
