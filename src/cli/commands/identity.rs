use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command, builder::ValueParser};
use url::Url;

pub const ARG_IDENTITY_URL: &str = "identity-url";
pub const ARG_LOGIN_URL: &str = "login-url";
pub const ARG_SESSION_COOKIE: &str = "session-cookie";
pub const ARG_VERIFY_TIMEOUT_SECONDS: &str = "verify-timeout-seconds";

/// Identity service base URL; only `http` and `https` are accepted.
#[must_use]
pub fn validator_http_url() -> ValueParser {
    ValueParser::from(move |value: &str| -> std::result::Result<Url, String> {
        let url = Url::parse(value).map_err(|err| format!("invalid URL: {err}"))?;
        match url.scheme() {
            "http" | "https" if url.host().is_some() => Ok(url),
            "http" | "https" => Err("URL must include a host".to_string()),
            scheme => Err(format!("unsupported scheme: {scheme}")),
        }
    })
}

/// Login target: an absolute `http(s)` URL or a same-site path.
#[must_use]
pub fn validator_login_url() -> ValueParser {
    ValueParser::from(move |value: &str| -> std::result::Result<String, String> {
        if !value.chars().all(|c| c.is_ascii_graphic()) {
            return Err(format!("login URL must be visible ASCII: {value:?}"));
        }

        if value.starts_with('/') {
            return if value.starts_with("//") {
                Err("login path must not start with '//'".to_string())
            } else {
                Ok(value.to_string())
            };
        }

        let url = Url::parse(value).map_err(|err| format!("invalid login URL: {err}"))?;
        match url.scheme() {
            "http" | "https" if url.host().is_some() => Ok(value.to_string()),
            "http" | "https" => Err("login URL must include a host".to_string()),
            scheme => Err(format!("unsupported scheme: {scheme}")),
        }
    })
}

/// Cookie names are RFC 6265 tokens.
#[must_use]
pub fn validator_cookie_name() -> ValueParser {
    ValueParser::from(move |value: &str| -> std::result::Result<String, String> {
        let valid = !value.is_empty()
            && value.chars().all(|c| {
                c.is_ascii_graphic() && !"()<>@,;:\\\"/[]?={}".contains(c)
            });
        if valid {
            Ok(value.to_string())
        } else {
            Err(format!("invalid cookie name: {value:?}"))
        }
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_IDENTITY_URL)
                .long(ARG_IDENTITY_URL)
                .help("Identity service base URL, example: https://id.example.com")
                .long_help(
                    "Identity service base URL. Sessions are verified with GET <url>/v1/auth/session and ended with POST <url>/v1/auth/logout.",
                )
                .env("GATEHOUSE_IDENTITY_URL")
                .required(true)
                .value_parser(validator_http_url()),
        )
        .arg(
            Arg::new(ARG_LOGIN_URL)
                .long(ARG_LOGIN_URL)
                .help("Where unauthenticated callers are redirected")
                .env("GATEHOUSE_LOGIN_URL")
                .default_value("/login")
                .value_parser(validator_login_url()),
        )
        .arg(
            Arg::new(ARG_SESSION_COOKIE)
                .long(ARG_SESSION_COOKIE)
                .help("Name of the session cookie")
                .env("GATEHOUSE_SESSION_COOKIE")
                .default_value("session")
                .value_parser(validator_cookie_name()),
        )
        .arg(
            Arg::new(ARG_VERIFY_TIMEOUT_SECONDS)
                .long(ARG_VERIFY_TIMEOUT_SECONDS)
                .help("Seconds to wait for the identity service before denying access")
                .env("GATEHOUSE_VERIFY_TIMEOUT_SECONDS")
                .default_value("5")
                .value_parser(clap::value_parser!(u64).range(1..=60)),
        )
}

#[derive(Debug, Clone)]
pub struct Options {
    pub identity_url: Url,
    pub login_url: String,
    pub session_cookie: String,
    pub verify_timeout_seconds: u64,
}

impl Options {
    /// Read the identity options from validated matches.
    ///
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        Ok(Self {
            identity_url: matches
                .get_one::<Url>(ARG_IDENTITY_URL)
                .cloned()
                .context("missing required argument: --identity-url")?,
            login_url: matches
                .get_one::<String>(ARG_LOGIN_URL)
                .cloned()
                .context("missing required argument: --login-url")?,
            session_cookie: matches
                .get_one::<String>(ARG_SESSION_COOKIE)
                .cloned()
                .context("missing required argument: --session-cookie")?,
            verify_timeout_seconds: matches
                .get_one::<u64>(ARG_VERIFY_TIMEOUT_SECONDS)
                .copied()
                .unwrap_or(5),
        })
    }
}
