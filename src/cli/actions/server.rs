use crate::{
    api::{self, SiteConfig},
    guard::{AccessGuard, GuardConfig},
    provider::RemoteIdentityProvider,
};
use anyhow::{Context, Result};
use std::{sync::Arc, time::Duration};
use tracing::info;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub identity_url: Url,
    pub login_url: String,
    pub session_cookie: String,
    pub verify_timeout_seconds: u64,
    pub protected_path: String,
    pub session_cookie_secure: bool,
}

fn log_startup_args(args: &Args) {
    info!(
        port = args.port,
        identity_url = %args.identity_url,
        login_url = %args.login_url,
        session_cookie = %args.session_cookie,
        verify_timeout_seconds = args.verify_timeout_seconds,
        protected_path = %args.protected_path,
        session_cookie_secure = args.session_cookie_secure,
        "starting gatehouse"
    );
}

/// Build the guard and site from the arguments.
///
/// # Errors
/// Returns an error if the identity provider client cannot be built or the site paths are invalid.
pub fn build(args: &Args) -> Result<(Arc<AccessGuard>, SiteConfig)> {
    let verify_timeout = Duration::from_secs(args.verify_timeout_seconds);

    let provider = RemoteIdentityProvider::new(
        &args.identity_url,
        args.session_cookie.clone(),
        verify_timeout,
    )
    .context("Failed to build identity provider client")?;

    let guard_config = GuardConfig::new()
        .with_login_url(args.login_url.clone())
        .with_session_cookie(args.session_cookie.clone())
        .with_verify_timeout(verify_timeout);

    let site = SiteConfig::new(args.protected_path.clone())
        .with_session_cookie_secure(args.session_cookie_secure);
    site.validate().context("Invalid --protected-path")?;

    Ok((
        Arc::new(AccessGuard::new(Arc::new(provider), guard_config)),
        site,
    ))
}

/// Execute the server action.
/// # Errors
/// Returns an error if the configuration is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let (guard, site) = build(&args)?;

    api::new(args.port, guard, site).await
}
