//! Sign-out control target.

use crate::{
    api::config::SiteConfig,
    guard::{AccessGuard, Diversion, IdentityContext},
};
use axum::{
    extract::Extension,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{HOST, InvalidHeaderValue, ORIGIN, SET_COOKIE},
    },
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{error, warn};
use url::Url;

const SEC_FETCH_SITE: &str = "sec-fetch-site";

#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 303, description = "Session ended and cookie cleared; redirects to the login URL"),
        (status = 403, description = "Request came from another site")
    ),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    guard: Extension<Arc<AccessGuard>>,
    site: Extension<Arc<SiteConfig>>,
) -> Response {
    if !is_same_origin(&headers) {
        warn!("Rejected cross-site sign-out");
        return (StatusCode::FORBIDDEN, "Cross-site sign-out rejected").into_response();
    }

    let context = IdentityContext::from_headers(&headers, guard.config().session_cookie());
    guard.sign_out(&context).await;

    // Always clear the cookie, even if the provider did not know the session.
    let mut response_headers = HeaderMap::new();
    match clear_session_cookie(guard.config().session_cookie(), site.session_cookie_secure()) {
        Ok(cookie) => {
            response_headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => error!("Failed to build session cookie: {err}"),
    }

    (response_headers, Diversion::to(guard.config().login_url())).into_response()
}

/// Browsers send `Sec-Fetch-Site` or `Origin` on form posts; requests with
/// neither (non-browser clients) are allowed.
fn is_same_origin(headers: &HeaderMap) -> bool {
    if let Some(site) = headers.get(SEC_FETCH_SITE) {
        return matches!(site.to_str(), Ok("same-origin" | "none"));
    }

    let Some(origin) = headers.get(ORIGIN) else {
        return true;
    };

    let origin_authority = origin
        .to_str()
        .ok()
        .and_then(|value| Url::parse(value).ok())
        .and_then(|url| {
            let host = url.host_str()?.to_string();
            Some(match url.port() {
                Some(port) => format!("{host}:{port}"),
                None => host,
            })
        });
    let host = headers.get(HOST).and_then(|value| value.to_str().ok());

    match (origin_authority, host) {
        (Some(origin), Some(host)) => origin.eq_ignore_ascii_case(host),
        _ => false,
    }
}

fn clear_session_cookie(name: &str, secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{name}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}
