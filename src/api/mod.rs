use crate::{
    api::handlers::{health, protected, redirect},
    guard::{AccessGuard, context::REQUEST_ID_HEADER},
};
use anyhow::{Context, Result};
use axum::{
    Extension, Router,
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::{get, options},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{Span, info, info_span};
use ulid::Ulid;

pub mod config;
pub(crate) mod handlers;
mod openapi;

pub use config::{ConfigError, RedirectRule, SiteConfig};
pub use handlers::protected::ProtectedView;
pub use openapi::openapi;

/// Build the full site router: documented endpoints, redirect rules and the
/// guarded protected view.
///
/// # Errors
/// Returns an error if the site paths are invalid or conflict, or the login
/// URL cannot be sent as a redirect.
pub fn router(guard: Arc<AccessGuard>, site: SiteConfig) -> Result<Router, ConfigError> {
    site.validate()?;
    config::validate_destination(guard.config().login_url())?;

    let (api, _openapi) = openapi::api_router().split_for_parts();
    let app = redirect::mount(api, site.redirects())
        .route(site.protected_path(), get(protected::protected_view))
        .route("/health", options(health::health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static(REQUEST_ID_HEADER),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    REQUEST_ID_HEADER,
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(guard))
                .layer(Extension(Arc::new(site))),
        );

    Ok(app)
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, guard: Arc<AccessGuard>, site: SiteConfig) -> Result<()> {
    let app = router(guard, site).context("Invalid site configuration")?;

    let listener = TcpListener::bind(format!("::0:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::guard::{
        GuardConfig,
        test_support::{Behavior, StubProvider, VALID_TOKEN},
    };
    use axum::{
        body::to_bytes,
        http::{
            StatusCode,
            header::{CACHE_CONTROL, LOCATION, SET_COOKIE},
        },
    };
    use tower::ServiceExt;

    fn app(provider: Arc<StubProvider>, site: SiteConfig) -> Router {
        let guard = Arc::new(AccessGuard::new(provider, GuardConfig::new()));
        router(guard, site).unwrap()
    }

    fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn root_redirects_without_consulting_guard() {
        let provider = Arc::new(StubProvider::new(Behavior::TokenMatch));
        let response = app(provider.clone(), SiteConfig::default())
            .oneshot(get_request("/", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/workflows");
        assert_eq!(provider.verify_count(), 0);
    }

    #[tokio::test]
    async fn protected_view_renders_for_valid_session() {
        let provider = Arc::new(StubProvider::new(Behavior::TokenMatch));
        let response = app(provider, SiteConfig::default())
            .oneshot(get_request("/workflows", Some("session=valid-token")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(CACHE_CONTROL).unwrap(), "no-store");
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let page = String::from_utf8(body.to_vec()).unwrap();
        assert!(page.contains("protected server component"));
        assert!(page.contains(r#"action="/logout""#));
    }

    #[tokio::test]
    async fn protected_view_diverts_without_session() {
        let provider = Arc::new(StubProvider::new(Behavior::TokenMatch));
        let response = app(provider, SiteConfig::default())
            .oneshot(get_request("/workflows", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/login");

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let page = String::from_utf8_lossy(&body);
        assert!(!page.contains("protected server component"));
    }

    #[tokio::test]
    async fn provider_failure_diverts_like_missing_session() {
        let provider = Arc::new(StubProvider::new(Behavior::Fail));
        let response = app(provider, SiteConfig::default())
            .oneshot(get_request("/workflows", Some(&format!("session={VALID_TOKEN}"))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/login");
    }

    #[tokio::test]
    async fn custom_protected_path() {
        let provider = Arc::new(StubProvider::new(Behavior::TokenMatch));
        let app = app(provider, SiteConfig::new("/dashboard"));

        let response = app
            .clone()
            .oneshot(get_request("/", None))
            .await
            .unwrap();
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/dashboard");

        let response = app
            .oneshot(get_request("/dashboard", Some("session=valid-token")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let page = String::from_utf8(body.to_vec()).unwrap();
        assert!(page.contains("<title>Dashboard</title>"));
    }

    #[tokio::test]
    async fn logout_clears_cookie_and_diverts() {
        let provider = Arc::new(StubProvider::new(Behavior::TokenMatch));
        let response = app(provider.clone(), SiteConfig::default().with_session_cookie_secure(true))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/logout")
                    .header("cookie", "session=valid-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/login");
        let cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("session=;"));
        assert!(cookie.contains("Max-Age=0"));
        assert!(cookie.ends_with("; Secure"));
        assert_eq!(provider.end_count(), 1);
    }

    #[tokio::test]
    async fn logout_without_session_still_clears_cookie() {
        let provider = Arc::new(StubProvider::new(Behavior::TokenMatch));
        let response = app(provider.clone(), SiteConfig::default())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/logout")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(response.headers().contains_key(SET_COOKIE));
        assert_eq!(provider.end_count(), 0);
    }

    #[tokio::test]
    async fn cross_site_logout_is_rejected() {
        let provider = Arc::new(StubProvider::new(Behavior::TokenMatch));
        let response = app(provider.clone(), SiteConfig::default())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/logout")
                    .header("cookie", "session=valid-token")
                    .header("origin", "https://evil.example.net")
                    .header("host", "gate.example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(!response.headers().contains_key(SET_COOKIE));
        assert_eq!(provider.end_count(), 0);
    }

    #[tokio::test]
    async fn health_answers_get_and_options() {
        let provider = Arc::new(StubProvider::new(Behavior::TokenMatch));
        let app = app(provider, SiteConfig::default());

        let response = app
            .clone()
            .oneshot(get_request("/health", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn request_id_is_propagated() {
        let provider = Arc::new(StubProvider::new(Behavior::TokenMatch));
        let response = app(provider, SiteConfig::default())
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(REQUEST_ID_HEADER, "req-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers().get(REQUEST_ID_HEADER).unwrap(), "req-42");
    }

    #[test]
    fn invalid_site_is_rejected() {
        let guard = Arc::new(AccessGuard::new(
            Arc::new(StubProvider::new(Behavior::TokenMatch)),
            GuardConfig::new(),
        ));
        let result = router(guard, SiteConfig::new("/health"));
        assert!(matches!(result, Err(ConfigError::Reserved(_))));
    }

    #[test]
    fn capture_like_protected_path_is_an_error() {
        let guard = Arc::new(AccessGuard::new(
            Arc::new(StubProvider::new(Behavior::TokenMatch)),
            GuardConfig::new(),
        ));
        let result = router(guard, SiteConfig::new("/:id"));
        assert!(matches!(result, Err(ConfigError::NotStatic(_))));
    }

    #[test]
    fn unsendable_login_url_is_an_error() {
        let guard = Arc::new(AccessGuard::new(
            Arc::new(StubProvider::new(Behavior::TokenMatch)),
            GuardConfig::new().with_login_url("/login\n"),
        ));
        let result = router(guard, SiteConfig::default());
        assert!(matches!(result, Err(ConfigError::InvalidDestination(_))));
    }
}
