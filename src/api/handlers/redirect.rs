use crate::api::config::RedirectRule;
use axum::{
    Router,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};

/// Mount every rule as a `GET` route answering with a redirect.
///
/// Non-permanent rules answer `307`, permanent ones `308`, so the method is kept.
pub fn mount(router: Router, rules: &[RedirectRule]) -> Router {
    rules.iter().fold(router, |router, rule| {
        let destination = rule.destination.clone();
        let permanent = rule.permanent;
        router.route(
            &rule.source,
            get(move || async move { redirect(&destination, permanent) }),
        )
    })
}

fn redirect(destination: &str, permanent: bool) -> Response {
    if permanent {
        Redirect::permanent(destination).into_response()
    } else {
        Redirect::temporary(destination).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode, header::LOCATION},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn temporary_and_permanent_rules() {
        let app = mount(
            Router::new(),
            &[
                RedirectRule::new("/", "/workflows", false),
                RedirectRule::new("/old", "/workflows", true),
            ],
        );

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/workflows");

        let response = app
            .oneshot(Request::builder().uri("/old").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
    }
}
