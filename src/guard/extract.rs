//! Axum extractor running the guard before a handler body.
//!
//! A handler taking [`Authenticated`] is only called with a confirmed
//! identity; otherwise the rejection (a redirect) is returned instead.

use super::{AccessGuard, IdentityContext};
use crate::provider::Identity;
use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::error;

#[derive(Clone, Debug)]
pub struct Authenticated(pub Identity);

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(guard) = parts.extensions.get::<Arc<AccessGuard>>().cloned() else {
            error!("AccessGuard extension missing; refusing to render protected content");
            return Err(StatusCode::INTERNAL_SERVER_ERROR.into_response());
        };

        let context = IdentityContext::from_headers(&parts.headers, guard.config().session_cookie());

        guard
            .require(&context)
            .await
            .map(Authenticated)
            .map_err(IntoResponse::into_response)
    }
}
