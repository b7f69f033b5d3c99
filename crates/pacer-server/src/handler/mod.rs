//! All `axum::`[`Router`]s with related `axum::`[`Handler`]s.
//!
//! The route set is intentionally small: a health check, an echo endpoint
//! and a status endpoint give the request logging middleware a real
//! downstream to observe.
//!
//! [`Router`]: axum::routing::Router
//! [`Handler`]: axum::handler::Handler

mod echo;
mod monitors;

use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

pub use crate::handler::monitors::HealthResponse;

#[inline]
async fn fallback() -> Response {
    (StatusCode::NOT_FOUND, "Resource not found").into_response()
}

/// Returns a [`Router`] with all routes.
pub fn routes() -> Router {
    Router::new()
        .merge(monitors::routes())
        .merge(echo::routes())
        .fallback(fallback)
}
