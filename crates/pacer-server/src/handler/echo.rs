//! Echo and status handlers used to exercise the middleware end to end.

use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::Deserialize;

/// Tracing target for echo operations.
const TRACING_TARGET: &str = "pacer_server::handler::echo";

/// Upper bound for an artificial delay.
const MAX_DELAY_MS: u64 = 10_000;

/// Query parameters accepted by the echo endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EchoQuery {
    /// Milliseconds to wait before answering.
    delay_ms: Option<u64>,
}

/// Returns the request body unchanged, with the same content type.
async fn echo(Query(query): Query<EchoQuery>, headers: HeaderMap, body: Bytes) -> Response {
    if let Some(delay) = query.delay_ms {
        let delay = delay.min(MAX_DELAY_MS);
        tracing::debug!(target: TRACING_TARGET, delay_ms = delay, "delaying echo");
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| header::HeaderValue::from_static("application/octet-stream"));

    ([(header::CONTENT_TYPE, content_type)], body).into_response()
}

/// Answers with the requested status code.
async fn status(Path(code): Path<u16>) -> Response {
    match StatusCode::from_u16(code) {
        Ok(status) => status.into_response(),
        Err(_) => (StatusCode::BAD_REQUEST, format!("invalid status code: {code}")).into_response(),
    }
}

/// Returns a [`Router`] with all related routes.
pub fn routes() -> Router {
    Router::new()
        .route("/echo", post(echo))
        .route("/status/{code}", get(status))
}
