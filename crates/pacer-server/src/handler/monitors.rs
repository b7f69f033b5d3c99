//! Liveness check handlers.

use axum::Json;
use axum::Router;
use axum::routing::get;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Tracing target for monitor operations.
const TRACING_TARGET: &str = "pacer_server::handler::monitors";

/// Body of a successful health check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub checked_at: Timestamp,
}

async fn health_status() -> Json<HealthResponse> {
    tracing::debug!(target: TRACING_TARGET, "health status check requested");

    Json(HealthResponse {
        status: "ok".to_owned(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
        checked_at: Timestamp::now(),
    })
}

/// Returns a [`Router`] with all related routes.
pub fn routes() -> Router {
    Router::new()
        .route("/health", get(health_status))
        .route("/healthcheck", get(health_status))
        .route("/ping", get(|| async { "pong" }))
}

#[cfg(test)]
mod test {
    use super::HealthResponse;
    use crate::handler::test::create_test_server;

    #[tokio::test]
    async fn health_reports_ok() -> anyhow::Result<()> {
        let server = create_test_server()?;
        let response = server.get("/health").await;
        response.assert_status_ok();

        let body = response.json::<HealthResponse>();
        assert_eq!(body.status, "ok");
        assert_eq!(body.version, env!("CARGO_PKG_VERSION"));
        Ok(())
    }

    #[tokio::test]
    async fn ping_answers_pong() -> anyhow::Result<()> {
        let server = create_test_server()?;
        server.get("/ping").await.assert_text("pong");
        Ok(())
    }
}
