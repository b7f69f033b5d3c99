//! Recovery middleware for handling errors, panics, and timeouts.
//!
//! The request logging layer records downstream failures and re-raises
//! them unchanged. This stack sits outside it and turns those failures
//! into responses for the client.

use std::any::Any;
use std::future::ready;
use std::time::Duration;

use axum::Router;
use axum::error_handling::HandleErrorLayer;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
#[cfg(feature = "config")]
use clap::Args;
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower::timeout::TimeoutLayer;
use tower_http::catch_panic::CatchPanicLayer;

use crate::utility::tracing_targets::{TRACING_TARGET_RECOVERY_ERROR, TRACING_TARGET_RECOVERY_PANIC};
use crate::{Error, Result};

/// Default request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

type ResponseFut = BoxFuture<'static, Response>;
type Panic = Box<dyn Any + Send + 'static>;

/// Configuration for recovery middleware behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[serde(default)]
#[must_use = "config does nothing unless you use it"]
pub struct RecoveryConfig {
    /// Maximum duration in seconds to wait for a request to complete before timing out.
    /// Requests exceeding this duration receive a 500 response with a timeout message.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "REQUEST_TIMEOUT", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)
    )]
    pub request_timeout: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl RecoveryConfig {
    /// Creates a new configuration with the specified request timeout in seconds.
    pub fn with_timeout_secs(secs: u64) -> Self {
        Self {
            request_timeout: secs,
        }
    }

    /// Returns the request timeout as a Duration.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a zero timeout.
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout == 0 {
            return Err(Error::config("request timeout must be at least 1 second"));
        }

        Ok(())
    }
}

/// Extension trait for `axum::`[`Router`] to apply recovery middleware.
pub trait RouterRecoveryExt<S> {
    /// Layers recovery middleware with the provided configuration.
    ///
    /// This middleware stack handles request timeouts, panics in handlers,
    /// and tower service errors, converting them to `500` responses.
    fn with_recovery(self, config: &RecoveryConfig) -> Self;

    /// Layers recovery middleware with default configuration.
    fn with_default_recovery(self) -> Self;
}

impl<S> RouterRecoveryExt<S> for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_recovery(self, config: &RecoveryConfig) -> Self {
        let middlewares = ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_error))
            .layer(CatchPanicLayer::custom(catch_panic))
            .layer(TimeoutLayer::new(config.request_timeout()));

        self.layer(middlewares)
    }

    fn with_default_recovery(self) -> Self {
        self.with_recovery(&RecoveryConfig::default())
    }
}

fn handle_error(err: tower::BoxError) -> ResponseFut {
    use tower::timeout::error::Elapsed;

    let response = if err.is::<Elapsed>() {
        tracing::error!(
            target: TRACING_TARGET_RECOVERY_ERROR,
            error = %err,
            "request timeout exceeded"
        );

        (StatusCode::INTERNAL_SERVER_ERROR, "Request timeout").into_response()
    } else {
        tracing::error!(
            target: TRACING_TARGET_RECOVERY_ERROR,
            error = %err,
            "unknown middleware error"
        );

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "An unexpected error occurred",
        )
            .into_response()
    };

    ready(response).boxed()
}

fn catch_panic(err: Panic) -> Response {
    let message = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic type");

    tracing::error!(
        target: TRACING_TARGET_RECOVERY_PANIC,
        message = %message,
        "service panic"
    );

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "An unexpected panic occurred",
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::routing::get;
    use axum_test::TestServer;

    use super::*;
    use crate::middleware::{
        FailureKind, LogRecord, MemorySink, RequestLoggingOptions, RouterRequestLoggingExt,
    };

    async fn explode() -> &'static str {
        panic!("bad rep count")
    }

    async fn stall() -> &'static str {
        tokio::time::sleep(Duration::from_secs(5)).await;
        "done"
    }

    fn router(sink: Arc<MemorySink>, config: &RecoveryConfig) -> Router {
        Router::new()
            .route("/explode", get(explode))
            .route("/stall", get(stall))
            .with_request_logging_sink(RequestLoggingOptions::default(), sink)
            .with_recovery(config)
    }

    #[test]
    fn test_config_validation() {
        assert!(RecoveryConfig::default().validate().is_ok());
        assert!(RecoveryConfig::with_timeout_secs(0).validate().is_err());
        assert_eq!(
            RecoveryConfig::with_timeout_secs(5).request_timeout(),
            Duration::from_secs(5)
        );
    }

    #[tokio::test]
    async fn test_panic_is_logged_then_recovered() -> anyhow::Result<()> {
        let sink = Arc::new(MemorySink::new());
        let server = TestServer::new(router(sink.clone(), &RecoveryConfig::default()))?;

        let response = server.get("/explode").expect_failure().await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        response.assert_text("An unexpected panic occurred");

        let records = sink.records();
        let Some(LogRecord::Failure(failure)) = records.last() else {
            panic!("expected a failure record, got {records:?}");
        };
        assert_eq!(failure.kind, FailureKind::Panic);
        assert_eq!(failure.message, "bad rep count");
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_cancels_and_recovers() -> anyhow::Result<()> {
        let sink = Arc::new(MemorySink::new());
        let server = TestServer::new(router(sink.clone(), &RecoveryConfig::with_timeout_secs(1)))?;

        let response = server.get("/stall").expect_failure().await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        response.assert_text("Request timeout");

        let records = sink.records();
        let Some(LogRecord::Failure(failure)) = records.last() else {
            panic!("expected a failure record, got {records:?}");
        };
        assert_eq!(failure.kind, FailureKind::Cancelled);
        Ok(())
    }
}
