//! Request and response logging middleware.
//!
//! This module provides:
//! - [`RequestLoggingLayer`] wrapping any HTTP service
//! - Structured request, response and failure records
//! - Redaction of sensitive headers and size-gated body capture
//! - Performance classification of completed calls
//!
//! # Example
//!
//! ```rust,no_run
//! use axum::Router;
//! use axum::routing::get;
//! use pacer_server::middleware::{RequestLoggingOptions, RouterRequestLoggingExt};
//!
//! let app: Router = Router::new()
//!     .route("/workouts", get(|| async { "[]" }))
//!     .with_request_logging(RequestLoggingOptions::default().with_log_headers(true));
//! ```

mod capture;
mod context;
mod layer;
mod metrics;
mod options;
mod performance;
mod redaction;
mod sink;

use std::sync::Arc;

use axum::Router;

pub use self::capture::{BodyCapture, CapturedBody};
pub use self::context::{REQUEST_ID_LEN, RequestContext, RequestId};
pub use self::layer::{RequestLogging, RequestLoggingLayer};
pub use self::metrics::{
    FailureKind, FailureRecord, RequestMetrics, RequestRecord, ResponseDetails, ResponseRecord,
};
pub use self::options::{
    DEFAULT_EXCLUDED_PATHS, DEFAULT_MAX_BODY_LOG_SIZE, RequestLoggingOptions, RequestLoggingPolicy,
};
pub use self::performance::{
    FAST_THRESHOLD_MS, NORMAL_THRESHOLD_MS, PerformanceCategory, SLOW_THRESHOLD_MS, classify,
};
pub use self::redaction::{
    CaseInsensitiveSet, DEFAULT_SENSITIVE_HEADERS, HEADER_VALUE_SEPARATOR, filter_headers,
};
pub use self::sink::{LogRecord, MemorySink, RequestLogSink, TracingSink};

/// Extension trait for `axum::`[`Router`] to apply request logging.
pub trait RouterRequestLoggingExt<S> {
    /// Layers request logging writing to [`TracingSink`].
    fn with_request_logging(self, options: RequestLoggingOptions) -> Self;

    /// Layers request logging writing to `sink`.
    fn with_request_logging_sink(
        self,
        options: RequestLoggingOptions,
        sink: Arc<dyn RequestLogSink>,
    ) -> Self;
}

impl<S> RouterRequestLoggingExt<S> for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_request_logging(self, options: RequestLoggingOptions) -> Self {
        self.layer(RequestLoggingLayer::new(options))
    }

    fn with_request_logging_sink(
        self,
        options: RequestLoggingOptions,
        sink: Arc<dyn RequestLogSink>,
    ) -> Self {
        self.layer(RequestLoggingLayer::with_sink(options, sink))
    }
}
