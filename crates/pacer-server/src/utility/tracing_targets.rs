//! Centralized tracing target constants for structured logging.
//!
//! Using consistent targets enables fine-grained control over log output
//! via tracing subscriber filters, e.g. `RUST_LOG=pacer_server::request=debug`.

/// Request phase records emitted before the downstream handler runs.
pub const TRACING_TARGET_REQUEST: &str = "pacer_server::request";

/// Response phase records including timing and performance category.
pub const TRACING_TARGET_RESPONSE: &str = "pacer_server::response";

/// Downstream failures observed by the request logging middleware.
pub const TRACING_TARGET_FAILURE: &str = "pacer_server::failure";

/// Fallback diagnostics for a failing request log sink.
pub const TRACING_TARGET_SINK: &str = "pacer_server::sink";

/// Error recovery including middleware errors and request failures.
pub const TRACING_TARGET_RECOVERY_ERROR: &str = "pacer_server::recovery::error";

/// Panic recovery including handler panics and service failures.
pub const TRACING_TARGET_RECOVERY_PANIC: &str = "pacer_server::recovery::panic";
