//! Middleware for `axum::Router` and HTTP request processing.
//!
//! This module provides:
//! - Request and response logging with correlation ids and redaction
//! - Recovery from handler errors, panics and timeouts
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use axum::Router;
//! use pacer_server::middleware::{
//!     RecoveryConfig, RequestLoggingOptions, RouterRecoveryExt, RouterRequestLoggingExt,
//! };
//!
//! let app: Router = Router::new()
//!     .with_request_logging(RequestLoggingOptions::default())
//!     .with_recovery(&RecoveryConfig::default());
//! ```
//!
//! Request logging must be layered before recovery so that failures are
//! recorded before they are turned into responses.

mod observability;
mod recovery;

pub use observability::*;
pub use recovery::{DEFAULT_REQUEST_TIMEOUT_SECS, RecoveryConfig, RouterRecoveryExt};
