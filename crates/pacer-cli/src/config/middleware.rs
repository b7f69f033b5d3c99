//! Middleware configuration for the HTTP server.
//!
//! All middleware configs are re-exported from `pacer-server` and support
//! both CLI arguments and environment variables.
//!
//! # Example
//!
//! ```bash
//! # Log request bodies and time out after a minute
//! pacer-cli --log-request-body true --request-timeout 60
//! ```

use clap::Args;
use pacer_server::middleware::{RecoveryConfig, RequestLoggingOptions};
use serde::{Deserialize, Serialize};

use super::TRACING_TARGET_CONFIG;

/// Middleware configuration combining request logging and recovery settings.
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    /// Request logging configuration.
    ///
    /// Controls what is logged for each request and which headers and
    /// paths are left out.
    #[clap(flatten)]
    #[serde(default)]
    pub request_logging: RequestLoggingOptions,

    /// Recovery middleware configuration.
    ///
    /// Controls request timeout and panic recovery behavior.
    #[clap(flatten)]
    #[serde(default)]
    pub recovery: RecoveryConfig,
}

impl MiddlewareConfig {
    /// Validates every middleware group.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.request_logging.validate()?;
        self.recovery.validate()?;
        Ok(())
    }

    /// Logs middleware configuration at info level.
    pub fn log(&self) {
        let logging = &self.request_logging;

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            log_requests = logging.log_requests,
            log_responses = logging.log_responses,
            log_headers = logging.log_headers,
            log_request_body = logging.log_request_body,
            log_response_body = logging.log_response_body,
            max_body_log_size = logging.max_body_log_size,
            sensitive_headers = ?logging.sensitive_headers,
            excluded_paths = ?logging.excluded_paths,
            use_excluded_paths = logging.use_excluded_paths,
            "Request logging configuration"
        );

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            request_timeout_secs = self.recovery.request_timeout,
            "Recovery configuration"
        );
    }
}
