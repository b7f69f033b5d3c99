//! Structured records emitted by the request logging middleware.

use jiff::Timestamp;
use serde::Serialize;
use strum::{AsRefStr, Display};

use super::context::RequestId;
use super::performance::PerformanceCategory;

/// Request phase record, emitted before the downstream handler runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestRecord {
    pub request_id: RequestId,
    pub method: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_length: Option<u64>,
    pub user_agent: String,
    pub client_ip: String,
    /// Present only when header logging is enabled; already redacted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<(String, String)>>,
    /// Present only when body logging is enabled and the body is small enough.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Timing and size metrics of one completed call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestMetrics {
    pub request_id: RequestId,
    pub method: String,
    pub path: String,
    pub status_code: u16,
    pub elapsed_milliseconds: u64,
    pub timestamp: Timestamp,
    pub request_size: u64,
    pub response_size: u64,
    pub user_agent: String,
    pub client_ip: String,
}

impl RequestMetrics {
    /// Returns `true` for 2xx and 3xx responses.
    #[must_use]
    pub fn is_successful(&self) -> bool {
        (200..400).contains(&self.status_code)
    }

    /// Returns `true` for 4xx responses.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code)
    }

    /// Returns `true` for 5xx responses and above.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code >= 500
    }

    #[must_use]
    pub fn performance_category(&self) -> PerformanceCategory {
        PerformanceCategory::from_elapsed_ms(self.elapsed_milliseconds)
    }
}

/// Response details captured when response logging is enabled.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResponseDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<(String, String)>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Response phase record.
///
/// `details` is `None` when response logging is disabled and only the
/// coarse metrics are reported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseRecord {
    #[serde(flatten)]
    pub metrics: RequestMetrics,
    pub category: PerformanceCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ResponseDetails>,
}

impl ResponseRecord {
    /// Wraps `metrics`, deriving the performance category.
    #[must_use]
    pub fn new(metrics: RequestMetrics, details: Option<ResponseDetails>) -> Self {
        Self {
            category: metrics.performance_category(),
            metrics,
            details,
        }
    }
}

/// What went wrong in a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    /// The downstream service returned an error.
    Error,
    /// The downstream service panicked.
    Panic,
    /// The response body stream failed while it was being captured.
    Body,
    /// The call was dropped before it completed.
    Cancelled,
}

/// Failure record emitted in place of a response record.
///
/// Never carries a body: the failure path does not read output that may
/// not exist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureRecord {
    pub request_id: RequestId,
    pub method: String,
    pub path: String,
    pub elapsed_ms: u64,
    pub kind: FailureKind,
    pub message: String,
}
