//! Per-request correlation identity and timing.

use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;
use derive_more::Display;
use jiff::Timestamp;
use serde::Serialize;
use tokio::time::Instant;
use uuid::Uuid;

use super::metrics::{FailureKind, FailureRecord};
use super::sink::{RequestLogSink, emit};

/// Number of hex characters in a [`RequestId`].
pub const REQUEST_ID_LEN: usize = 8;

/// Short token correlating the request record of a call with its response
/// or failure record.
///
/// The middleware stores it in the request extensions so handlers and
/// error reporters can reference it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Generates a fresh identifier from a random UUID.
    #[must_use]
    pub fn generate() -> Self {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(REQUEST_ID_LEN);
        Self(id)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for RequestId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// State owned by a single in-flight call.
///
/// The context also guards the "exactly one terminal record" rule: if it
/// is dropped before [`RequestContext::finish`] was called, for example
/// because an outer timeout dropped the request future, it emits a
/// [`FailureKind::Cancelled`] record.
pub struct RequestContext {
    request_id: RequestId,
    started_at: Instant,
    received_at: Timestamp,
    method: Method,
    path: String,
    sink: Arc<dyn RequestLogSink>,
    finished: bool,
}

impl RequestContext {
    /// Creates the context and starts its timer.
    pub fn start(method: Method, path: impl Into<String>, sink: Arc<dyn RequestLogSink>) -> Self {
        Self {
            request_id: RequestId::generate(),
            started_at: Instant::now(),
            received_at: Timestamp::now(),
            method,
            path: path.into(),
            sink,
            finished: false,
        }
    }

    #[must_use]
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// Wall-clock time at which the call arrived.
    #[must_use]
    pub fn received_at(&self) -> Timestamp {
        self.received_at
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn sink(&self) -> &dyn RequestLogSink {
        self.sink.as_ref()
    }

    /// Time since the context was started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Elapsed time in whole milliseconds, saturating.
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Marks the terminal record as emitted and stops the drop guard.
    pub fn finish(mut self) {
        self.finished = true;
    }

    /// Builds a failure record for this call at the current elapsed time.
    #[must_use]
    pub fn failure_record(&self, kind: FailureKind, message: impl Into<String>) -> FailureRecord {
        FailureRecord {
            request_id: self.request_id.clone(),
            method: self.method.to_string(),
            path: self.path.clone(),
            elapsed_ms: self.elapsed_ms(),
            kind,
            message: message.into(),
        }
    }
}

impl Drop for RequestContext {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        let record = self.failure_record(
            FailureKind::Cancelled,
            "request was dropped before it completed",
        );
        emit(self.sink.as_ref(), |sink| sink.request_failed(&record));
    }
}
