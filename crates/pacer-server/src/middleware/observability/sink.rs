//! Destinations for request log records.
//!
//! The middleware never reaches for a global logger on its own: a sink is
//! handed to [`RequestLoggingLayer`] at construction. [`TracingSink`] is the
//! default and forwards every record to `tracing`; [`MemorySink`] keeps
//! records in memory for tests and diagnostics.
//!
//! [`RequestLoggingLayer`]: super::RequestLoggingLayer

use std::sync::{Mutex, PoisonError};

use super::metrics::{FailureRecord, RequestRecord, ResponseRecord};
use crate::Result;
use crate::utility::tracing_targets::{
    TRACING_TARGET_FAILURE, TRACING_TARGET_REQUEST, TRACING_TARGET_RESPONSE, TRACING_TARGET_SINK,
};

/// Receiver of the structured records produced for each call.
///
/// Implementations are shared by every concurrent call and must tolerate
/// concurrent writes. Returning an error never fails the request: the
/// middleware reports it once through `tracing` and carries on.
pub trait RequestLogSink: Send + Sync + 'static {
    /// Called once per call before the downstream handler runs.
    fn request_started(&self, record: &RequestRecord) -> Result<()>;

    /// Called once per call that produced a response.
    fn request_completed(&self, record: &ResponseRecord) -> Result<()>;

    /// Called once per call that failed, panicked or was cancelled.
    fn request_failed(&self, record: &FailureRecord) -> Result<()>;
}

/// Runs `write` against `sink`, reporting a failure instead of propagating it.
pub(crate) fn emit<F>(sink: &dyn RequestLogSink, write: F)
where
    F: FnOnce(&dyn RequestLogSink) -> Result<()>,
{
    if let Err(error) = write(sink) {
        tracing::warn!(
            target: TRACING_TARGET_SINK,
            error = %error,
            "failed to write request log record"
        );
    }
}

/// Sink that emits every record as a `tracing` event.
///
/// Response records are logged at `WARN` for error statuses and very slow
/// calls, `INFO` otherwise. Failures are logged at `ERROR`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl RequestLogSink for TracingSink {
    fn request_started(&self, record: &RequestRecord) -> Result<()> {
        tracing::info!(
            target: TRACING_TARGET_REQUEST,
            request_id = %record.request_id,
            method = %record.method,
            path = %record.path,
            query = record.query.as_deref(),
            content_type = record.content_type.as_deref(),
            content_length = record.content_length,
            user_agent = %record.user_agent,
            client_ip = %record.client_ip,
            headers = record.headers.as_ref().map(tracing::field::debug),
            body = record.body.as_deref(),
            "request started"
        );

        Ok(())
    }

    fn request_completed(&self, record: &ResponseRecord) -> Result<()> {
        let metrics = &record.metrics;
        let details = record.details.as_ref();

        macro_rules! completed {
            ($level:expr) => {
                tracing::event!(
                    target: TRACING_TARGET_RESPONSE,
                    $level,
                    request_id = %metrics.request_id,
                    method = %metrics.method,
                    path = %metrics.path,
                    status = metrics.status_code,
                    elapsed_ms = metrics.elapsed_milliseconds,
                    category = record.category.as_ref(),
                    timestamp = %metrics.timestamp,
                    request_size = metrics.request_size,
                    response_size = metrics.response_size,
                    user_agent = %metrics.user_agent,
                    client_ip = %metrics.client_ip,
                    content_type = details.and_then(|d| d.content_type.as_deref()),
                    headers = details
                        .and_then(|d| d.headers.as_ref())
                        .map(tracing::field::debug),
                    body = details.and_then(|d| d.body.as_deref()),
                    "request completed"
                )
            };
        }

        if metrics.status_code >= 400 || record.category.is_degraded() {
            completed!(tracing::Level::WARN);
        } else {
            completed!(tracing::Level::INFO);
        }

        Ok(())
    }

    fn request_failed(&self, record: &FailureRecord) -> Result<()> {
        tracing::error!(
            target: TRACING_TARGET_FAILURE,
            request_id = %record.request_id,
            method = %record.method,
            path = %record.path,
            elapsed_ms = record.elapsed_ms,
            kind = record.kind.as_ref(),
            error = %record.message,
            "request failed"
        );

        Ok(())
    }
}

/// Any record a sink may receive.
#[derive(Debug, Clone, PartialEq)]
pub enum LogRecord {
    Request(RequestRecord),
    Response(ResponseRecord),
    Failure(FailureRecord),
}

/// Sink that keeps every record in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the records received so far.
    #[must_use]
    pub fn records(&self) -> Vec<LogRecord> {
        self.lock().clone()
    }

    /// Removes and returns the records received so far.
    pub fn drain(&self) -> Vec<LogRecord> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<LogRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, record: LogRecord) {
        self.lock().push(record);
    }
}

impl RequestLogSink for MemorySink {
    fn request_started(&self, record: &RequestRecord) -> Result<()> {
        self.push(LogRecord::Request(record.clone()));
        Ok(())
    }

    fn request_completed(&self, record: &ResponseRecord) -> Result<()> {
        self.push(LogRecord::Response(record.clone()));
        Ok(())
    }

    fn request_failed(&self, record: &FailureRecord) -> Result<()> {
        self.push(LogRecord::Failure(record.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::middleware::observability::context::RequestId;
    use crate::middleware::observability::metrics::FailureKind;

    struct BrokenSink;

    impl RequestLogSink for BrokenSink {
        fn request_started(&self, _: &RequestRecord) -> Result<()> {
            Err(Error::sink("disk full"))
        }

        fn request_completed(&self, _: &ResponseRecord) -> Result<()> {
            Err(Error::sink("disk full"))
        }

        fn request_failed(&self, _: &FailureRecord) -> Result<()> {
            Err(Error::sink("disk full"))
        }
    }

    fn failure() -> FailureRecord {
        FailureRecord {
            request_id: RequestId::generate(),
            method: "GET".to_owned(),
            path: "/workouts".to_owned(),
            elapsed_ms: 12,
            kind: FailureKind::Error,
            message: "boom".to_owned(),
        }
    }

    #[test]
    fn test_memory_sink_keeps_order() {
        let sink = MemorySink::new();
        let first = failure();
        let second = failure();

        emit(&sink, |sink| sink.request_failed(&first));
        emit(&sink, |sink| sink.request_failed(&second));

        assert_eq!(
            sink.drain(),
            vec![LogRecord::Failure(first), LogRecord::Failure(second)]
        );
        assert!(sink.records().is_empty());
    }

    #[test]
    fn test_emit_swallows_sink_errors() {
        emit(&BrokenSink, |sink| sink.request_failed(&failure()));
    }

    #[test]
    fn test_tracing_sink_accepts_records() {
        assert!(TracingSink.request_failed(&failure()).is_ok());
    }
}
