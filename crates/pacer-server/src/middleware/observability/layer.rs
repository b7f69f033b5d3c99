//! The request logging middleware.
//!
//! [`RequestLoggingLayer`] wraps a downstream service and, per call:
//!
//! 1. skips everything for excluded paths,
//! 2. assigns a [`RequestId`] and stores it in the request extensions,
//! 3. emits a request record (optional),
//! 4. runs the downstream service, capturing the response body when
//!    response logging is enabled,
//! 5. emits exactly one response or failure record and hands the original
//!    response, or the original failure, back to the caller.

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, resume_unwind};
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::BoxError;
use axum::body::Body;
use axum::extract::Request;
use axum::http::{HeaderMap, HeaderName, StatusCode, header};
use axum::response::Response;
use bytes::Bytes;
use futures::FutureExt;
use futures::future::BoxFuture;
use http_body::Body as HttpBody;
use tower::{Layer, Service};
use tracing::Instrument;

use super::capture::BodyCapture;
use super::context::RequestContext;
use super::metrics::{
    FailureKind, RequestMetrics, RequestRecord, ResponseDetails, ResponseRecord,
};
use super::options::{RequestLoggingOptions, RequestLoggingPolicy};
use super::redaction::filter_headers;
use super::sink::{RequestLogSink, TracingSink, emit};
use crate::extract::{remote_addr, resolve_client_ip};
use crate::utility::tracing_targets::TRACING_TARGET_REQUEST;

/// [`Layer`] applying [`RequestLogging`] to a service.
///
/// The options are normalized once and shared read-only by every service
/// the layer produces.
#[derive(Clone)]
pub struct RequestLoggingLayer {
    policy: Arc<RequestLoggingPolicy>,
    sink: Arc<dyn RequestLogSink>,
}

impl RequestLoggingLayer {
    /// Creates a layer writing to [`TracingSink`].
    pub fn new(options: RequestLoggingOptions) -> Self {
        Self::with_sink(options, Arc::new(TracingSink))
    }

    /// Creates a layer writing to `sink`.
    pub fn with_sink(options: RequestLoggingOptions, sink: Arc<dyn RequestLogSink>) -> Self {
        Self {
            policy: Arc::new(options.into()),
            sink,
        }
    }

    /// Returns the normalized options in effect.
    #[must_use]
    pub fn policy(&self) -> &RequestLoggingPolicy {
        &self.policy
    }
}

impl Default for RequestLoggingLayer {
    fn default() -> Self {
        Self::new(RequestLoggingOptions::default())
    }
}

impl fmt::Debug for RequestLoggingLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestLoggingLayer")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl<S> Layer<S> for RequestLoggingLayer {
    type Service = RequestLogging<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLogging {
            inner,
            policy: self.policy.clone(),
            sink: self.sink.clone(),
        }
    }
}

/// Middleware logging every request and response passing through `S`.
#[derive(Clone)]
pub struct RequestLogging<S> {
    inner: S,
    policy: Arc<RequestLoggingPolicy>,
    sink: Arc<dyn RequestLogSink>,
}

impl<S, ResBody> Service<Request> for RequestLogging<S>
where
    S: Service<Request, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: fmt::Display + Send + 'static,
    ResBody: HttpBody<Data = Bytes> + Send + 'static,
    ResBody::Error: Into<BoxError>,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        // The clone may not be ready; keep it and use the one that was polled.
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(invoke(
            inner,
            request,
            self.policy.clone(),
            self.sink.clone(),
        ))
    }
}

/// Result of running the downstream service.
enum Outcome<T, E> {
    Success(T),
    Failure(Fault<E>),
}

/// A downstream failure, kept intact so it can be re-raised unchanged.
enum Fault<E> {
    Error(E),
    Panic(Box<dyn Any + Send + 'static>),
}

impl<E: fmt::Display> Fault<E> {
    fn kind(&self) -> FailureKind {
        match self {
            Self::Error(_) => FailureKind::Error,
            Self::Panic(_) => FailureKind::Panic,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Error(error) => error.to_string(),
            Self::Panic(payload) => payload
                .downcast_ref::<String>()
                .map(String::as_str)
                .or_else(|| payload.downcast_ref::<&str>().copied())
                .unwrap_or("unknown panic type")
                .to_owned(),
        }
    }

    /// Re-raises the failure: errors are returned, panics resume unwinding.
    fn raise<T>(self) -> Result<T, E> {
        match self {
            Self::Error(error) => Err(error),
            Self::Panic(payload) => resume_unwind(payload),
        }
    }
}

/// Runs `inner` and classifies how it finished, including panics raised
/// while the downstream future is created or polled.
async fn run_downstream<S, ResBody>(mut inner: S, request: Request) -> Outcome<Response<ResBody>, S::Error>
where
    S: Service<Request, Response = Response<ResBody>>,
{
    let downstream = async move { inner.call(request).await };

    match AssertUnwindSafe(downstream).catch_unwind().await {
        Ok(Ok(response)) => Outcome::Success(response),
        Ok(Err(error)) => Outcome::Failure(Fault::Error(error)),
        Err(payload) => Outcome::Failure(Fault::Panic(payload)),
    }
}

/// Request attributes computed once and repeated in the response record.
struct CallInfo {
    user_agent: String,
    client_ip: String,
    request_size: u64,
}

async fn invoke<S, ResBody>(
    mut inner: S,
    mut request: Request,
    policy: Arc<RequestLoggingPolicy>,
    sink: Arc<dyn RequestLogSink>,
) -> Result<Response, S::Error>
where
    S: Service<Request, Response = Response<ResBody>> + Send,
    S::Future: Send,
    S::Error: fmt::Display + Send,
    ResBody: HttpBody<Data = Bytes> + Send + 'static,
    ResBody::Error: Into<BoxError>,
{
    if policy.is_excluded(request.uri().path()) {
        return inner.call(request).await.map(|response| response.map(Body::new));
    }

    let context = RequestContext::start(request.method().clone(), request.uri().path(), sink);
    request.extensions_mut().insert(context.request_id().clone());

    let call = CallInfo {
        user_agent: header_str(request.headers(), &header::USER_AGENT)
            .unwrap_or_default()
            .to_owned(),
        client_ip: resolve_client_ip(request.headers(), remote_addr(request.extensions())),
        request_size: content_length(request.headers()).unwrap_or(0),
    };

    if policy.log_requests {
        request = log_request(&context, &policy, &call, request).await;
    }

    let span = tracing::info_span!(
        target: TRACING_TARGET_REQUEST,
        "request",
        request_id = %context.request_id(),
        method = %context.method(),
        path = %context.path(),
    );

    let response = match run_downstream(inner, request).instrument(span).await {
        Outcome::Success(response) => response,
        Outcome::Failure(fault) => {
            let record = context.failure_record(fault.kind(), fault.describe());
            emit(context.sink(), |sink| sink.request_failed(&record));
            context.finish();
            return fault.raise();
        }
    };

    if !policy.log_responses {
        let response_size = content_length(response.headers())
            .or_else(|| response.body().size_hint().exact())
            .unwrap_or(0);
        let metrics = request_metrics(&context, &call, response.status(), response_size);
        let record = ResponseRecord::new(metrics, None);
        emit(context.sink(), |sink| sink.request_completed(&record));
        context.finish();

        return Ok(response.map(Body::new));
    }

    let (parts, body) = response.into_parts();
    let capture = BodyCapture::read(body).await;

    if let Some(error) = capture.error() {
        let record = context.failure_record(FailureKind::Body, error.to_string());
        emit(context.sink(), |sink| sink.request_failed(&record));
        context.finish();

        return Ok(Response::from_parts(parts, capture.flush_to()));
    }

    let details = ResponseDetails {
        content_type: header_str(&parts.headers, &header::CONTENT_TYPE).map(str::to_owned),
        content_length: content_length(&parts.headers),
        headers: policy
            .log_headers
            .then(|| filter_headers(&parts.headers, &policy.sensitive_headers))
            .filter(|headers| !headers.is_empty()),
        body: policy
            .log_response_body
            .then(|| capture.loggable(policy.max_body_log_size))
            .flatten(),
    };

    let metrics = request_metrics(&context, &call, parts.status, capture.len());
    let record = ResponseRecord::new(metrics, Some(details));
    emit(context.sink(), |sink| sink.request_completed(&record));
    context.finish();

    Ok(Response::from_parts(parts, capture.flush_to()))
}

/// Emits the request record, buffering the body when it is to be logged.
///
/// The returned request carries a body equal to the one received.
async fn log_request(
    context: &RequestContext,
    policy: &RequestLoggingPolicy,
    call: &CallInfo,
    request: Request,
) -> Request {
    let declared_length = content_length(request.headers());

    let mut record = RequestRecord {
        request_id: context.request_id().clone(),
        method: request.method().to_string(),
        path: request.uri().path().to_owned(),
        query: request.uri().query().map(str::to_owned),
        content_type: header_str(request.headers(), &header::CONTENT_TYPE).map(str::to_owned),
        content_length: declared_length,
        user_agent: call.user_agent.clone(),
        client_ip: call.client_ip.clone(),
        headers: policy
            .log_headers
            .then(|| filter_headers(request.headers(), &policy.sensitive_headers))
            .filter(|headers| !headers.is_empty()),
        body: None,
    };

    let request = if policy.accepts_request_body(declared_length) {
        let (parts, body) = request.into_parts();
        let capture = BodyCapture::read(body).await;
        record.body = capture.loggable(policy.max_body_log_size);
        Request::from_parts(parts, capture.flush_to())
    } else {
        request
    };

    emit(context.sink(), |sink| sink.request_started(&record));
    request
}

fn request_metrics(
    context: &RequestContext,
    call: &CallInfo,
    status: StatusCode,
    response_size: u64,
) -> RequestMetrics {
    RequestMetrics {
        request_id: context.request_id().clone(),
        method: context.method().to_string(),
        path: context.path().to_owned(),
        status_code: status.as_u16(),
        elapsed_milliseconds: context.elapsed_ms(),
        timestamp: context.received_at(),
        request_size: call.request_size,
        response_size,
        user_agent: call.user_agent.clone(),
        client_ip: call.client_ip.clone(),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Parses `Content-Length`; malformed or negative values count as absent.
fn content_length(headers: &HeaderMap) -> Option<u64> {
    header_str(headers, &header::CONTENT_LENGTH).and_then(|value| value.trim().parse().ok())
}
