//! Request logging configuration.

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use super::redaction::{CaseInsensitiveSet, DEFAULT_SENSITIVE_HEADERS};
use crate::{Error, Result};

/// Default maximum size of a logged body: 4KB.
pub const DEFAULT_MAX_BODY_LOG_SIZE: u64 = 4096;

/// Probe and asset paths skipped entirely by default.
pub const DEFAULT_EXCLUDED_PATHS: &[&str] =
    &["/health", "/healthcheck", "/ping", "/metrics", "/favicon.ico"];

fn default_sensitive_headers() -> Vec<String> {
    DEFAULT_SENSITIVE_HEADERS.iter().map(ToString::to_string).collect()
}

fn default_excluded_paths() -> Vec<String> {
    DEFAULT_EXCLUDED_PATHS.iter().map(ToString::to_string).collect()
}

/// Configuration for the request logging middleware.
///
/// The options are consumed by [`RequestLoggingLayer`] and frozen for the
/// lifetime of the layer; build a new layer to change them.
///
/// [`RequestLoggingLayer`]: super::RequestLoggingLayer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[serde(default)]
#[must_use = "config does nothing unless you use it"]
pub struct RequestLoggingOptions {
    /// Emit a record for every incoming request before it is handled.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "REQUEST_LOG_REQUESTS", default_value_t = true, action = clap::ArgAction::Set)
    )]
    pub log_requests: bool,

    /// Capture responses and emit a detailed record for each of them.
    /// When disabled only coarse metrics are logged on completion.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "REQUEST_LOG_RESPONSES", default_value_t = true, action = clap::ArgAction::Set)
    )]
    pub log_responses: bool,

    /// Include request and response headers, minus the sensitive ones.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "REQUEST_LOG_HEADERS", default_value_t = false, action = clap::ArgAction::Set)
    )]
    pub log_headers: bool,

    /// Include request bodies smaller than `max_body_log_size`.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "REQUEST_LOG_REQUEST_BODY", default_value_t = false, action = clap::ArgAction::Set)
    )]
    pub log_request_body: bool,

    /// Include response bodies smaller than `max_body_log_size`.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "REQUEST_LOG_RESPONSE_BODY", default_value_t = false, action = clap::ArgAction::Set)
    )]
    pub log_response_body: bool,

    /// Bodies of this many bytes or more are never logged.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "REQUEST_LOG_MAX_BODY_SIZE", default_value_t = DEFAULT_MAX_BODY_LOG_SIZE)
    )]
    pub max_body_log_size: u64,

    /// Header names never written to the logs, compared case-insensitively.
    #[cfg_attr(
        feature = "config",
        arg(
            long,
            env = "REQUEST_LOG_SENSITIVE_HEADERS",
            value_delimiter = ',',
            default_values_t = default_sensitive_headers()
        )
    )]
    pub sensitive_headers: Vec<String>,

    /// Paths for which nothing is logged, compared case-insensitively.
    #[cfg_attr(
        feature = "config",
        arg(
            long,
            env = "REQUEST_LOG_EXCLUDED_PATHS",
            value_delimiter = ',',
            default_values_t = default_excluded_paths()
        )
    )]
    pub excluded_paths: Vec<String>,

    /// Whether `excluded_paths` is honoured.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "REQUEST_LOG_USE_EXCLUDED_PATHS", default_value_t = true, action = clap::ArgAction::Set)
    )]
    pub use_excluded_paths: bool,
}

impl Default for RequestLoggingOptions {
    fn default() -> Self {
        Self {
            log_requests: true,
            log_responses: true,
            log_headers: false,
            log_request_body: false,
            log_response_body: false,
            max_body_log_size: DEFAULT_MAX_BODY_LOG_SIZE,
            sensitive_headers: default_sensitive_headers(),
            excluded_paths: default_excluded_paths(),
            use_excluded_paths: true,
        }
    }
}

impl RequestLoggingOptions {
    /// Enables header, request body and response body logging.
    pub fn verbose() -> Self {
        Self {
            log_headers: true,
            log_request_body: true,
            log_response_body: true,
            ..Self::default()
        }
    }

    pub fn with_log_requests(mut self, enabled: bool) -> Self {
        self.log_requests = enabled;
        self
    }

    pub fn with_log_responses(mut self, enabled: bool) -> Self {
        self.log_responses = enabled;
        self
    }

    pub fn with_log_headers(mut self, enabled: bool) -> Self {
        self.log_headers = enabled;
        self
    }

    pub fn with_log_request_body(mut self, enabled: bool) -> Self {
        self.log_request_body = enabled;
        self
    }

    pub fn with_log_response_body(mut self, enabled: bool) -> Self {
        self.log_response_body = enabled;
        self
    }

    pub fn with_max_body_log_size(mut self, bytes: u64) -> Self {
        self.max_body_log_size = bytes;
        self
    }

    /// Replaces the sensitive header set.
    pub fn with_sensitive_headers<I, T>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.sensitive_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the excluded path set.
    pub fn with_excluded_paths<I, T>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.excluded_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_use_excluded_paths(mut self, enabled: bool) -> Self {
        self.use_excluded_paths = enabled;
        self
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if an excluded path does not start
    /// with `/` or a sensitive header name is blank.
    pub fn validate(&self) -> Result<()> {
        if let Some(path) = self.excluded_paths.iter().find(|path| !path.starts_with('/')) {
            return Err(Error::config(format!(
                "excluded path '{path}' must start with '/'"
            )));
        }

        if self.sensitive_headers.iter().any(|name| name.trim().is_empty()) {
            return Err(Error::config("sensitive header names must not be blank"));
        }

        Ok(())
    }
}

/// Normalized, read-only form of [`RequestLoggingOptions`] shared by every
/// clone of the middleware service.
#[derive(Debug, Clone)]
pub struct RequestLoggingPolicy {
    pub log_requests: bool,
    pub log_responses: bool,
    pub log_headers: bool,
    pub log_request_body: bool,
    pub log_response_body: bool,
    pub max_body_log_size: u64,
    pub sensitive_headers: CaseInsensitiveSet,
    pub excluded_paths: CaseInsensitiveSet,
    pub use_excluded_paths: bool,
}

impl RequestLoggingPolicy {
    /// Returns `true` if nothing is logged for `path`.
    #[must_use]
    pub fn is_excluded(&self, path: &str) -> bool {
        self.use_excluded_paths && self.excluded_paths.contains(path)
    }

    /// Returns `true` if a request body of the declared length may be
    /// buffered for logging.
    ///
    /// Absent, zero, or too large lengths are skipped silently.
    #[must_use]
    pub fn accepts_request_body(&self, content_length: Option<u64>) -> bool {
        self.log_request_body
            && content_length.is_some_and(|len| len > 0 && len < self.max_body_log_size)
    }
}

impl From<RequestLoggingOptions> for RequestLoggingPolicy {
    fn from(options: RequestLoggingOptions) -> Self {
        Self {
            log_requests: options.log_requests,
            log_responses: options.log_responses,
            log_headers: options.log_headers,
            log_request_body: options.log_request_body,
            log_response_body: options.log_response_body,
            max_body_log_size: options.max_body_log_size,
            sensitive_headers: CaseInsensitiveSet::new(&options.sensitive_headers),
            excluded_paths: CaseInsensitiveSet::new(&options.excluded_paths),
            use_excluded_paths: options.use_excluded_paths,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = RequestLoggingOptions::default();
        assert!(options.log_requests);
        assert!(options.log_responses);
        assert!(!options.log_headers);
        assert!(!options.log_request_body);
        assert!(!options.log_response_body);
        assert_eq!(options.max_body_log_size, 4096);
        assert!(options.use_excluded_paths);
        assert_eq!(options.sensitive_headers.len(), 8);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_excluded_paths_ignore_case() {
        let policy = RequestLoggingPolicy::from(RequestLoggingOptions::default());
        assert!(policy.is_excluded("/health"));
        assert!(policy.is_excluded("/HEALTH"));
        assert!(policy.is_excluded("/Favicon.ico"));
        assert!(!policy.is_excluded("/health/deep"));
        assert!(!policy.is_excluded("/workouts"));
    }

    #[test]
    fn test_exclusion_can_be_disabled() {
        let options = RequestLoggingOptions::default().with_use_excluded_paths(false);
        let policy = RequestLoggingPolicy::from(options);
        assert!(!policy.is_excluded("/health"));
    }

    #[test]
    fn test_request_body_gate() {
        let policy = RequestLoggingPolicy::from(
            RequestLoggingOptions::default()
                .with_log_request_body(true)
                .with_max_body_log_size(100),
        );

        assert!(!policy.accepts_request_body(None));
        assert!(!policy.accepts_request_body(Some(0)));
        assert!(policy.accepts_request_body(Some(1)));
        assert!(policy.accepts_request_body(Some(99)));
        assert!(!policy.accepts_request_body(Some(100)));

        let disabled = RequestLoggingPolicy::from(RequestLoggingOptions::default());
        assert!(!disabled.accepts_request_body(Some(10)));
    }

    #[test]
    fn test_validation_rejects_bad_entries() {
        let relative = RequestLoggingOptions::default().with_excluded_paths(["health"]);
        assert!(relative.validate().is_err());

        let blank = RequestLoggingOptions::default().with_sensitive_headers(["Cookie", " "]);
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_deserialize_fills_defaults() -> anyhow::Result<()> {
        let options: RequestLoggingOptions =
            serde_json::from_str(r#"{ "log_headers": true, "max_body_log_size": 128 }"#)?;

        assert!(options.log_headers);
        assert!(options.log_requests);
        assert_eq!(options.max_body_log_size, 128);
        assert_eq!(options.excluded_paths.len(), DEFAULT_EXCLUDED_PATHS.len());
        Ok(())
    }
}
