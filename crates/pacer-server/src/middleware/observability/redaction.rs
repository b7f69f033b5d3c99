//! Header redaction for request and response log records.
//!
//! Redaction here means omission: a sensitive header never appears in a
//! record, not even with a masked value.

use std::collections::HashSet;

use axum::http::HeaderMap;

/// Separator used to join the values of a repeated header.
pub const HEADER_VALUE_SEPARATOR: &str = ", ";

/// Header names that are never logged unless the caller replaces the set.
pub const DEFAULT_SENSITIVE_HEADERS: &[&str] = &[
    "Authorization",
    "Cookie",
    "Set-Cookie",
    "X-API-Key",
    "X-Auth-Token",
    "Authentication",
    "Proxy-Authorization",
    "X-Forwarded-Authorization",
];

/// Immutable set of strings compared without regard to case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseInsensitiveSet {
    entries: HashSet<String>,
}

impl CaseInsensitiveSet {
    /// Builds a set from arbitrary-case entries.
    pub fn new<I, T>(entries: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let entries = entries
            .into_iter()
            .map(|entry| entry.as_ref().trim().to_lowercase())
            .filter(|entry| !entry.is_empty())
            .collect();

        Self { entries }
    }

    /// Returns `true` if the set holds `value` under any casing.
    #[must_use]
    pub fn contains(&self, value: &str) -> bool {
        if self.entries.is_empty() {
            return false;
        }

        self.entries.contains(&value.to_lowercase())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Returns the loggable subset of `headers`.
///
/// Names found in `sensitive` are dropped. Every other header is kept once,
/// in first-appearance order, with all of its values joined by
/// [`HEADER_VALUE_SEPARATOR`]. Values that are not valid UTF-8 are converted
/// lossily.
#[must_use]
pub fn filter_headers(headers: &HeaderMap, sensitive: &CaseInsensitiveSet) -> Vec<(String, String)> {
    headers
        .keys()
        .filter(|name| !sensitive.contains(name.as_str()))
        .map(|name| {
            let value = headers
                .get_all(name)
                .iter()
                .map(|value| String::from_utf8_lossy(value.as_bytes()))
                .collect::<Vec<_>>()
                .join(HEADER_VALUE_SEPARATOR);

            (name.as_str().to_owned(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderName, HeaderValue, header};

    use super::*;

    fn default_sensitive() -> CaseInsensitiveSet {
        CaseInsensitiveSet::new(DEFAULT_SENSITIVE_HEADERS)
    }

    #[test]
    fn test_sensitive_headers_are_omitted() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        headers.insert(header::COOKIE, HeaderValue::from_static("session=1"));
        headers.insert("x-api-key", HeaderValue::from_static("secret"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let logged = filter_headers(&headers, &default_sensitive());

        assert_eq!(
            logged,
            vec![("accept".to_owned(), "application/json".to_owned())]
        );
    }

    #[test]
    fn test_repeated_values_are_joined() {
        let mut headers = HeaderMap::new();
        headers.append(header::ACCEPT_ENCODING, HeaderValue::from_static("gzip"));
        headers.append(header::ACCEPT_ENCODING, HeaderValue::from_static("br"));

        let logged = filter_headers(&headers, &default_sensitive());

        assert_eq!(
            logged,
            vec![("accept-encoding".to_owned(), "gzip, br".to_owned())]
        );
    }

    #[test]
    fn test_membership_ignores_case() {
        let sensitive = CaseInsensitiveSet::new(["X-Custom-Secret"]);
        assert!(sensitive.contains("x-custom-secret"));
        assert!(sensitive.contains("X-CUSTOM-SECRET"));
        assert!(!sensitive.contains("x-custom"));

        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-custom-secret"),
            HeaderValue::from_static("hidden"),
        );
        assert!(filter_headers(&headers, &sensitive).is_empty());
    }

    #[test]
    fn test_filter_keeps_every_other_header() {
        let names = [
            "accept",
            "authorization",
            "content-type",
            "set-cookie",
            "user-agent",
            "x-auth-token",
            "x-forwarded-authorization",
            "x-request-source",
        ];
        let sensitive = default_sensitive();

        let mut headers = HeaderMap::new();
        for name in names {
            headers.insert(
                HeaderName::from_static(name),
                HeaderValue::from_str(&format!("value-of-{name}")).unwrap(),
            );
        }

        let logged = filter_headers(&headers, &sensitive);

        for (name, value) in &logged {
            assert!(!sensitive.contains(name), "{name} must not be logged");
            assert_eq!(value, &format!("value-of-{name}"));
        }
        for name in names.iter().filter(|name| !sensitive.contains(name)) {
            assert!(logged.iter().any(|(logged_name, _)| logged_name == name));
        }
        assert_eq!(logged.len(), 4);
    }

    #[test]
    fn test_empty_entries_are_ignored() {
        let set = CaseInsensitiveSet::new(["", "  ", "Cookie"]);
        assert_eq!(set.len(), 1);
        assert!(!set.contains(""));
    }
}
