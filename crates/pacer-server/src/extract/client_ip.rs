//! Client IP resolution from proxy headers and the transport address.
//!
//! Proxy-supplied headers are preferred over the socket address. They are
//! not verified: a client talking to an untrusted proxy, or directly to the
//! server, can put anything in `X-Forwarded-For`. Use the value for logs
//! and diagnostics, never for access control.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName};
use derive_more::{Deref, Display, From};

/// Standard proxy header listing the originating client first.
pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Single-address header set by nginx-style proxies.
pub const X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");

/// Placeholder returned when no source yields an address.
pub const UNKNOWN_CLIENT_IP: &str = "Unknown";

/// Resolves the client address of a request.
///
/// In order of preference: the first comma-separated entry of
/// `X-Forwarded-For`, then `X-Real-IP`, then the transport `remote_addr`,
/// and finally [`UNKNOWN_CLIENT_IP`]. Header entries are trimmed and empty
/// entries are skipped.
#[must_use]
pub fn resolve_client_ip(headers: &HeaderMap, remote_addr: Option<SocketAddr>) -> String {
    let header_value = |name: &HeaderName| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    let forwarded = header_value(&X_FORWARDED_FOR)
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    if let Some(client) = forwarded.or_else(|| header_value(&X_REAL_IP)) {
        return client.to_owned();
    }

    remote_addr.map_or_else(
        || UNKNOWN_CLIENT_IP.to_owned(),
        |addr| addr.ip().to_string(),
    )
}

/// Returns the transport address axum recorded for the connection, if the
/// app is served with `into_make_service_with_connect_info::<SocketAddr>()`.
#[must_use]
pub fn remote_addr(extensions: &axum::http::Extensions) -> Option<SocketAddr> {
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}

/// Extractor for the resolved client address.
///
/// # Examples
///
/// ```rust
/// use pacer_server::extract::ClientIp;
///
/// async fn handler(client_ip: ClientIp) -> String {
///     format!("hello, {client_ip}")
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deref, Display, From)]
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(resolve_client_ip(
            &parts.headers,
            remote_addr(&parts.extensions),
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use axum::http::HeaderValue;

    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.append(*name, HeaderValue::from_static(value));
        }
        headers
    }

    fn socket() -> Option<SocketAddr> {
        Some(SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)), 51000))
    }

    #[test]
    fn test_forwarded_for_first_entry_wins() {
        let headers = headers(&[
            ("x-forwarded-for", "203.0.113.5, 10.0.0.1"),
            ("x-real-ip", "198.51.100.7"),
        ]);
        assert_eq!(resolve_client_ip(&headers, socket()), "203.0.113.5");
    }

    #[test]
    fn test_real_ip_is_second_choice() {
        let headers = headers(&[("x-real-ip", " 198.51.100.7 ")]);
        assert_eq!(resolve_client_ip(&headers, socket()), "198.51.100.7");
    }

    #[test]
    fn test_empty_headers_fall_through() {
        let blank = headers(&[("x-forwarded-for", " "), ("x-real-ip", "")]);
        assert_eq!(resolve_client_ip(&blank, socket()), "192.168.1.20");

        let leading_comma = headers(&[("x-forwarded-for", ", 10.0.0.1")]);
        assert_eq!(resolve_client_ip(&leading_comma, socket()), "192.168.1.20");
    }

    #[test]
    fn test_socket_address_drops_port() {
        assert_eq!(resolve_client_ip(&HeaderMap::new(), socket()), "192.168.1.20");
    }

    #[test]
    fn test_unknown_without_any_source() {
        assert_eq!(resolve_client_ip(&HeaderMap::new(), None), UNKNOWN_CLIENT_IP);
    }

    #[tokio::test]
    async fn test_extractor_reads_connect_info() {
        let mut request = axum::http::Request::builder()
            .uri("/workouts")
            .body(())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([10, 1, 2, 3], 8080))));
        let (mut parts, ()) = request.into_parts();

        let Ok(ClientIp(ip)) = ClientIp::from_request_parts(&mut parts, &()).await;
        assert_eq!(ip, "10.1.2.3");
    }
}
