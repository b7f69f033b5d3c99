//! Request extractors for connection and correlation metadata.
//!
//! - [`ClientIp`] - client address resolved from proxy headers or the socket
//! - [`RequestId`] - correlation id assigned by the request logging layer
//!
//! [`RequestId`]: crate::middleware::RequestId

mod client_ip;
mod request_id;

pub use crate::extract::client_ip::{
    ClientIp, UNKNOWN_CLIENT_IP, X_FORWARDED_FOR, X_REAL_IP, remote_addr, resolve_client_ip,
};
pub use crate::extract::request_id::MissingRequestId;
