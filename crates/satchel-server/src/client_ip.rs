//! Client IP resolution for session pinning.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request};
use axum::http::HeaderMap;

use satchel_session::IpPinning;

/// The client IP of `request` under `pinning`, if one can be determined.
pub fn client_ip(request: &Request, pinning: &IpPinning) -> Option<String> {
    match pinning {
        IpPinning::Disabled => None,
        IpPinning::PeerAddress => request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string()),
        IpPinning::Header { header_name } => from_header(request.headers(), header_name),
    }
}

/// First comma-separated entry of the first `name` header, trimmed.
pub fn from_header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)?
        .to_str()
        .ok()?
        .split(',')
        .next()
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
}
