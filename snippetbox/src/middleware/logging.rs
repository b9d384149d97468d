//! Request logging
//!
//! Logs every request before it is routed, so rejected requests (404, 405)
//! are logged too.

use axum::{
    extract::{ConnectInfo, Request},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;

/// Log client address, protocol, method and URI, then continue.
pub async fn log_request(request: Request, next: Next) -> Response {
    let ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "-".to_string(), |ConnectInfo(addr)| addr.ip().to_string());

    tracing::info!(
        ip = %ip,
        proto = ?request.version(),
        method = %request.method(),
        uri = %request.uri(),
        "received request"
    );

    next.run(request).await
}
