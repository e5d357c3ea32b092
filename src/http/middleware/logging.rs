//! Request logging, the outermost admission stage.
//!
//! Runs for every call, including ones a later gate rejects.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Request},
    middleware::Next,
    response::Response,
};

use crate::http::request::request_id;
use crate::observability::metrics;

fn header_str<'a>(request: &'a Request<Body>, name: &str) -> &'a str {
    request
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
}

pub async fn request_logging_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request_id(&request);

    tracing::info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        client = %addr.ip(),
        forwarded_for = %header_str(&request, "x-forwarded-for"),
        user_agent = %header_str(&request, header::USER_AGENT.as_str()),
        "Request"
    );

    let response = next.run(request).await;

    let status = response.status();
    tracing::info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = status.as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Response"
    );
    metrics::record_request(method.as_str(), status.as_u16(), start);

    response
}
