use super::request_id::REQUEST_ID_HEADER;
use axum::{
    extract::Request,
    http::header::{CONTENT_LENGTH, CONTENT_TYPE},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::info;

/// Logs one `request_completed` event per request with the declared body size
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();
    let request_id = header_str(&req, REQUEST_ID_HEADER).unwrap_or("unknown").to_string();
    let request_bytes = declared_size(&req).unwrap_or(0);
    let multipart = header_str(&req, CONTENT_TYPE.as_str())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    let response = next.run(req).await;

    let latency = start.elapsed();
    let status = response.status();

    info!(
        target: "metrics",
        method = %method,
        uri = %uri,
        request_id = %request_id,
        request_bytes,
        multipart,
        status = %status.as_u16(),
        latency_ms = %latency.as_millis(),
        "request_completed"
    );

    response
}

fn declared_size(req: &Request) -> Option<u64> {
    header_str(req, CONTENT_LENGTH.as_str())?.trim().parse().ok()
}

fn header_str<'a>(req: &'a Request, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}
