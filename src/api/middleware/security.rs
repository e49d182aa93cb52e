use crate::api::error::AppError;
use axum::{
    extract::Request,
    http::{Method, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

pub const SERVER_NAME: &str = "spreadsheet-ingest";

pub async fn security_headers(req: Request, next: Next) -> Response {
    // Reject TRACE and TRACK (proxy disclosure)
    let method = req.method();
    if *method == Method::TRACE || method.as_str() == "TRACK" {
        return AppError::MethodNotAllowed(method.clone()).into_response();
    }

    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    // Pages that need more set their own policy
    if !headers.contains_key(header::CONTENT_SECURITY_POLICY) {
        headers.insert(
            header::CONTENT_SECURITY_POLICY,
            header::HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
        );
    }

    headers.insert(
        header::X_FRAME_OPTIONS,
        header::HeaderValue::from_static("DENY"),
    );

    headers.insert(
        header::REFERRER_POLICY,
        header::HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    // Prevent MIME sniffing
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        header::HeaderValue::from_static("nosniff"),
    );

    // Suppress fingerprinting
    headers.insert(header::SERVER, header::HeaderValue::from_static(SERVER_NAME));

    // Parsed rows are never cached
    if !headers.contains_key(header::CACHE_CONTROL) {
        headers.insert(
            header::CACHE_CONTROL,
            header::HeaderValue::from_static("no-store"),
        );
    }

    response
}
