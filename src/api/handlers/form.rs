use axum::{
    http::header,
    response::{Html, IntoResponse},
};

/// The page only talks to its own origin and carries inline script and style
const FORM_CSP: &str = "default-src 'self'; script-src 'self' 'unsafe-inline'; \
style-src 'self' 'unsafe-inline'; img-src 'self' data:; frame-ancestors 'none'";

pub async fn upload_form() -> impl IntoResponse {
    (
        [(header::CONTENT_SECURITY_POLICY, FORM_CSP)],
        Html(include_str!("../../static/upload.html")),
    )
}
