pub mod api;
pub mod config;
pub mod services;
pub mod utils;

use crate::api::handlers::{form, health, upload};
use crate::api::middleware::{
    metrics::metrics_middleware, request_id::request_id_middleware, security::security_headers,
};
use crate::config::UploadConfig;
use crate::services::ingest_service::IngestService;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Room for multipart boundaries and part headers on top of the file itself
pub const MULTIPART_OVERHEAD: usize = 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::upload::upload_spreadsheet,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::upload::UploadForm,
            api::handlers::upload::UploadResponse,
            api::handlers::upload::ErrorResponse,
            api::handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "upload", description = "Spreadsheet upload and parsing"),
        (name = "system", description = "Service status")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub ingest: Arc<IngestService>,
}

impl AppState {
    pub fn new(config: UploadConfig) -> Self {
        Self {
            ingest: Arc::new(IngestService::new(config)),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let config = state.ingest.config();
    let body_limit = config.max_file_size + MULTIPART_OVERHEAD;
    let cors = cors_layer(&config.allowed_origins);

    Router::new()
        .route("/", get(form::upload_form))
        .route("/health", get(health::health_check))
        .route(
            "/api/upload",
            post(upload::upload_spreadsheet)
                .fallback(upload::method_not_allowed)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .layer(from_fn(security_headers))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(from_fn(metrics_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}
