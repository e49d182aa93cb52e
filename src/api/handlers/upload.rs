use crate::AppState;
use crate::api::error::AppError;
use crate::services::ingest_service::{StagedSpreadsheet, UploadMeta};
use crate::services::spreadsheet::Row;
use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
    http::{Method, StatusCode},
};
use futures::TryStreamExt;
use serde::Serialize;
use std::io;
use tokio_util::io::StreamReader;
use utoipa::ToSchema;

pub const SUCCESS_MESSAGE: &str = "Arquivo processado com sucesso!";

/// Multipart form accepted by the upload endpoint
#[derive(ToSchema)]
pub struct UploadForm {
    /// Excel workbook (.xls or .xlsx)
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    /// Human readable outcome
    #[serde(rename = "data")]
    pub message: String,
    /// Records of the first sheet, keyed by header
    #[serde(rename = "resultado")]
    #[schema(value_type = Vec<Object>)]
    pub rows: Vec<Row>,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[utoipa::path(
    post,
    path = "/api/upload",
    request_body(content = UploadForm, description = "Spreadsheet upload", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Spreadsheet parsed", body = UploadResponse),
        (status = 400, description = "Missing, unsupported, oversized, empty or unreadable file", body = ErrorResponse),
        (status = 405, description = "Method other than POST", body = ErrorResponse)
    ),
    tag = "upload"
)]
pub async fn upload_spreadsheet(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let service = state.ingest.clone();
    let max_size = service.config().max_file_size;

    let result: Result<Json<UploadResponse>, AppError> = async {
        let mut staged: Option<StagedSpreadsheet> = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error(e, max_size))?
        {
            let name = field.name().unwrap_or_default().to_string();
            let filename = field.file_name().map(str::to_string);

            match filename {
                // Browsers send an empty file part when nothing was selected
                Some(filename) if name == "file" && filename.is_empty() => continue,
                Some(filename) if name == "file" && staged.is_none() => {
                    let meta = UploadMeta {
                        filename,
                        content_type: field.content_type().map(str::to_string),
                    };
                    tracing::info!(
                        "Receiving '{}' ({})",
                        meta.filename,
                        meta.content_type.as_deref().unwrap_or("no content type")
                    );
                    let reader = StreamReader::new(field.map_err(to_io_error));
                    staged = Some(service.stage(meta, reader).await?);
                }
                Some(_) => return Err(AppError::UnexpectedField(name)),
                // Plain text fields are not used
                None => continue,
            }
        }

        let staged = staged.ok_or(AppError::NoFileProvided)?;
        let rows = service.parse(staged).await?;

        Ok(Json(UploadResponse {
            message: SUCCESS_MESSAGE.to_string(),
            rows,
        }))
    }
    .await;

    match result {
        Ok(res) => Ok(res),
        Err(e) => {
            // Consume the remaining multipart stream so the client receives the
            // error instead of a connection reset
            tracing::warn!("Upload rejected: {}. Consuming remaining stream...", e);
            while let Ok(Some(mut field)) = multipart.next_field().await {
                while let Ok(Some(_)) = field.chunk().await {}
            }
            Err(e)
        }
    }
}

/// Any method other than POST on the upload route
pub async fn method_not_allowed(method: Method) -> AppError {
    AppError::MethodNotAllowed(method)
}

fn to_io_error(e: MultipartError) -> io::Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        io::Error::new(io::ErrorKind::FileTooLarge, e)
    } else {
        io::Error::other(e)
    }
}

fn multipart_error(e: MultipartError, max_size: usize) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::FileTooLarge { max: max_size }
    } else {
        AppError::BadRequest(e.body_text())
    }
}
