use axum::{
    Json,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Nenhum arquivo foi enviado.")]
    NoFileProvided,

    #[error("Tipo de arquivo não suportado.")]
    UnsupportedFileType(String),

    #[error("O arquivo excede o tamanho máximo permitido de {}.", format_size(.max))]
    FileTooLarge { max: usize },

    #[error("A planilha está vazia.")]
    EmptySpreadsheet,

    #[error("Erro ao processar o arquivo.")]
    ParseFailure(String),

    #[error("Campo inesperado: {0}")]
    UnexpectedField(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Método {0} não permitido.")]
    MethodNotAllowed(Method),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

fn format_size(bytes: &usize) -> String {
    if *bytes >= 1024 * 1024 {
        format!("{} MB", bytes / 1024 / 1024)
    } else {
        format!("{} KB", bytes.div_ceil(1024))
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::ParseFailure(detail) => {
                tracing::error!("Failed to parse spreadsheet: {}", detail);
                self.to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Erro interno do servidor.".to_string()
            }
            AppError::UnsupportedFileType(mime) => {
                tracing::warn!("Rejected upload with MIME type '{}'", mime);
                self.to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
