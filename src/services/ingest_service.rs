use crate::api::error::AppError;
use crate::config::UploadConfig;
use crate::services::spreadsheet::{self, Row, SheetError, SpreadsheetKind};
use crate::services::staging::StagedUpload;
use crate::utils::validation::{file_extension, validate_mime_type};
use tokio::io::AsyncRead;

/// Client-supplied description of the uploaded file
#[derive(Debug, Clone)]
pub struct UploadMeta {
    pub filename: String,
    pub content_type: Option<String>,
}

/// A validated upload sitting in the upload directory
#[derive(Debug)]
pub struct StagedSpreadsheet {
    pub meta: UploadMeta,
    pub file: StagedUpload,
}

pub struct IngestService {
    config: UploadConfig,
}

impl IngestService {
    pub fn new(config: UploadConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Validates the declared type, then writes the content to a temporary file
    /// while enforcing the size limit. Nothing is written for a rejected type.
    pub async fn stage<R>(&self, meta: UploadMeta, reader: R) -> Result<StagedSpreadsheet, AppError>
    where
        R: AsyncRead + Unpin,
    {
        validate_mime_type(meta.content_type.as_deref(), &self.config.allowed_mimes)?;

        let extension = file_extension(&meta.filename);
        let mut file = StagedUpload::create(&self.config.upload_dir, &extension).await?;
        let size = file.fill(reader, self.config.max_file_size).await?;

        tracing::info!(
            "Staged upload '{}' ({} bytes) at {}",
            meta.filename,
            size,
            file.path().display()
        );

        Ok(StagedSpreadsheet { meta, file })
    }

    /// Parses the first sheet, removing the temporary file before returning.
    pub async fn parse(&self, staged: StagedSpreadsheet) -> Result<Vec<Row>, AppError> {
        let StagedSpreadsheet { meta, file } = staged;

        let kind = SpreadsheetKind::detect(file.header(), meta.content_type.as_deref());
        let path = file.path().to_path_buf();

        let outcome = match kind {
            Some(kind) => {
                tokio::task::spawn_blocking(move || spreadsheet::parse_first_sheet(&path, kind))
                    .await
                    .map_err(|e| AppError::ParseFailure(format!("parser task failed: {}", e)))
            }
            None => Ok(Err(SheetError::UnknownFormat)),
        };

        file.discard();

        match outcome? {
            Ok(rows) => {
                tracing::info!("Parsed {} rows from '{}'", rows.len(), meta.filename);
                Ok(rows)
            }
            Err(SheetError::Empty) => {
                tracing::info!("Upload '{}' has no data rows", meta.filename);
                Err(AppError::EmptySpreadsheet)
            }
            Err(e) => Err(AppError::ParseFailure(format!("{}: {}", meta.filename, e))),
        }
    }
}
