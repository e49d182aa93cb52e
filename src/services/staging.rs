use crate::api::error::AppError;
use crate::utils::validation::validate_file_size;
use chrono::Utc;
use std::path::Path;
use tempfile::NamedTempFile;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

/// Bytes kept from the start of the upload for format sniffing
const HEADER_LEN: usize = 8;
const CHUNK_SIZE: usize = 64 * 1024;

/// An upload written to the upload directory for the duration of one request.
///
/// The file is removed when this value is dropped, so every exit path of the
/// request (including cancellation) cleans up. Call [`StagedUpload::discard`]
/// to remove it eagerly and log removal failures.
#[derive(Debug)]
pub struct StagedUpload {
    file: NamedTempFile,
    header: Vec<u8>,
    size: usize,
}

impl StagedUpload {
    /// Creates an empty file named `<unix millis>-<random>.<extension>` in `dir`,
    /// creating the directory first if needed.
    pub async fn create(dir: &Path, extension: &str) -> Result<Self, AppError> {
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            AppError::Internal(format!(
                "Failed to create upload directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        let prefix = format!("{}-", Utc::now().timestamp_millis());
        let suffix = if extension.is_empty() {
            String::new()
        } else {
            format!(".{}", extension)
        };

        let file = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(&suffix)
            .rand_bytes(8)
            .tempfile_in(dir)
            .map_err(|e| AppError::Internal(format!("Failed to create temporary file: {}", e)))?;

        tracing::debug!("Staging upload at {}", file.path().display());

        Ok(Self {
            file,
            header: Vec::with_capacity(HEADER_LEN),
            size: 0,
        })
    }

    /// Streams `reader` into the file, failing with `FileTooLarge` as soon as
    /// more than `max_size` bytes have arrived.
    pub async fn fill<R>(&mut self, mut reader: R, max_size: usize) -> Result<usize, AppError>
    where
        R: AsyncRead + Unpin,
    {
        let handle = self.file.as_file().try_clone()?;
        let mut out = tokio::fs::File::from_std(handle);
        let mut buf = vec![0u8; CHUNK_SIZE];

        loop {
            let n = reader
                .read(&mut buf)
                .await
                .map_err(|e| read_error(e, max_size))?;
            if n == 0 {
                break;
            }

            self.size += n;
            validate_file_size(self.size, max_size)?;

            if self.header.len() < HEADER_LEN {
                let take = (HEADER_LEN - self.header.len()).min(n);
                self.header.extend_from_slice(&buf[..take]);
            }

            out.write_all(&buf[..n]).await?;
        }

        out.flush().await?;
        Ok(self.size)
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Leading bytes of the content
    pub fn header(&self) -> &[u8] {
        &self.header
    }

    /// Removes the file now.
    pub fn discard(self) {
        let path = self.file.path().to_path_buf();
        match self.file.close() {
            Ok(()) => tracing::debug!("Removed temporary file {}", path.display()),
            Err(e) => tracing::warn!(
                "Failed to remove temporary file {}: {}",
                path.display(),
                e
            ),
        }
    }
}

fn read_error(e: std::io::Error, max_size: usize) -> AppError {
    let msg = e.to_string();
    if e.kind() == std::io::ErrorKind::FileTooLarge || msg.contains("length limit exceeded") {
        AppError::FileTooLarge { max: max_size }
    } else {
        AppError::BadRequest(format!("Falha ao ler o arquivo enviado: {}", msg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(dir: &Path) -> Vec<std::path::PathBuf> {
        std::fs::read_dir(dir)
            .map(|rd| rd.filter_map(|e| e.ok()).map(|e| e.path()).collect())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_create_makes_directory_and_names_file() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("nested").join("uploads");

        let staged = StagedUpload::create(&dir, "xlsx").await.unwrap();
        assert!(dir.is_dir());

        let name = staged.path().file_name().unwrap().to_str().unwrap().to_string();
        assert!(name.ends_with(".xlsx"), "unexpected name {}", name);
        let (millis, _) = name.split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok(), "unexpected name {}", name);
    }

    #[tokio::test]
    async fn test_fill_writes_content_and_header() {
        let dir = tempfile::tempdir().unwrap();
        let mut staged = StagedUpload::create(dir.path(), "xls").await.unwrap();

        let content = b"PK\x03\x04 some zipped workbook bytes".to_vec();
        let size = staged.fill(&content[..], 1024).await.unwrap();

        assert_eq!(size, content.len());
        assert_eq!(staged.header(), &content[..HEADER_LEN]);
        assert_eq!(std::fs::read(staged.path()).unwrap(), content);
    }

    #[tokio::test]
    async fn test_fill_rejects_oversized_content() {
        let dir = tempfile::tempdir().unwrap();
        let mut staged = StagedUpload::create(dir.path(), "xlsx").await.unwrap();

        let content = vec![0u8; 4096];
        let err = staged.fill(&content[..], 1000).await.unwrap_err();
        assert!(matches!(err, AppError::FileTooLarge { max: 1000 }));

        drop(staged);
        assert!(entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_discard_and_drop_remove_file() {
        let dir = tempfile::tempdir().unwrap();

        let staged = StagedUpload::create(dir.path(), "xlsx").await.unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());
        staged.discard();
        assert!(!path.exists());

        let staged = StagedUpload::create(dir.path(), "").await.unwrap();
        let path = staged.path().to_path_buf();
        drop(staged);
        assert!(!path.exists());
        assert!(entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_uploads_get_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = StagedUpload::create(dir.path(), "xlsx").await.unwrap();
        let b = StagedUpload::create(dir.path(), "xlsx").await.unwrap();
        assert_ne!(a.path(), b.path());
    }
}
