use std::env;
use std::path::PathBuf;

/// MIME type of legacy binary workbooks (.xls)
pub const XLS_MIME: &str = "application/vnd.ms-excel";

/// MIME type of Office Open XML workbooks (.xlsx)
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Upload configuration handed to the ingest service
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Maximum file size in bytes (default: 10 MiB)
    pub max_file_size: usize,

    /// Directory holding in-flight uploads (default: "<tmp>/uploads")
    pub upload_dir: PathBuf,

    /// Accepted declared MIME types
    pub allowed_mimes: Vec<String>,

    /// Allowed CORS Origins (comma separated)
    pub allowed_origins: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024, // 10 MiB
            upload_dir: env::temp_dir().join("uploads"),
            allowed_mimes: vec![XLS_MIME.to_string(), XLSX_MIME.to_string()],
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(), // Vite default
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

impl UploadConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            upload_dir: env::var("UPLOAD_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(default.upload_dir),

            allowed_mimes: env::var("ALLOWED_MIMES")
                .ok()
                .map(|v| split_list(&v))
                .filter(|v| !v.is_empty())
                .unwrap_or(default.allowed_mimes),

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|v| split_list(&v))
                .filter(|v| !v.is_empty())
                .unwrap_or(default.allowed_origins),
        }
    }

    pub fn with_upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = dir.into();
        self
    }

    pub fn with_max_file_size(mut self, max_file_size: usize) -> Self {
        self.max_file_size = max_file_size;
        self
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
