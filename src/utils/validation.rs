use crate::api::error::AppError;
use std::path::Path;

/// Longest extension carried over from the client filename
const MAX_EXTENSION_LEN: usize = 8;

/// Validates file size against maximum limit
pub fn validate_file_size(size: usize, max_size: usize) -> Result<(), AppError> {
    if size > max_size {
        return Err(AppError::FileTooLarge { max: max_size });
    }
    Ok(())
}

/// Reduces a Content-Type header value to its lowercased essence
/// ("type/subtype", parameters stripped)
pub fn normalize_mime(content_type: &str) -> String {
    match content_type.trim().parse::<mime::Mime>() {
        Ok(m) => m.essence_str().to_lowercase(),
        Err(_) => content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_lowercase(),
    }
}

/// Validates the declared MIME type against the allowlist
pub fn validate_mime_type(content_type: Option<&str>, allowed: &[String]) -> Result<(), AppError> {
    let declared = content_type.unwrap_or("");
    let normalized = normalize_mime(declared);

    if !normalized.is_empty()
        && allowed
            .iter()
            .any(|a| a.eq_ignore_ascii_case(&normalized))
    {
        return Ok(());
    }

    Err(AppError::UnsupportedFileType(declared.to_string()))
}

/// Extension of the client filename, safe to use in a local file name.
/// Returns an empty string when there is none.
pub fn file_extension(filename: &str) -> String {
    // Browsers on Windows may send full paths; keep only the last component
    let name = filename.rsplit(['/', '\\']).next().unwrap_or("");

    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| {
            !e.is_empty()
                && e.len() <= MAX_EXTENSION_LEN
                && e.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}
