use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

use super::UploadError;

/// Longest sanitized filename component kept in a stored name
const MAX_NAME_CHARS: usize = 120;

/// Raw upload storage: one file per bill under the uploads directory.
pub struct UploadStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl UploadStore {
    pub fn new(dir: &Path, max_bytes: usize) -> Self {
        Self {
            dir: dir.to_path_buf(),
            max_bytes,
        }
    }

    /// Write the bytes as `<millis>-<uuid>-<sanitized filename>`.
    /// Returns the path of the stored file.
    pub fn store(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, UploadError> {
        if bytes.is_empty() {
            return Err(UploadError::EmptyFile);
        }
        if bytes.len() > self.max_bytes {
            return Err(UploadError::FileTooLarge {
                size: bytes.len(),
                max: self.max_bytes,
            });
        }

        std::fs::create_dir_all(&self.dir)?;

        let stored_name = format!(
            "{}-{}-{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple(),
            sanitize_filename(filename)
        );
        let target_path = self.dir.join(stored_name);
        std::fs::write(&target_path, bytes)?;

        tracing::debug!(size = bytes.len(), "Upload stored");

        Ok(target_path)
    }

    /// Read back the stored bytes of an upload
    pub fn read(&self, path: &Path) -> Result<Vec<u8>, UploadError> {
        Ok(std::fs::read(path)?)
    }
}

/// Strip directory components and anything outside `[A-Za-z0-9._-]`.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_NAME_CHARS)
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "bill".to_string()
    } else {
        trimmed.to_string()
    }
}
