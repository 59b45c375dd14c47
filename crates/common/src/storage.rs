//! Image storage abstraction for report photos.
//!
//! The platform only keeps the URL returned by the store; hosted image services plug
//! in behind [`StorageBackend`] the same way the local filesystem backend does.

use std::path::PathBuf;

use crate::{AppError, AppResult};

/// Uploaded file metadata.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Storage key (path or object key).
    pub key: String,
    /// Public URL to access the file.
    pub url: String,
    /// File size in bytes.
    pub size: u64,
    /// MIME content type.
    pub content_type: String,
}

/// Storage backend trait.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Upload a file.
    async fn upload(&self, key: &str, data: &[u8], content_type: &str)
    -> AppResult<UploadedFile>;

    /// Get the public URL for a key.
    fn public_url(&self, key: &str) -> String;
}

/// Local filesystem storage backend.
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new local storage backend.
    #[must_use]
    pub const fn new(base_path: PathBuf, base_url: String) -> Self {
        Self {
            base_path,
            base_url,
        }
    }
}

#[async_trait::async_trait]
impl StorageBackend for LocalStorage {
    async fn upload(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> AppResult<UploadedFile> {
        if key.split('/').any(|segment| segment == "..") {
            return Err(AppError::Validation(format!("Invalid storage key: {key}")));
        }

        let path = self.base_path.join(key);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::ExternalService(format!("Failed to create directory: {e}")))?;
        }

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AppError::ExternalService(format!("Failed to write file: {e}")))?;

        tracing::debug!(key = %key, size = data.len(), "Stored image");

        Ok(UploadedFile {
            key: key.to_string(),
            url: self.public_url(key),
            size: data.len() as u64,
            content_type: content_type.to_string(),
        })
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_url_joins_cleanly() {
        let storage = LocalStorage::new(PathBuf::from("/tmp"), "https://cdn.example.com/".into());
        assert_eq!(
            storage.public_url("civic/reports/a.png"),
            "https://cdn.example.com/civic/reports/a.png"
        );
    }

    #[tokio::test]
    async fn test_upload_writes_file() {
        let dir = std::env::temp_dir().join(format!("civic-storage-{}", ulid::Ulid::new()));
        let storage = LocalStorage::new(dir.clone(), "/files".into());

        let uploaded = storage
            .upload("reports/2024/01/pothole/report_1.png", b"png-bytes", "image/png")
            .await
            .unwrap();

        assert_eq!(uploaded.url, "/files/reports/2024/01/pothole/report_1.png");
        assert_eq!(uploaded.size, 9);
        let written = tokio::fs::read(dir.join("reports/2024/01/pothole/report_1.png"))
            .await
            .unwrap();
        assert_eq!(written, b"png-bytes");

        let _ = tokio::fs::remove_dir_all(dir).await;
    }

    #[tokio::test]
    async fn test_upload_rejects_parent_traversal() {
        let storage = LocalStorage::new(std::env::temp_dir(), "/files".into());
        let result = storage.upload("../escape.png", b"x", "image/png").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
