//! Report photo uploads.

use std::sync::Arc;

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use civic_common::{AppError, AppResult, StorageBackend};
use serde::{Deserialize, Serialize};

use crate::access::{Caller, Operation};

/// Largest decoded image accepted.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Input for an image upload.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UploadImageInput {
    /// `data:image/<subtype>;base64,<payload>`
    pub data_url: String,
    pub folder: Option<String>,
    pub category: Option<String>,
}

/// Where an uploaded image ended up.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedImage {
    pub url: String,
    pub folder: String,
    pub public_id: String,
}

/// A decoded data URL.
#[derive(Debug, PartialEq, Eq)]
pub struct ImagePayload {
    pub content_type: String,
    pub extension: &'static str,
    pub bytes: Vec<u8>,
}

/// Upload service.
#[derive(Clone)]
pub struct UploadService {
    storage: Arc<dyn StorageBackend>,
    default_folder: String,
}

impl UploadService {
    /// Create a new upload service.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>, default_folder: String) -> Self {
        Self {
            storage,
            default_folder,
        }
    }

    /// Store an image and return its public URL.
    pub async fn upload_image(
        &self,
        caller: &Caller,
        input: UploadImageInput,
    ) -> AppResult<UploadedImage> {
        caller.authorize(Operation::UploadImage)?;

        let payload = parse_data_url(&input.data_url)?;
        let folder = input
            .folder
            .map(|f| f.trim().trim_matches('/').to_string())
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| self.default_folder.clone());
        let category = sanitize_category(input.category.as_deref());

        let public_id = storage_key(&folder, &category, Utc::now());
        let key = format!("{public_id}.{}", payload.extension);

        let stored = self
            .storage
            .upload(&key, &payload.bytes, &payload.content_type)
            .await?;

        tracing::info!(
            key = %stored.key,
            size = stored.size,
            uploader_id = %caller.id,
            "Image uploaded"
        );

        Ok(UploadedImage {
            url: stored.url,
            folder,
            public_id,
        })
    }
}

/// Decode a `data:image/*;base64,` URL.
pub fn parse_data_url(data_url: &str) -> AppResult<ImagePayload> {
    let invalid = || AppError::Validation("Invalid image data".to_string());

    if data_url.trim().is_empty() {
        return Err(AppError::Validation("No image data provided".to_string()));
    }

    let rest = data_url.strip_prefix("data:").ok_or_else(invalid)?;
    let (meta, encoded) = rest.split_once(',').ok_or_else(invalid)?;
    let content_type = meta.strip_suffix(";base64").ok_or_else(invalid)?;
    let subtype = content_type.strip_prefix("image/").ok_or_else(invalid)?;

    let extension = match subtype {
        "jpeg" | "jpg" => "jpg",
        "png" => "png",
        "gif" => "gif",
        "webp" => "webp",
        "bmp" => "bmp",
        other => {
            return Err(AppError::Validation(format!(
                "Unsupported image type: {other}"
            )));
        }
    };

    let bytes = STANDARD.decode(encoded.trim()).map_err(|_| invalid())?;
    if bytes.is_empty() {
        return Err(invalid());
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(AppError::Validation("Image too large".to_string()));
    }

    Ok(ImagePayload {
        content_type: content_type.to_string(),
        extension,
        bytes,
    })
}

/// Lowercase, keep `[a-z0-9-]`, join words with `-`.
#[must_use]
pub fn sanitize_category(category: Option<&str>) -> String {
    let cleaned: String = category
        .unwrap_or_default()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-' || c.is_whitespace())
        .collect();
    let joined = cleaned.split_whitespace().collect::<Vec<_>>().join("-");

    if joined.is_empty() {
        "uncategorized".to_string()
    } else {
        joined
    }
}

fn storage_key(folder: &str, category: &str, now: DateTime<Utc>) -> String {
    format!(
        "{folder}/{}/{category}/report_{}",
        now.format("%Y/%m"),
        now.timestamp_millis()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use civic_common::UploadedFile;
    use civic_db::entities::user::UserRole;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingStorage {
        keys: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl StorageBackend for RecordingStorage {
        async fn upload(
            &self,
            key: &str,
            data: &[u8],
            content_type: &str,
        ) -> AppResult<UploadedFile> {
            self.keys.lock().unwrap().push(key.to_string());
            Ok(UploadedFile {
                key: key.to_string(),
                url: self.public_url(key),
                size: data.len() as u64,
                content_type: content_type.to_string(),
            })
        }

        fn public_url(&self, key: &str) -> String {
            format!("http://files.test/{key}")
        }
    }

    const PNG: &str = "data:image/png;base64,iVBORw0KGgo=";

    #[test]
    fn test_parse_data_url() {
        let payload = parse_data_url(PNG).unwrap();
        assert_eq!(payload.content_type, "image/png");
        assert_eq!(payload.extension, "png");
        assert_eq!(&payload.bytes[1..4], b"PNG");

        let jpeg = parse_data_url("data:image/jpeg;base64,/9j/4AAQ").unwrap();
        assert_eq!(jpeg.extension, "jpg");
    }

    #[test]
    fn test_parse_data_url_rejects_garbage() {
        assert!(parse_data_url("").is_err());
        assert!(parse_data_url("iVBORw0KGgo=").is_err());
        assert!(parse_data_url("data:text/plain;base64,aGVsbG8=").is_err());
        assert!(parse_data_url("data:image/png,iVBORw0KGgo=").is_err());
        assert!(parse_data_url("data:image/png;base64,***").is_err());
    }

    #[test]
    fn test_parse_data_url_rejects_svg() {
        // <svg><script>alert(document.cookie)</script></svg>
        let svg = "data:image/svg+xml;base64,PHN2Zz48c2NyaXB0PmFsZXJ0KGRvY3VtZW50LmNvb2tpZSk8L3NjcmlwdD48L3N2Zz4=";
        assert!(matches!(parse_data_url(svg), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_input_reads_data_url_field() {
        let input: UploadImageInput = serde_json::from_str(
            r#"{"dataUrl":"data:image/png;base64,iVBORw0KGgo=","category":"Pothole"}"#,
        )
        .unwrap();
        assert_eq!(input.data_url, PNG);
        assert!(parse_data_url(&input.data_url).is_ok());
    }

    #[test]
    fn test_sanitize_category() {
        assert_eq!(sanitize_category(Some("Street Light")), "street-light");
        assert_eq!(sanitize_category(Some("  Pot#hole!  ")), "pothole");
        assert_eq!(sanitize_category(Some("water-supply")), "water-supply");
        assert_eq!(sanitize_category(Some("###")), "uncategorized");
        assert_eq!(sanitize_category(None), "uncategorized");
    }

    #[test]
    fn test_storage_key_layout() {
        let now = Utc.with_ymd_and_hms(2025, 3, 7, 12, 0, 0).unwrap();
        assert_eq!(
            storage_key("civic-reports", "pothole", now),
            format!("civic-reports/2025/03/pothole/report_{}", now.timestamp_millis())
        );
    }

    #[tokio::test]
    async fn test_upload_uses_default_folder() {
        let storage = Arc::new(RecordingStorage::default());
        let service = UploadService::new(storage.clone(), "civic-reports".to_string());
        let caller = Caller::new("c1".to_string(), UserRole::Citizen);

        let uploaded = service
            .upload_image(
                &caller,
                UploadImageInput {
                    data_url: PNG.to_string(),
                    category: Some("Street Light".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(uploaded.folder, "civic-reports");
        assert!(uploaded.public_id.starts_with("civic-reports/"));
        assert!(uploaded.public_id.contains("/street-light/report_"));
        assert!(uploaded.url.ends_with(".png"));
        assert_eq!(storage.keys.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upload_rejects_bad_payload_without_storing() {
        let storage = Arc::new(RecordingStorage::default());
        let service = UploadService::new(storage.clone(), "civic-reports".to_string());
        let caller = Caller::new("c1".to_string(), UserRole::Ngo);

        let result = service
            .upload_image(
                &caller,
                UploadImageInput {
                    data_url: "not an image".to_string(),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(storage.keys.lock().unwrap().is_empty());
    }
}
