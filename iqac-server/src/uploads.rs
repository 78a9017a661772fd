//! Uploaded file storage
//!
//! Files land in `<root>/uploads/<category>/<uuid>.<ext>`. The database
//! keeps the path relative to the root folder (`uploads/...`), and stored
//! paths are only ever resolved back inside the uploads directory.

use axum::extract::multipart::Field;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};

/// Accepted file extensions (lowercase)
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "csv", "txt", "jpg", "jpeg", "png",
];

/// Longest original file name kept in the database
const MAX_ORIGINAL_NAME_LEN: usize = 200;

/// Metadata of a file written to the uploads directory
#[derive(Debug, Clone, Serialize)]
pub struct StoredFile {
    /// Path relative to the root folder, e.g. `uploads/documents/<uuid>.pdf`
    pub relative_path: String,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub sha256: String,
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
    max_bytes: usize,
}

impl UploadStore {
    /// `root` is the root folder; files go to its `uploads/` subdirectory
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    /// Read one multipart file field into memory, enforcing the size limit
    ///
    /// Returns the client-supplied file name and the content.
    pub async fn read_field(&self, mut field: Field<'_>) -> ApiResult<(String, Vec<u8>)> {
        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("File field has no file name".to_string()))?;

        let mut content = Vec::new();
        while let Some(chunk) = field.chunk().await? {
            if content.len() + chunk.len() > self.max_bytes {
                return Err(ApiError::PayloadTooLarge(format!(
                    "File exceeds the {} byte limit",
                    self.max_bytes
                )));
            }
            content.extend_from_slice(&chunk);
        }
        Ok((file_name, content))
    }

    /// Validate and write a file under `uploads/<category>/`
    pub async fn save(
        &self,
        category: &str,
        original_name: &str,
        content: &[u8],
    ) -> ApiResult<StoredFile> {
        let original_name = sanitize_file_name(original_name);
        let extension = allowed_extension(&original_name)?;
        if content.is_empty() {
            return Err(ApiError::Validation("Uploaded file is empty".to_string()));
        }
        if content.len() > self.max_bytes {
            return Err(ApiError::PayloadTooLarge(format!(
                "File exceeds the {} byte limit",
                self.max_bytes
            )));
        }

        let relative_path = format!(
            "{}/{}/{}.{}",
            iqac_common::config::UPLOADS_DIR,
            category,
            iqac_common::uuid_utils::generate(),
            extension
        );
        let full_path = self.root.join(&relative_path);
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full_path, content).await?;
        debug!("Stored upload {} as {}", original_name, relative_path);

        Ok(StoredFile {
            relative_path,
            mime_type: mime_type_for(&extension).to_string(),
            size_bytes: content.len() as i64,
            sha256: format!("{:x}", Sha256::digest(content)),
            original_name,
        })
    }

    /// Map a stored relative path back to an absolute path
    ///
    /// Rejects anything outside the uploads directory.
    pub fn resolve(&self, stored: &str) -> ApiResult<PathBuf> {
        let path = Path::new(stored);
        let inside_uploads = path.starts_with(iqac_common::config::UPLOADS_DIR)
            && path.components().all(|c| matches!(c, Component::Normal(_)));
        if !inside_uploads {
            return Err(ApiError::forbidden("Invalid stored file path"));
        }
        Ok(self.root.join(path))
    }

    pub async fn read(&self, stored: &str) -> ApiResult<Vec<u8>> {
        let path = self.resolve(stored)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ApiError::not_found("Stored file"))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a stored file; failures are logged, not returned
    pub async fn remove(&self, stored: &str) {
        let path = match self.resolve(stored) {
            Ok(path) => path,
            Err(_) => {
                warn!("Refusing to delete path outside uploads: {}", stored);
                return;
            }
        };
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!("Failed to delete upload {}: {}", path.display(), e);
        }
    }
}

/// Keep only the final path component of a client-supplied name
fn sanitize_file_name(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    base.chars()
        .filter(|c| !c.is_control() && *c != '"')
        .take(MAX_ORIGINAL_NAME_LEN)
        .collect()
}

/// Lowercased extension of an accepted file name
pub fn allowed_extension(file_name: &str) -> ApiResult<String> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(extension)
    } else {
        Err(ApiError::Validation(format!(
            "File type not allowed: '{}'. Allowed: {}",
            file_name,
            ALLOWED_EXTENSIONS.join(", ")
        )))
    }
}

fn mime_type_for(extension: &str) -> &'static str {
    match extension {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "csv" => "text/csv",
        "txt" => "text/plain",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_allowed_extensions() {
        assert_eq!(allowed_extension("paper.PDF").unwrap(), "pdf");
        assert_eq!(allowed_extension("marks.xlsx").unwrap(), "xlsx");
        assert!(allowed_extension("virus.exe").is_err());
        assert!(allowed_extension("no_extension").is_err());
        assert!(allowed_extension("archive.tar.gz").is_err());
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\cv.pdf"), "cv.pdf");
        assert_eq!(sanitize_file_name("a\"b.pdf"), "ab.pdf");
    }

    #[tokio::test]
    async fn test_save_and_read_back() {
        let dir = TempDir::new().unwrap();
        let store = UploadStore::new(dir.path(), 1024);

        let stored = store.save("documents", "syllabus.pdf", b"%PDF-1.4 test").await.unwrap();
        assert!(stored.relative_path.starts_with("uploads/documents/"));
        assert!(stored.relative_path.ends_with(".pdf"));
        assert_eq!(stored.mime_type, "application/pdf");
        assert_eq!(stored.size_bytes, 13);
        assert_eq!(stored.sha256.len(), 64);
        assert_eq!(stored.original_name, "syllabus.pdf");

        let bytes = store.read(&stored.relative_path).await.unwrap();
        assert_eq!(bytes, b"%PDF-1.4 test");

        store.remove(&stored.relative_path).await;
        assert!(store.read(&stored.relative_path).await.is_err());
    }

    #[tokio::test]
    async fn test_save_rejects_empty_and_oversized() {
        let dir = TempDir::new().unwrap();
        let store = UploadStore::new(dir.path(), 4);

        let empty = store.save("documents", "a.txt", b"").await.unwrap_err();
        assert!(matches!(empty, ApiError::Validation(_)));

        let big = store.save("documents", "a.txt", b"12345").await.unwrap_err();
        assert!(matches!(big, ApiError::PayloadTooLarge(_)));
    }

    #[test]
    fn test_resolve_stays_inside_uploads() {
        let store = UploadStore::new("/srv/iqac", 1024);
        assert_eq!(
            store.resolve("uploads/documents/x.pdf").unwrap(),
            PathBuf::from("/srv/iqac/uploads/documents/x.pdf")
        );
        assert!(store.resolve("uploads/../iqac.db").is_err());
        assert!(store.resolve("/etc/passwd").is_err());
        assert!(store.resolve("iqac.db").is_err());
    }
}
