use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::clock::Clock;
use super::domain::{ApplicationId, StorageHandle};

const MAX_FILENAME_CHARS: usize = 100;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unknown storage handle {0}")]
    UnknownHandle(String),
    #[error("storage rejected {0}")]
    Rejected(String),
}

/// Persists raw uploads and hands back a stable handle.
#[async_trait]
pub trait DocumentStorage: Send + Sync {
    async fn store(
        &self,
        content: &[u8],
        application_id: &ApplicationId,
        filename: &str,
    ) -> Result<StorageHandle, StorageError>;

    /// Content hash of whatever the handle points at.
    async fn hash(&self, handle: &StorageHandle) -> Result<String, StorageError>;
}

/// SHA-256 digest, base64 encoded.
pub fn content_hash(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(Sha256::digest(bytes))
}

/// Replaces path separators, reserved and control characters, collapses runs
/// of underscores/whitespace, and caps the length while keeping the extension.
pub fn clean_filename(filename: &str) -> String {
    let mut cleaned = String::with_capacity(filename.len());
    let mut previous_separator = false;
    for ch in filename.chars() {
        let separator = ch.is_whitespace()
            || ch.is_control()
            || matches!(ch, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' | '_');
        if separator {
            if !previous_separator {
                cleaned.push('_');
            }
        } else {
            cleaned.push(ch);
        }
        previous_separator = separator;
    }

    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() || cleaned == "_" {
        return "document".to_string();
    }
    if cleaned.chars().count() <= MAX_FILENAME_CHARS {
        return cleaned;
    }

    let (stem, extension) = match cleaned.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => (stem, format!(".{extension}")),
        _ => (cleaned.as_str(), String::new()),
    };
    let keep = MAX_FILENAME_CHARS.saturating_sub(extension.chars().count());
    let stem: String = stem.chars().take(keep).collect();
    format!("{stem}{extension}")
}

/// Stores files under `<root>/<application_id>/<YYYYmmdd_HHMMSS>_<filename>`.
pub struct LocalFileStorage {
    root: PathBuf,
    clock: Arc<dyn Clock>,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            root: root.into(),
            clock,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Claims the first free name with `create_new`, so concurrent uploads of
    /// the same file in the same second never share a path.
    async fn create_unique(
        &self,
        directory: &Path,
        filename: &str,
    ) -> Result<(PathBuf, File), StorageError> {
        let (stem, extension) = match filename.rsplit_once('.') {
            Some((stem, extension)) => (stem, format!(".{extension}")),
            None => (filename, String::new()),
        };

        let mut counter = 0usize;
        loop {
            let candidate = if counter == 0 {
                directory.join(filename)
            } else {
                directory.join(format!("{stem}_{counter}{extension}"))
            };
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&candidate)
                .await
            {
                Ok(file) => return Ok((candidate, file)),
                Err(err) if err.kind() == ErrorKind::AlreadyExists => counter += 1,
                Err(err) => return Err(io_error(&candidate)(err)),
            }
        }
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl DocumentStorage for LocalFileStorage {
    async fn store(
        &self,
        content: &[u8],
        application_id: &ApplicationId,
        filename: &str,
    ) -> Result<StorageHandle, StorageError> {
        let directory = self.root.join(clean_filename(application_id.as_str()));
        tokio::fs::create_dir_all(&directory)
            .await
            .map_err(io_error(&directory))?;

        let stamp = self.clock.now().format("%Y%m%d_%H%M%S");
        let (path, mut file) = self
            .create_unique(&directory, &format!("{stamp}_{}", clean_filename(filename)))
            .await?;
        file.write_all(content).await.map_err(io_error(&path))?;
        file.flush().await.map_err(io_error(&path))?;

        tracing::info!(path = %path.display(), bytes = content.len(), "stored document");
        Ok(StorageHandle(path.to_string_lossy().into_owned()))
    }

    async fn hash(&self, handle: &StorageHandle) -> Result<String, StorageError> {
        let path = PathBuf::from(&handle.0);
        let bytes = tokio::fs::read(&path).await.map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                StorageError::UnknownHandle(handle.0.clone())
            } else {
                StorageError::Io {
                    path: path.clone(),
                    source,
                }
            }
        })?;
        Ok(content_hash(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::intake::clock::FixedClock;
    use chrono::{TimeZone, Utc};

    fn storage(root: &Path) -> LocalFileStorage {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 5).unwrap());
        LocalFileStorage::new(root, Arc::new(clock))
    }

    #[test]
    fn cleans_reserved_characters_and_runs() {
        assert_eq!(clean_filename("my  pay/slip?.pdf"), "my_pay_slip_.pdf");
        assert_eq!(clean_filename("..\\..\\etc"), "_.._etc");
        assert_eq!(clean_filename("   "), "document");

        let long = format!("{}.pdf", "a".repeat(150));
        let cleaned = clean_filename(&long);
        assert_eq!(cleaned.len(), MAX_FILENAME_CHARS);
        assert!(cleaned.ends_with(".pdf"));
    }

    #[test]
    fn hash_is_stable_base64_sha256() {
        assert_eq!(
            content_hash(b"abc"),
            "ungWv48Bz+pBQUDeXa4iI7ADYaOWF3qctBD/YfIAFa0="
        );
    }

    #[tokio::test]
    async fn stores_under_application_directory_with_timestamp() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = storage(dir.path());
        let application = ApplicationId("APP-0601-ABCDEF12".to_string());

        let handle = storage
            .store(b"payslip bytes", &application, "May Payslip.pdf")
            .await
            .expect("stored");

        let expected = dir
            .path()
            .join("APP-0601-ABCDEF12")
            .join("20250601_093005_May_Payslip.pdf");
        assert_eq!(PathBuf::from(&handle.0), expected);
        assert_eq!(
            storage.hash(&handle).await.expect("hash"),
            content_hash(b"payslip bytes")
        );
    }

    #[tokio::test]
    async fn same_second_uploads_do_not_overwrite() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = storage(dir.path());
        let application = ApplicationId("APP-1".to_string());

        let first = storage.store(b"one", &application, "id.png").await.expect("first");
        let second = storage.store(b"two", &application, "id.png").await.expect("second");

        assert_ne!(first, second);
        assert_eq!(storage.hash(&first).await.expect("hash"), content_hash(b"one"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_same_name_uploads_each_get_their_own_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = Arc::new(storage(dir.path()));
        let application = ApplicationId("APP-RACE".to_string());

        let uploads: Vec<_> = (0..8)
            .map(|index| {
                let storage = storage.clone();
                let application = application.clone();
                tokio::spawn(async move {
                    let content = format!("scan {index}").into_bytes();
                    let handle = storage
                        .store(&content, &application, "id.png")
                        .await
                        .expect("stored");
                    (handle, content)
                })
            })
            .collect();

        let mut handles = Vec::new();
        for upload in uploads {
            let (handle, content) = upload.await.expect("upload task joins");
            assert_eq!(storage.hash(&handle).await.expect("hash"), content_hash(&content));
            handles.push(handle.0);
        }
        handles.sort();
        handles.dedup();
        assert_eq!(handles.len(), 8);
    }

    #[tokio::test]
    async fn missing_handle_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = storage(dir.path());
        let handle = StorageHandle(dir.path().join("nope.pdf").to_string_lossy().into_owned());

        match storage.hash(&handle).await {
            Err(StorageError::UnknownHandle(_)) => {}
            other => panic!("expected unknown handle, got {other:?}"),
        }
    }
}
