//! Disk staging for incoming uploads
//!
//! Request bodies are streamed into the staging directory chunk by chunk so a
//! large video never sits in memory. A staged file is removed once a provider
//! has durably stored it or the upload is rejected; on an unrecoverable
//! failure it is left in place for manual inspection.

use crate::utils::upload::{file_extension, normalize_mime_type, sanitize_filename};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use streambox_core::constants::DEFAULT_CONTENT_TYPE;
use streambox_core::AppError;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Directory that holds uploads between receipt and placement.
#[derive(Clone, Debug)]
pub struct StagingArea {
    dir: PathBuf,
}

/// A file written to the staging area.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    original_filename: String,
    content_type: String,
    size: u64,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sanitized name the client sent.
    pub fn original_filename(&self) -> &str {
        &self.original_filename
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Unique name of the staged copy; reused as the storage file name.
    pub fn stored_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    /// Delete the staged copy. Missing files are ignored.
    pub async fn discard(self) {
        match fs::remove_file(&self.path).await {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Staged file removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                error = %e,
                path = %self.path.display(),
                "Failed to remove staged file"
            ),
        }
    }
}

impl StagingArea {
    /// Use `dir` as the staging directory, creating it if needed.
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await.map_err(|e| {
            AppError::Internal(format!(
                "Failed to create staging directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `{unix_millis}-{uuid}.{ext}`, unique across concurrent requests.
    fn unique_name(extension: Option<&str>) -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        match extension {
            Some(ext) => format!("{}-{}.{}", millis, Uuid::new_v4().simple(), ext),
            None => format!("{}-{}", millis, Uuid::new_v4().simple()),
        }
    }

    /// Stream a request part into a new staged file.
    ///
    /// Fails with `PayloadTooLarge` as soon as more than `max_bytes` arrive;
    /// the partial file is removed before returning any error.
    pub async fn stage<S, E>(
        &self,
        original_filename: Option<&str>,
        content_type: Option<&str>,
        stream: S,
        max_bytes: usize,
    ) -> Result<StagedFile, AppError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Display,
    {
        let original_filename = sanitize_filename(original_filename.unwrap_or("file"))?;
        let content_type = content_type
            .map(normalize_mime_type)
            .filter(|ct| !ct.is_empty())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
        let extension = file_extension(&original_filename);
        let path = self.dir.join(Self::unique_name(extension.as_deref()));

        match Self::write_stream(&path, stream, max_bytes as u64).await {
            Ok(size) => {
                tracing::debug!(
                    path = %path.display(),
                    original_filename = %original_filename,
                    size_bytes = size,
                    "Upload staged"
                );
                Ok(StagedFile {
                    path,
                    original_filename,
                    content_type,
                    size,
                })
            }
            Err(e) => {
                let _ = fs::remove_file(&path).await;
                Err(e)
            }
        }
    }

    async fn write_stream<S, E>(path: &Path, stream: S, max_bytes: u64) -> Result<u64, AppError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Display,
    {
        let mut stream = std::pin::pin!(stream);
        let mut file = fs::File::create(path).await?;
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk
                .map_err(|e| AppError::BadRequest(format!("Failed to read file data: {}", e)))?;
            written += chunk.len() as u64;
            if written > max_bytes {
                return Err(AppError::PayloadTooLarge(format!(
                    "File size exceeds maximum allowed size of {} MB",
                    max_bytes / 1024 / 1024
                )));
            }
            file.write_all(&chunk).await?;
        }

        file.flush().await?;
        Ok(written)
    }
}
