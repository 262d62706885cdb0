use crate::keys::validate_key;
use crate::traits::{StorageError, StorageProvider, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Local filesystem provider
///
/// Moves staged files into the public static directory. The moved file is the
/// durable copy, so this provider consumes its source.
#[derive(Clone, Debug)]
pub struct LocalProvider {
    base_path: PathBuf,
    mount: String,
}

impl LocalProvider {
    /// Create a new LocalProvider
    ///
    /// # Arguments
    /// * `base_path` - Root of the public static tree (e.g. "uploads")
    /// * `mount` - URL path the tree is served under (e.g. "/uploads")
    pub async fn new(base_path: impl Into<PathBuf>, mount: impl Into<String>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ProviderUnavailable(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalProvider {
            base_path,
            mount: mount.into(),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Convert storage key to filesystem path with security validation
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        validate_key(storage_key)?;

        let path = self.base_path.join(storage_key);

        let base_canonical = self.base_path.canonicalize().map_err(|e| {
            StorageError::ProviderUnavailable(format!("Failed to canonicalize base path: {}", e))
        })?;

        if let Ok(canonical) = path.canonicalize() {
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    /// Public URL for a key, relative to the static mount.
    pub fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.mount.trim_end_matches('/'), key)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Move a file, falling back to copy + remove when rename crosses devices.
    async fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
        match fs::rename(from, to).await {
            Ok(()) => Ok(()),
            Err(rename_err) => {
                tracing::debug!(
                    error = %rename_err,
                    from = %from.display(),
                    "Rename failed, falling back to copy"
                );
                Self::copy_then_remove(from, to).await
            }
        }
    }

    /// Copy then delete the source. On any failure the copy is removed so the
    /// public tree never holds a file without a placement.
    async fn copy_then_remove(from: &Path, to: &Path) -> std::io::Result<()> {
        if let Err(copy_err) = fs::copy(from, to).await {
            let _ = fs::remove_file(to).await;
            return Err(copy_err);
        }
        if let Err(remove_err) = fs::remove_file(from).await {
            if let Err(e) = fs::remove_file(to).await {
                tracing::warn!(error = %e, path = %to.display(), "Failed to remove copied file");
            }
            return Err(remove_err);
        }
        Ok(())
    }
}

#[async_trait]
impl StorageProvider for LocalProvider {
    async fn store(
        &self,
        local_path: &Path,
        key: &str,
        _content_type: &str,
    ) -> StorageResult<String> {
        let path = self.key_to_path(key)?;
        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        if fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::ProviderError(format!(
                "Refusing to overwrite existing file {}",
                path.display()
            )));
        }

        Self::move_file(local_path, &path).await.map_err(|e| {
            StorageError::ProviderError(format!(
                "Failed to move {} to {}: {}",
                local_path.display(),
                path.display(),
                e
            ))
        })?;

        let url = self.url_for(key);

        tracing::info!(
            path = %path.display(),
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage placement successful"
        );

        Ok(url)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }

    fn consumes_source(&self) -> bool {
        true
    }
}
