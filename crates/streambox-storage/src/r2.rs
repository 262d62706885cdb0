use crate::keys::{encode_key_path, validate_key};
use crate::traits::{StorageError, StorageProvider, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use object_store::aws::AmazonS3Builder;
use object_store::buffered::BufWriter;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, AttributeValue, Attributes, ObjectStore};
use std::path::Path;
use std::sync::Arc;
use streambox_core::constants::DEFAULT_CONTENT_TYPE;
use streambox_core::R2Settings;
use tokio::io::AsyncWriteExt;

/// Cloudflare R2 provider (S3-compatible)
///
/// Streams the staged file with a buffered multipart writer so large videos
/// are never held in memory. A failed multipart upload is aborted so no
/// partial object is left behind.
#[derive(Clone)]
pub struct R2Provider {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    account_id: String,
}

impl std::fmt::Debug for R2Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("R2Provider")
            .field("bucket", &self.bucket)
            .field("account_id", &self.account_id)
            .finish()
    }
}

impl R2Provider {
    /// Build the provider from explicit settings.
    ///
    /// Returns `ProviderUnavailable` naming every missing variable; no network
    /// call is made here.
    pub fn new(settings: &R2Settings) -> StorageResult<Self> {
        let missing = settings.missing();
        if !missing.is_empty() {
            return Err(StorageError::ProviderUnavailable(format!(
                "R2 not configured, missing {}",
                missing.join(", ")
            )));
        }

        // missing() is empty, so every required field is present
        let access_key_id = settings.access_key_id.clone().unwrap_or_default();
        let secret_access_key = settings.secret_access_key.clone().unwrap_or_default();
        let account_id = settings.account_id.clone().unwrap_or_default();
        let bucket = settings.bucket_name.clone().unwrap_or_default();

        let endpoint = settings
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://{}.r2.cloudflarestorage.com", account_id));

        let store = AmazonS3Builder::new()
            .with_access_key_id(access_key_id)
            .with_secret_access_key(secret_access_key)
            .with_region("auto")
            .with_bucket_name(bucket.clone())
            .with_allow_http(endpoint.starts_with("http://"))
            .with_endpoint(endpoint)
            .build()
            .map_err(|e| StorageError::ProviderUnavailable(e.to_string()))?;

        Ok(Self {
            store: Arc::new(store),
            bucket,
            account_id,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_store(store: Arc<dyn ObjectStore>, bucket: &str, account_id: &str) -> Self {
        Self {
            store,
            bucket: bucket.to_string(),
            account_id: account_id.to_string(),
        }
    }

    /// Deterministic public URL derived from bucket, account and key.
    pub fn public_url(&self, key: &str) -> String {
        format!(
            "https://{}.{}.r2.cloudflarestorage.com/{}",
            self.bucket,
            self.account_id,
            encode_key_path(key)
        )
    }

    async fn write_object(
        &self,
        local_path: &Path,
        location: &ObjectPath,
        content_type: &str,
    ) -> Result<u64, String> {
        let mut file = tokio::fs::File::open(local_path)
            .await
            .map_err(|e| format!("Failed to open {}: {}", local_path.display(), e))?;

        let mut attributes = Attributes::new();
        attributes.insert(
            Attribute::ContentType,
            AttributeValue::from(content_type.to_string()),
        );

        let mut writer =
            BufWriter::new(self.store.clone(), location.clone()).with_attributes(attributes);

        let written = match tokio::io::copy(&mut file, &mut writer).await {
            Ok(n) => n,
            Err(e) => {
                if let Err(abort_err) = writer.abort().await {
                    tracing::warn!(error = %abort_err, key = %location, "R2 abort after failed write failed");
                }
                return Err(e.to_string());
            }
        };

        if let Err(e) = writer.shutdown().await {
            if let Err(abort_err) = writer.abort().await {
                tracing::warn!(error = %abort_err, key = %location, "R2 abort after failed commit failed");
            }
            return Err(e.to_string());
        }

        Ok(written)
    }
}

#[async_trait]
impl StorageProvider for R2Provider {
    async fn store(
        &self,
        local_path: &Path,
        key: &str,
        content_type: &str,
    ) -> StorageResult<String> {
        validate_key(key)?;
        let content_type = if content_type.trim().is_empty() {
            DEFAULT_CONTENT_TYPE
        } else {
            content_type
        };
        let location = ObjectPath::from(key);
        let start = std::time::Instant::now();

        let size = self
            .write_object(local_path, &location, content_type)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "R2 upload failed"
                );
                StorageError::ProviderError(e)
            })?;

        let url = self.public_url(key);

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "R2 upload successful"
        );

        Ok(url)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::R2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;
    use object_store::ObjectStoreExt;
    use tempfile::tempdir;

    fn complete_settings() -> R2Settings {
        R2Settings {
            access_key_id: Some("key".into()),
            secret_access_key: Some("secret".into()),
            account_id: Some("acct123".into()),
            bucket_name: Some("media".into()),
            endpoint: None,
        }
    }

    #[test]
    fn test_new_without_credentials_is_unavailable() {
        let err = R2Provider::new(&R2Settings::default()).unwrap_err();
        match err {
            StorageError::ProviderUnavailable(msg) => {
                assert!(msg.contains("R2_ACCESS_KEY_ID"));
                assert!(msg.contains("R2_BUCKET_NAME"));
            }
            other => panic!("expected ProviderUnavailable, got {:?}", other),
        }
    }

    #[test]
    fn test_new_with_partial_credentials_is_unavailable() {
        let mut settings = complete_settings();
        settings.secret_access_key = None;
        assert!(matches!(
            R2Provider::new(&settings),
            Err(StorageError::ProviderUnavailable(_))
        ));
    }

    #[test]
    fn test_public_url_is_deterministic() {
        let provider = R2Provider::new(&complete_settings()).unwrap();
        let url = provider.public_url("videos/my clip.mp4");
        assert_eq!(
            url,
            "https://media.acct123.r2.cloudflarestorage.com/videos/my%20clip.mp4"
        );
        assert_eq!(url, provider.public_url("videos/my clip.mp4"));
        assert_eq!(provider.backend_type(), StorageBackend::R2);
        assert!(!provider.consumes_source());
    }

    #[tokio::test]
    async fn test_store_streams_file_and_keeps_source() {
        let memory = Arc::new(InMemory::new());
        let provider = R2Provider::with_store(memory.clone(), "media", "acct123");
        let dir = tempdir().unwrap();
        let source = dir.path().join("clip.mp4");
        tokio::fs::write(&source, b"remote bytes").await.unwrap();

        let url = provider
            .store(&source, "videos/clip.mp4", "video/mp4")
            .await
            .unwrap();

        assert_eq!(
            url,
            "https://media.acct123.r2.cloudflarestorage.com/videos/clip.mp4"
        );
        let stored = memory
            .get(&ObjectPath::from("videos/clip.mp4"))
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap();
        assert_eq!(stored.as_ref(), b"remote bytes");
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_store_missing_source_is_provider_error() {
        let provider = R2Provider::with_store(Arc::new(InMemory::new()), "media", "acct123");
        let err = provider
            .store(Path::new("/nonexistent/clip.mp4"), "videos/clip.mp4", "video/mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::ProviderError(_)));
    }
}
