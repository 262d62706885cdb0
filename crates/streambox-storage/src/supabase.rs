use crate::keys::{encode_key_path, validate_key};
use crate::traits::{StorageError, StorageProvider, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use streambox_core::constants::DEFAULT_CONTENT_TYPE;
use streambox_core::SupabaseSettings;

/// Supabase Storage provider
///
/// Uploads through the Storage REST API with the service-role key. Uploads
/// never overwrite an existing object.
#[derive(Clone, Debug)]
pub struct SupabaseProvider {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
    bucket: String,
}

/// Body returned by `POST /storage/v1/object/{bucket}/{path}`.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(rename = "Key")]
    key: Option<String>,
}

impl SupabaseProvider {
    pub fn new(settings: &SupabaseSettings) -> StorageResult<Self> {
        let missing = settings.missing();
        if !missing.is_empty() {
            return Err(StorageError::ProviderUnavailable(format!(
                "Supabase not configured, missing {}",
                missing.join(", ")
            )));
        }

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| StorageError::ProviderUnavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: settings
                .url
                .as_deref()
                .unwrap_or_default()
                .trim_end_matches('/')
                .to_string(),
            service_key: settings.service_role_key.clone().unwrap_or_default(),
            bucket: settings.bucket.clone(),
        })
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            self.bucket,
            encode_key_path(key)
        )
    }

    /// Resolve the public URL from the object key the provider reported.
    ///
    /// The reported key is `{bucket}/{path}`; anything else is treated as a
    /// contract violation.
    fn public_url_from_reported(&self, reported: Option<&str>) -> Option<String> {
        let reported = reported.map(str::trim).filter(|k| !k.is_empty())?;
        let path = reported.strip_prefix(&format!("{}/", self.bucket))?;
        if path.is_empty() {
            return None;
        }
        Some(format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            self.bucket,
            encode_key_path(path)
        ))
    }

    /// Best-effort removal of an object whose URL could not be resolved.
    async fn remove_object(&self, key: &str) {
        let result = self
            .client
            .delete(self.object_url(key))
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .send()
            .await;
        if let Err(e) = result {
            tracing::warn!(error = %e, key = %key, "Supabase cleanup after failed upload failed");
        }
    }
}

#[async_trait]
impl StorageProvider for SupabaseProvider {
    async fn store(
        &self,
        local_path: &Path,
        key: &str,
        content_type: &str,
    ) -> StorageResult<String> {
        let key = key.trim_start_matches('/');
        validate_key(key)?;
        let content_type = if content_type.trim().is_empty() {
            DEFAULT_CONTENT_TYPE
        } else {
            content_type
        };

        let start = std::time::Instant::now();
        let data = tokio::fs::read(local_path).await.map_err(|e| {
            StorageError::ProviderError(format!(
                "Failed to read {}: {}",
                local_path.display(),
                e
            ))
        })?;
        let size = data.len();

        let response = self
            .client
            .post(self.object_url(key))
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header("Content-Type", content_type)
            .header("x-upsert", "false")
            .body(data)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Supabase upload request failed"
                );
                StorageError::ProviderError(format!("Supabase request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!(
                status = %status,
                bucket = %self.bucket,
                key = %key,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Supabase upload rejected"
            );
            return Err(StorageError::ProviderError(format!(
                "Supabase upload failed with status {}: {}",
                status, body
            )));
        }

        let reported = response
            .json::<UploadResponse>()
            .await
            .ok()
            .and_then(|r| r.key);

        let Some(url) = self.public_url_from_reported(reported.as_deref()) else {
            tracing::error!(
                bucket = %self.bucket,
                key = %key,
                reported_key = ?reported,
                "Supabase accepted the upload but returned no usable object key"
            );
            self.remove_object(key).await;
            return Err(StorageError::ProviderError(
                "Supabase did not return a public URL for the uploaded object".to_string(),
            ));
        };

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Supabase upload successful"
        );

        Ok(url)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Supabase
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn settings(url: &str) -> SupabaseSettings {
        SupabaseSettings {
            url: Some(url.to_string()),
            service_role_key: Some("service-key".to_string()),
            bucket: "videos".to_string(),
        }
    }

    async fn staged_file(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("clip.mp4");
        tokio::fs::write(&path, b"supabase bytes").await.unwrap();
        path
    }

    #[test]
    fn test_new_without_settings_is_unavailable() {
        let err = SupabaseProvider::new(&SupabaseSettings::default()).unwrap_err();
        assert!(matches!(err, StorageError::ProviderUnavailable(_)));
    }

    #[tokio::test]
    async fn test_store_returns_public_url() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/storage/v1/object/videos/videos/clip.mp4")
            .match_header("authorization", "Bearer service-key")
            .match_header("apikey", "service-key")
            .match_header("x-upsert", "false")
            .match_header("content-type", "video/mp4")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"Key":"videos/videos/clip.mp4","Id":"abc"}"#)
            .create_async()
            .await;

        let provider = SupabaseProvider::new(&settings(&server.url())).unwrap();
        let dir = tempdir().unwrap();
        let source = staged_file(dir.path()).await;

        let url = provider
            .store(&source, "/videos/clip.mp4", "video/mp4")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(
            url,
            format!(
                "{}/storage/v1/object/public/videos/videos/clip.mp4",
                server.url()
            )
        );
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_store_without_reported_key_is_provider_error() {
        let mut server = mockito::Server::new_async().await;
        let _upload = server
            .mock("POST", "/storage/v1/object/videos/videos/clip.mp4")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"Id":"abc"}"#)
            .create_async()
            .await;
        let cleanup = server
            .mock("DELETE", "/storage/v1/object/videos/videos/clip.mp4")
            .with_status(200)
            .create_async()
            .await;

        let provider = SupabaseProvider::new(&settings(&server.url())).unwrap();
        let dir = tempdir().unwrap();
        let source = staged_file(dir.path()).await;

        let err = provider
            .store(&source, "videos/clip.mp4", "video/mp4")
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::ProviderError(_)));
        cleanup.assert_async().await;
    }

    #[tokio::test]
    async fn test_store_http_error_is_provider_error() {
        let mut server = mockito::Server::new_async().await;
        let _upload = server
            .mock("POST", "/storage/v1/object/videos/videos/clip.mp4")
            .with_status(409)
            .with_body(r#"{"error":"Duplicate"}"#)
            .create_async()
            .await;

        let provider = SupabaseProvider::new(&settings(&server.url())).unwrap();
        let dir = tempdir().unwrap();
        let source = staged_file(dir.path()).await;

        let err = provider
            .store(&source, "videos/clip.mp4", "video/mp4")
            .await
            .unwrap_err();
        match err {
            StorageError::ProviderError(msg) => assert!(msg.contains("409")),
            other => panic!("expected ProviderError, got {:?}", other),
        }
    }

    #[test]
    fn test_reported_key_outside_bucket_is_rejected() {
        let provider = SupabaseProvider::new(&settings("https://x.supabase.co/")).unwrap();
        assert!(provider
            .public_url_from_reported(Some("other/videos/a.mp4"))
            .is_none());
        assert!(provider.public_url_from_reported(Some("videos/")).is_none());
        assert_eq!(
            provider
                .public_url_from_reported(Some("videos/thumbnails/a.jpg"))
                .unwrap(),
            "https://x.supabase.co/storage/v1/object/public/videos/thumbnails/a.jpg"
        );
    }
}
