//! Single-item ingestion
//!
//! Validates a staged video (and optional thumbnail), places each file through
//! its own provider chain and records the asset. The video is mandatory: if
//! no provider accepts it the whole upload fails. The thumbnail is optional:
//! any problem with it downgrades the asset to having no thumbnail.

use super::staging::StagedFile;
use crate::error::storage_error_to_app;
use crate::utils::upload::{validate_content_type, validate_file_extension, validate_file_size};
use std::sync::Arc;
use streambox_core::models::{MediaAsset, NewMediaAsset, UploadMetadata};
use streambox_core::{AppError, AssetCategory, Config};
use streambox_db::MediaAssetStore;
use streambox_storage::{generate_storage_key, Placement, ProviderChain, StorageProviders};
use uuid::Uuid;
use validator::Validate;

/// One upload as received from the client.
#[derive(Debug)]
pub struct IngestRequest {
    pub video: StagedFile,
    pub thumbnail: Option<StagedFile>,
    pub metadata: UploadMetadata,
    pub owner_id: Uuid,
}

#[derive(Clone)]
pub struct IngestService {
    config: Config,
    providers: StorageProviders,
    assets: Arc<dyn MediaAssetStore>,
}

impl IngestService {
    pub fn new(
        config: Config,
        providers: StorageProviders,
        assets: Arc<dyn MediaAssetStore>,
    ) -> Self {
        Self {
            config,
            providers,
            assets,
        }
    }

    /// Ingest one video.
    ///
    /// Validation failures remove the staged files and touch no provider.
    /// `StorageExhausted` means every provider refused the video; the staged
    /// files are removed and no record exists.
    #[tracing::instrument(skip_all, fields(owner_id = %request.owner_id, filename = %request.video.original_filename()))]
    pub async fn ingest(&self, request: IngestRequest) -> Result<MediaAsset, AppError> {
        let IngestRequest {
            video,
            thumbnail,
            metadata,
            owner_id,
        } = request;
        let metadata = metadata.normalized();

        if let Err(e) = self.validate_video(&metadata, &video) {
            video.discard().await;
            if let Some(thumbnail) = thumbnail {
                thumbnail.discard().await;
            }
            return Err(e);
        }

        let thumbnail = match thumbnail {
            Some(t) => match self.validate_thumbnail(&t) {
                Ok(()) => Some(t),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        filename = %t.original_filename(),
                        "Thumbnail rejected, continuing without it"
                    );
                    t.discard().await;
                    None
                }
            },
            None => None,
        };

        let video_placement = match self.place(&video, AssetCategory::Video).await {
            Ok(placement) => placement,
            Err(e) => {
                video.discard().await;
                if let Some(thumbnail) = thumbnail {
                    thumbnail.discard().await;
                }
                return Err(e);
            }
        };

        let thumbnail = match thumbnail {
            Some(t) => match self.place(&t, AssetCategory::Thumbnail).await {
                Ok(placement) => Some((t, placement)),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        filename = %t.original_filename(),
                        "Thumbnail could not be stored, continuing without it"
                    );
                    t.discard().await;
                    None
                }
            },
            None => None,
        };

        let new_asset = NewMediaAsset {
            title: metadata.title,
            description: metadata.description,
            genre: metadata.genre,
            primary_url: video_placement.url.clone(),
            thumbnail_url: thumbnail.as_ref().map(|(_, p)| p.url.clone()),
            owner_id,
            backend: video_placement.backend,
        };

        match self.assets.create(new_asset).await {
            Ok(asset) => {
                release(video, &video_placement).await;
                if let Some((t, placement)) = thumbnail {
                    release(t, &placement).await;
                }
                tracing::info!(
                    asset_id = %asset.id,
                    backend = %asset.backend,
                    has_thumbnail = asset.thumbnail_url.is_some(),
                    "Media asset created"
                );
                Ok(asset)
            }
            Err(e) => {
                // Placed objects and any remaining staged copies are kept so
                // the upload can be recovered by hand.
                tracing::error!(
                    error = %e,
                    staged_path = %video.path().display(),
                    video_url = %video_placement.url,
                    video_backend = %video_placement.backend,
                    thumbnail_url = ?thumbnail.as_ref().map(|(_, p)| p.url.as_str()),
                    "Media record could not be saved after placement"
                );
                Err(e)
            }
        }
    }

    fn validate_video(&self, metadata: &UploadMetadata, video: &StagedFile) -> Result<(), AppError> {
        metadata.validate()?;
        validate_file_size(video.size(), self.config.max_video_size_bytes())?;
        validate_content_type(video.content_type(), self.config.video_allowed_content_types())?;
        validate_file_extension(
            video.original_filename(),
            self.config.video_allowed_extensions(),
        )?;
        Ok(())
    }

    fn validate_thumbnail(&self, thumbnail: &StagedFile) -> Result<(), AppError> {
        validate_file_size(thumbnail.size(), self.config.max_thumbnail_size_bytes())?;
        validate_content_type(
            thumbnail.content_type(),
            self.config.thumbnail_allowed_content_types(),
        )?;
        validate_file_extension(
            thumbnail.original_filename(),
            self.config.thumbnail_allowed_extensions(),
        )?;
        Ok(())
    }

    /// Resolve a fresh chain and place one staged file.
    async fn place(&self, file: &StagedFile, category: AssetCategory) -> Result<Placement, AppError> {
        let chain = ProviderChain::resolve(&self.providers);
        let key = generate_storage_key(category, file.stored_name());
        chain
            .place(file.path(), &key, file.content_type())
            .await
            .map_err(storage_error_to_app)
    }
}

/// Drop the staged copy unless the committing provider took ownership of it.
async fn release(file: StagedFile, placement: &Placement) {
    if !placement.consumed_source {
        file.discard().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::upload::StagingArea;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use streambox_core::{IngestConfig, StorageBackend};
    use streambox_db::InMemoryMediaAssetStore;
    use streambox_storage::{LocalProvider, StorageError, StorageProvider, StorageResult};
    use tempfile::TempDir;

    struct ScriptedProvider {
        backend: StorageBackend,
        fail: bool,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(backend: StorageBackend, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                backend,
                fail,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StorageProvider for ScriptedProvider {
        async fn store(&self, _path: &Path, key: &str, _ct: &str) -> StorageResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(StorageError::ProviderError(format!("{} down", self.backend)))
            } else {
                Ok(format!("https://{}.example/{}", self.backend, key))
            }
        }

        fn backend_type(&self) -> StorageBackend {
            self.backend
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl MediaAssetStore for BrokenStore {
        async fn create(&self, _asset: NewMediaAsset) -> Result<MediaAsset, AppError> {
            Err(AppError::Internal("database unavailable".to_string()))
        }

        async fn get(&self, _id: Uuid) -> Result<Option<MediaAsset>, AppError> {
            Ok(None)
        }

        async fn list_recent(&self, _limit: i64) -> Result<Vec<MediaAsset>, AppError> {
            Ok(Vec::new())
        }
    }

    struct Fixture {
        _dir: TempDir,
        public: PathBuf,
        staging: StagingArea,
        config: Config,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let public = dir.path().join("public");
        let mut vars = HashMap::new();
        vars.insert("JWT_SECRET", "0123456789abcdef0123456789abcdef".to_string());
        vars.insert("MAX_THUMBNAIL_SIZE_MB", "1".to_string());
        let config = Config(Box::new(
            IngestConfig::from_lookup(|k| vars.get(k).cloned()).unwrap(),
        ));
        let staging = StagingArea::new(dir.path().join("staging")).await.unwrap();
        Fixture {
            _dir: dir,
            public,
            staging,
            config,
        }
    }

    async fn staged(staging: &StagingArea, name: &str, ct: &str, data: &'static [u8]) -> StagedFile {
        let body = futures::stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from_static(data))]);
        staging
            .stage(Some(name), Some(ct), body, 64 * 1024 * 1024)
            .await
            .unwrap()
    }

    async fn local(f: &Fixture) -> Arc<LocalProvider> {
        Arc::new(LocalProvider::new(&f.public, "/uploads").await.unwrap())
    }

    fn request(video: StagedFile, thumbnail: Option<StagedFile>, title: &str) -> IngestRequest {
        IngestRequest {
            video,
            thumbnail,
            metadata: UploadMetadata::new(title, None, None),
            owner_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn test_primary_success_records_asset_and_clears_staging() {
        let f = fixture().await;
        let r2 = ScriptedProvider::new(StorageBackend::R2, false);
        let supabase = ScriptedProvider::new(StorageBackend::Supabase, false);
        let providers = StorageProviders::new(local(&f).await)
            .with_primary(r2.clone())
            .with_secondary(supabase.clone());
        let store = Arc::new(InMemoryMediaAssetStore::new());
        let service = IngestService::new(f.config.clone(), providers, store.clone());

        let video = staged(&f.staging, "clip.mp4", "video/mp4", b"video").await;
        let thumb = staged(&f.staging, "cover.jpg", "image/jpeg", b"jpeg").await;
        let (video_path, thumb_path) = (video.path().to_path_buf(), thumb.path().to_path_buf());

        let asset = service
            .ingest(request(video, Some(thumb), "  Clip "))
            .await
            .unwrap();

        assert_eq!(asset.title, "Clip");
        assert_eq!(asset.genre, "Autre");
        assert_eq!(asset.backend, StorageBackend::R2);
        assert!(asset.primary_url.starts_with("https://r2.example/videos/"));
        assert!(asset
            .thumbnail_url
            .as_deref()
            .unwrap()
            .starts_with("https://r2.example/thumbnails/"));
        assert_eq!(r2.calls(), 2);
        assert_eq!(supabase.calls(), 0);
        assert!(!video_path.exists());
        assert!(!thumb_path.exists());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_remote_failures_fall_back_to_local() {
        let f = fixture().await;
        let providers = StorageProviders::new(local(&f).await)
            .with_primary(ScriptedProvider::new(StorageBackend::R2, true))
            .with_secondary(ScriptedProvider::new(StorageBackend::Supabase, true));
        let service = IngestService::new(
            f.config.clone(),
            providers,
            Arc::new(InMemoryMediaAssetStore::new()),
        );

        let video = staged(&f.staging, "clip.mp4", "video/mp4", b"video").await;
        let stored_name = video.stored_name().to_string();

        let asset = service.ingest(request(video, None, "Clip")).await.unwrap();

        assert_eq!(asset.backend, StorageBackend::Local);
        assert_eq!(asset.primary_url, format!("/uploads/videos/{}", stored_name));
        assert!(f.public.join("videos").join(&stored_name).exists());
        assert!(asset.thumbnail_url.is_none());
    }

    #[tokio::test]
    async fn test_exhaustion_fails_and_removes_staged_files() {
        let f = fixture().await;
        let store = Arc::new(InMemoryMediaAssetStore::new());
        let providers =
            StorageProviders::new(ScriptedProvider::new(StorageBackend::Local, true))
                .with_primary(ScriptedProvider::new(StorageBackend::R2, true));
        let service = IngestService::new(f.config.clone(), providers, store.clone());

        let video = staged(&f.staging, "clip.mp4", "video/mp4", b"video").await;
        let thumb = staged(&f.staging, "cover.png", "image/png", b"png").await;
        let (video_path, thumb_path) = (video.path().to_path_buf(), thumb.path().to_path_buf());

        let err = service
            .ingest(request(video, Some(thumb), "Clip"))
            .await
            .unwrap_err();

        match err {
            AppError::StorageExhausted { attempted, .. } => assert_eq!(attempted, 2),
            other => panic!("expected StorageExhausted, got {:?}", other),
        }
        assert!(!video_path.exists());
        assert!(!thumb_path.exists());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_validation_failure_touches_no_provider() {
        let f = fixture().await;
        let r2 = ScriptedProvider::new(StorageBackend::R2, false);
        let providers = StorageProviders::new(local(&f).await).with_primary(r2.clone());
        let service = IngestService::new(
            f.config.clone(),
            providers,
            Arc::new(InMemoryMediaAssetStore::new()),
        );

        let video = staged(&f.staging, "clip.mp4", "video/mp4", b"video").await;
        let path = video.path().to_path_buf();
        let err = service.ingest(request(video, None, "   ")).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(!path.exists());

        let wrong_type = staged(&f.staging, "notes.txt", "text/plain", b"hello").await;
        let err = service
            .ingest(request(wrong_type, None, "Notes"))
            .await
            .unwrap_err();
        assert!(err.is_validation());

        assert_eq!(r2.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_thumbnail_is_dropped() {
        let f = fixture().await;
        let providers = StorageProviders::new(local(&f).await);
        let service = IngestService::new(
            f.config.clone(),
            providers,
            Arc::new(InMemoryMediaAssetStore::new()),
        );

        let video = staged(&f.staging, "clip.mp4", "video/mp4", b"video").await;
        let thumb = staged(&f.staging, "cover.gif", "image/gif", b"gif").await;
        let thumb_path = thumb.path().to_path_buf();

        let asset = service
            .ingest(request(video, Some(thumb), "Clip"))
            .await
            .unwrap();
        assert!(asset.thumbnail_url.is_none());
        assert!(!thumb_path.exists());
    }

    #[tokio::test]
    async fn test_thumbnail_placement_failure_keeps_video() {
        let f = fixture().await;
        // Video goes to the primary, then both the primary and local refuse
        // the thumbnail.
        struct VideoOnly;
        #[async_trait]
        impl StorageProvider for VideoOnly {
            async fn store(&self, _p: &Path, key: &str, _ct: &str) -> StorageResult<String> {
                if key.starts_with("videos/") {
                    Ok(format!("https://r2.example/{}", key))
                } else {
                    Err(StorageError::ProviderError("thumbnail refused".to_string()))
                }
            }
            fn backend_type(&self) -> StorageBackend {
                StorageBackend::R2
            }
        }
        let providers =
            StorageProviders::new(ScriptedProvider::new(StorageBackend::Local, true))
                .with_primary(Arc::new(VideoOnly));
        let service = IngestService::new(
            f.config.clone(),
            providers,
            Arc::new(InMemoryMediaAssetStore::new()),
        );

        let video = staged(&f.staging, "clip.mp4", "video/mp4", b"video").await;
        let thumb = staged(&f.staging, "cover.jpg", "image/jpeg", b"jpeg").await;

        let asset = service
            .ingest(request(video, Some(thumb), "Clip"))
            .await
            .unwrap();
        assert_eq!(asset.backend, StorageBackend::R2);
        assert!(asset.thumbnail_url.is_none());
    }

    #[tokio::test]
    async fn test_record_failure_keeps_staged_copy() {
        let f = fixture().await;
        let providers = StorageProviders::new(local(&f).await)
            .with_primary(ScriptedProvider::new(StorageBackend::R2, false));
        let service = IngestService::new(f.config.clone(), providers, Arc::new(BrokenStore));

        let video = staged(&f.staging, "clip.mp4", "video/mp4", b"video").await;
        let path = video.path().to_path_buf();

        let err = service.ingest(request(video, None, "Clip")).await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
        assert!(path.exists());
    }
}
