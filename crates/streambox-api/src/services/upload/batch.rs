//! Batch orchestration
//!
//! A batch is a list of independent single-item ingests. One item failing,
//! for any reason, never affects the others; the response reports every
//! index in order.

use super::service::{IngestRequest, IngestService};
use super::staging::StagedFile;
use streambox_core::models::{BatchItemMetadata, BatchItemResult, BatchUploadResponse};
use streambox_core::{AppError, ErrorMetadata};
use uuid::Uuid;

/// A `videos` part as received, staged or rejected.
#[derive(Debug)]
pub struct ReceivedFile {
    pub filename: Option<String>,
    pub staged: Result<StagedFile, AppError>,
}

/// Everything known about one batch index before ingestion.
#[derive(Debug)]
pub struct BatchEntry {
    pub index: usize,
    pub video: Option<ReceivedFile>,
    pub thumbnail: Option<StagedFile>,
    pub metadata: Option<BatchItemMetadata>,
}

/// Pair videos, thumbnails and metadata by index.
///
/// A thumbnail is chosen by the item's `thumbnail_index`, or positionally
/// when the request carries exactly one thumbnail per video. Each thumbnail
/// is used at most once. Thumbnails nobody claimed are returned so the
/// caller can discard them.
pub fn assemble_batch(
    videos: Vec<ReceivedFile>,
    thumbnails: Vec<Option<StagedFile>>,
    metadata: Vec<BatchItemMetadata>,
) -> (Vec<BatchEntry>, Vec<StagedFile>) {
    let positional = thumbnails.len() == videos.len();
    let count = videos.len().max(metadata.len());
    let mut thumbnails = thumbnails;
    let mut videos = videos.into_iter();
    let mut metadata = metadata.into_iter();

    let entries = (0..count)
        .map(|index| {
            let meta = metadata.next();
            let slot = meta
                .as_ref()
                .and_then(|m| m.thumbnail_index)
                .or(positional.then_some(index));
            let thumbnail = slot
                .and_then(|i| thumbnails.get_mut(i))
                .and_then(Option::take);
            BatchEntry {
                index,
                video: videos.next(),
                thumbnail,
                metadata: meta,
            }
        })
        .collect();

    let unused = thumbnails.into_iter().flatten().collect();
    (entries, unused)
}

/// Ingest every entry and collect one result per index.
pub async fn run_batch(
    service: &IngestService,
    entries: Vec<BatchEntry>,
    owner_id: Uuid,
) -> BatchUploadResponse {
    let mut results = Vec::with_capacity(entries.len());

    for entry in entries {
        let index = entry.index;
        let filename = entry.video.as_ref().and_then(|v| v.filename.clone());
        let outcome = ingest_entry(service, entry, owner_id).await;

        let result = match outcome {
            Ok(asset) => BatchItemResult::created(index, filename, asset.into()),
            Err(e) => {
                tracing::warn!(
                    index,
                    filename = ?filename,
                    error = %e,
                    code = e.error_code(),
                    "Batch item failed"
                );
                BatchItemResult::failed(index, filename, e.client_message(), e.error_code())
            }
        };
        results.push(result);
    }

    let response = BatchUploadResponse::from_results(results);
    tracing::info!(
        total = response.total,
        succeeded = response.succeeded,
        failed = response.failed,
        "Batch upload finished"
    );
    response
}

async fn ingest_entry(
    service: &IngestService,
    entry: BatchEntry,
    owner_id: Uuid,
) -> Result<streambox_core::models::MediaAsset, AppError> {
    let BatchEntry {
        index,
        video,
        thumbnail,
        metadata,
    } = entry;

    let (video, metadata) = match (video, metadata) {
        (Some(ReceivedFile { staged: Ok(video), .. }), Some(metadata)) => (video, metadata),
        (Some(ReceivedFile { staged: Ok(video), .. }), None) => {
            video.discard().await;
            discard_opt(thumbnail).await;
            return Err(AppError::InvalidInput(format!(
                "No metadata provided for video at index {}",
                index
            )));
        }
        (Some(ReceivedFile { staged: Err(e), .. }), _) => {
            discard_opt(thumbnail).await;
            return Err(e);
        }
        (None, _) => {
            discard_opt(thumbnail).await;
            return Err(AppError::InvalidInput(format!(
                "No video file provided for metadata at index {}",
                index
            )));
        }
    };

    service
        .ingest(IngestRequest {
            video,
            thumbnail,
            metadata: metadata.to_upload_metadata(),
            owner_id,
        })
        .await
}

async fn discard_opt(file: Option<StagedFile>) {
    if let Some(file) = file {
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
    use std::path::Path;
    use std::sync::Arc;
    use streambox_core::models::BatchItemStatus;
    use streambox_core::{Config, IngestConfig, StorageBackend};
    use streambox_db::InMemoryMediaAssetStore;
    use streambox_storage::{StorageError, StorageProvider, StorageProviders, StorageResult};
    use tempfile::TempDir;

    /// Refuses files whose content starts with "poison".
    struct PickyProvider;

    #[async_trait]
    impl StorageProvider for PickyProvider {
        async fn store(&self, path: &Path, key: &str, _ct: &str) -> StorageResult<String> {
            let bytes = tokio::fs::read(path).await?;
            if bytes.starts_with(b"poison") {
                Err(StorageError::ProviderError("rejected".to_string()))
            } else {
                Ok(format!("https://r2.example/{}", key))
            }
        }

        fn backend_type(&self) -> StorageBackend {
            StorageBackend::Local
        }
    }

    async fn setup() -> (TempDir, StagingArea, IngestService, Arc<InMemoryMediaAssetStore>) {
        let dir = tempfile::tempdir().unwrap();
        let vars: HashMap<&str, String> = HashMap::from([(
            "JWT_SECRET",
            "0123456789abcdef0123456789abcdef".to_string(),
        )]);
        let config = Config(Box::new(
            IngestConfig::from_lookup(|k| vars.get(k).cloned()).unwrap(),
        ));
        let staging = StagingArea::new(dir.path()).await.unwrap();
        let store = Arc::new(InMemoryMediaAssetStore::new());
        let service = IngestService::new(
            config,
            StorageProviders::new(Arc::new(PickyProvider)),
            store.clone(),
        );
        (dir, staging, service, store)
    }

    async fn stage(staging: &StagingArea, name: &str, ct: &str, data: &'static [u8]) -> StagedFile {
        let body = futures::stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from_static(data))]);
        staging.stage(Some(name), Some(ct), body, 1 << 20).await.unwrap()
    }

    async fn video(staging: &StagingArea, name: &str, data: &'static [u8]) -> ReceivedFile {
        ReceivedFile {
            filename: Some(name.to_string()),
            staged: Ok(stage(staging, name, "video/mp4", data).await),
        }
    }

    fn meta(title: &str) -> BatchItemMetadata {
        BatchItemMetadata {
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_positional_thumbnail_pairing() {
        let (_dir, staging, _, _) = setup().await;
        let videos = vec![video(&staging, "a.mp4", b"a").await, video(&staging, "b.mp4", b"b").await];
        let thumbs = vec![
            Some(stage(&staging, "a.jpg", "image/jpeg", b"ta").await),
            Some(stage(&staging, "b.jpg", "image/jpeg", b"tb").await),
        ];

        let (entries, unused) = assemble_batch(videos, thumbs, vec![meta("a"), meta("b")]);

        assert!(unused.is_empty());
        assert_eq!(entries[0].thumbnail.as_ref().unwrap().original_filename(), "a.jpg");
        assert_eq!(entries[1].thumbnail.as_ref().unwrap().original_filename(), "b.jpg");
    }

    #[tokio::test]
    async fn test_indexed_thumbnail_pairing_uses_each_once() {
        let (_dir, staging, _, _) = setup().await;
        let videos = vec![
            video(&staging, "a.mp4", b"a").await,
            video(&staging, "b.mp4", b"b").await,
            video(&staging, "c.mp4", b"c").await,
        ];
        let thumbs = vec![
            Some(stage(&staging, "x.jpg", "image/jpeg", b"x").await),
            Some(stage(&staging, "y.jpg", "image/jpeg", b"y").await),
        ];
        let metadata = vec![
            BatchItemMetadata {
                thumbnail_index: Some(1),
                ..meta("a")
            },
            meta("b"),
            BatchItemMetadata {
                thumbnail_index: Some(1),
                ..meta("c")
            },
        ];

        let (entries, unused) = assemble_batch(videos, thumbs, metadata);

        assert_eq!(entries[0].thumbnail.as_ref().unwrap().original_filename(), "y.jpg");
        assert!(entries[1].thumbnail.is_none());
        assert!(entries[2].thumbnail.is_none());
        assert_eq!(unused.len(), 1);
        assert_eq!(unused[0].original_filename(), "x.jpg");
    }

    #[tokio::test]
    async fn test_failing_item_does_not_affect_others() {
        let (_dir, staging, service, store) = setup().await;
        let videos = vec![
            video(&staging, "a.mp4", b"fine").await,
            video(&staging, "b.mp4", b"poison").await,
            video(&staging, "c.mp4", b"fine too").await,
        ];
        let (entries, _) = assemble_batch(videos, vec![], vec![meta("a"), meta("b"), meta("c")]);

        let response = run_batch(&service, entries, Uuid::new_v4()).await;

        assert_eq!(response.total, 3);
        assert_eq!(response.succeeded, 2);
        assert_eq!(response.failed, 1);
        assert_eq!(response.results[1].status, BatchItemStatus::Failed);
        assert_eq!(response.results[1].code.as_deref(), Some("STORAGE_EXHAUSTED"));
        assert_eq!(response.results[1].filename.as_deref(), Some("b.mp4"));
        assert!(response.results[0].is_created());
        assert!(response.results[2].is_created());
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_third_of_five_missing_title_leaves_four_created() {
        let (_dir, staging, service, store) = setup().await;
        let mut videos = Vec::new();
        for name in ["a.mp4", "b.mp4", "c.mp4", "d.mp4", "e.mp4"] {
            videos.push(video(&staging, name, b"ok").await);
        }
        let metadata = vec![meta("a"), meta("b"), meta("  "), meta("d"), meta("e")];
        let (entries, _) = assemble_batch(videos, vec![], metadata);

        let response = run_batch(&service, entries, Uuid::new_v4()).await;

        assert_eq!(response.succeeded, 4);
        assert_eq!(response.failed, 1);
        let failed: Vec<_> = response.results.iter().filter(|r| !r.is_created()).collect();
        assert_eq!(failed[0].index, 2);
        assert!(response.results[3].is_created());
        assert!(response.results[4].is_created());
        assert_eq!(store.len().await, 4);
    }

    #[tokio::test]
    async fn test_count_mismatch_fails_only_unmatched_indices() {
        let (_dir, staging, service, _) = setup().await;
        let videos = vec![video(&staging, "a.mp4", b"a").await];
        let (entries, _) = assemble_batch(videos, vec![], vec![meta("a"), meta("b")]);

        let response = run_batch(&service, entries, Uuid::new_v4()).await;

        assert_eq!(response.total, 2);
        assert!(response.results[0].is_created());
        assert_eq!(response.results[1].code.as_deref(), Some("INVALID_INPUT"));
    }

    #[tokio::test]
    async fn test_rejected_part_and_missing_title_are_per_item() {
        let (_dir, staging, service, _) = setup().await;
        let videos = vec![
            ReceivedFile {
                filename: Some("huge.mp4".to_string()),
                staged: Err(AppError::PayloadTooLarge("too big".to_string())),
            },
            video(&staging, "b.mp4", b"b").await,
            video(&staging, "c.mp4", b"c").await,
        ];
        let (entries, _) = assemble_batch(videos, vec![], vec![meta("a"), meta(""), meta("c")]);

        let response = run_batch(&service, entries, Uuid::new_v4()).await;

        assert_eq!(response.results[0].code.as_deref(), Some("PAYLOAD_TOO_LARGE"));
        assert_eq!(response.results[1].code.as_deref(), Some("INVALID_INPUT"));
        assert!(response.results[2].is_created());
        assert_eq!(response.created_assets().count(), 1);
    }
}
