use crate::media_asset::MediaAssetStore;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use streambox_core::models::{MediaAsset, NewMediaAsset};
use streambox_core::AppError;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-local asset store, used when no database is configured.
#[derive(Clone, Default)]
pub struct InMemoryMediaAssetStore {
    assets: Arc<RwLock<Vec<MediaAsset>>>,
}

impl InMemoryMediaAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.assets.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.assets.read().await.is_empty()
    }

    pub async fn all(&self) -> Vec<MediaAsset> {
        self.assets.read().await.clone()
    }
}

#[async_trait]
impl MediaAssetStore for InMemoryMediaAssetStore {
    async fn create(&self, asset: NewMediaAsset) -> Result<MediaAsset, AppError> {
        let created = MediaAsset {
            id: Uuid::new_v4(),
            title: asset.title,
            description: asset.description,
            genre: asset.genre,
            primary_url: asset.primary_url,
            thumbnail_url: asset.thumbnail_url,
            owner_id: asset.owner_id,
            backend: asset.backend,
            created_at: Utc::now(),
        };
        self.assets.write().await.push(created.clone());
        Ok(created)
    }

    async fn get(&self, id: Uuid) -> Result<Option<MediaAsset>, AppError> {
        Ok(self
            .assets
            .read()
            .await
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<MediaAsset>, AppError> {
        let limit = usize::try_from(limit.max(0)).unwrap_or(0);
        Ok(self
            .assets
            .read()
            .await
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}
