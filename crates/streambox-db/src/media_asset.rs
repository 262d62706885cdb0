use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use streambox_core::models::{MediaAsset, NewMediaAsset};
use streambox_core::AppError;
use uuid::Uuid;

/// Persistence boundary for media asset records.
#[async_trait]
pub trait MediaAssetStore: Send + Sync {
    /// Create a record for a file that has already been placed.
    async fn create(&self, asset: NewMediaAsset) -> Result<MediaAsset, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<MediaAsset>, AppError>;

    /// Most recent assets first.
    async fn list_recent(&self, limit: i64) -> Result<Vec<MediaAsset>, AppError>;
}

/// Repository for media asset records in PostgreSQL
#[derive(Clone)]
pub struct PgMediaAssetRepository {
    pool: PgPool,
}

impl PgMediaAssetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MediaAssetStore for PgMediaAssetRepository {
    #[tracing::instrument(skip(self, asset), fields(db.table = "media_assets", db.operation = "insert"))]
    async fn create(&self, asset: NewMediaAsset) -> Result<MediaAsset, AppError> {
        let created = sqlx::query_as::<Postgres, MediaAsset>(
            r#"
            INSERT INTO media_assets (
                id, title, description, genre, primary_url, thumbnail_url, owner_id, backend
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, title, description, genre, primary_url, thumbnail_url, owner_id,
                      backend, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&asset.title)
        .bind(&asset.description)
        .bind(&asset.genre)
        .bind(&asset.primary_url)
        .bind(&asset.thumbnail_url)
        .bind(asset.owner_id)
        .bind(asset.backend)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    #[tracing::instrument(skip(self), fields(db.table = "media_assets", db.operation = "select", db.record_id = %id))]
    async fn get(&self, id: Uuid) -> Result<Option<MediaAsset>, AppError> {
        let asset = sqlx::query_as::<Postgres, MediaAsset>(
            r#"
            SELECT id, title, description, genre, primary_url, thumbnail_url, owner_id,
                   backend, created_at
            FROM media_assets
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(asset)
    }

    #[tracing::instrument(skip(self), fields(db.table = "media_assets", db.operation = "select"))]
    async fn list_recent(&self, limit: i64) -> Result<Vec<MediaAsset>, AppError> {
        let assets = sqlx::query_as::<Postgres, MediaAsset>(
            r#"
            SELECT id, title, description, genre, primary_url, thumbnail_url, owner_id,
                   backend, created_at
            FROM media_assets
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(assets)
    }
}
