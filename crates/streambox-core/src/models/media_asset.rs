use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::constants::DEFAULT_GENRE;
use crate::storage_types::StorageBackend;

/// Persisted record of an ingested video.
///
/// `primary_url` always points at a file some provider accepted; a record is
/// never written for a file that did not reach storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct MediaAsset {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub genre: String,
    pub primary_url: String,
    pub thumbnail_url: Option<String>,
    pub owner_id: Uuid,
    pub backend: StorageBackend,
    pub created_at: DateTime<Utc>,
}

/// Values needed to create a `MediaAsset` once placement has succeeded.
#[derive(Debug, Clone)]
pub struct NewMediaAsset {
    pub title: String,
    pub description: String,
    pub genre: String,
    pub primary_url: String,
    pub thumbnail_url: Option<String>,
    pub owner_id: Uuid,
    pub backend: StorageBackend,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MediaAssetResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub genre: String,
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    pub uploaded_by: Uuid,
    pub storage: StorageBackend,
    pub created_at: DateTime<Utc>,
}

impl From<MediaAsset> for MediaAssetResponse {
    fn from(asset: MediaAsset) -> Self {
        Self {
            id: asset.id,
            title: asset.title,
            description: asset.description,
            genre: asset.genre,
            video_url: asset.primary_url,
            thumbnail_url: asset.thumbnail_url,
            uploaded_by: asset.owner_id,
            storage: asset.backend,
            created_at: asset.created_at,
        }
    }
}

/// Scalar metadata accompanying one uploaded video.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UploadMetadata {
    #[validate(length(min = 1, max = 255, message = "title is required"))]
    pub title: String,
    #[validate(length(max = 5000))]
    #[serde(default)]
    pub description: String,
    #[validate(length(max = 100))]
    #[serde(default)]
    pub genre: String,
}

impl UploadMetadata {
    pub fn new(
        title: impl Into<String>,
        description: Option<String>,
        genre: Option<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.unwrap_or_default(),
            genre: genre.unwrap_or_default(),
        }
    }

    /// Trim the title and description and fill in the default genre.
    pub fn normalized(self) -> Self {
        let genre = self.genre.trim();
        Self {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            genre: if genre.is_empty() {
                DEFAULT_GENRE.to_string()
            } else {
                genre.to_string()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_trims_and_defaults_genre() {
        let meta = UploadMetadata::new("  My clip ", None, Some("   ".to_string())).normalized();
        assert_eq!(meta.title, "My clip");
        assert_eq!(meta.description, "");
        assert_eq!(meta.genre, "Autre");
    }

    #[test]
    fn whitespace_title_fails_validation_after_normalization() {
        let meta = UploadMetadata::new("   ", None, None).normalized();
        assert!(meta.validate().is_err());

        let meta = UploadMetadata::new("ok", None, Some("Drama".into())).normalized();
        assert!(meta.validate().is_ok());
        assert_eq!(meta.genre, "Drama");
    }

    #[test]
    fn response_exposes_primary_url_as_video_url() {
        let asset = MediaAsset {
            id: Uuid::new_v4(),
            title: "t".into(),
            description: String::new(),
            genre: "Autre".into(),
            primary_url: "/uploads/videos/a.mp4".into(),
            thumbnail_url: None,
            owner_id: Uuid::nil(),
            backend: StorageBackend::Local,
            created_at: Utc::now(),
        };
        let response = MediaAssetResponse::from(asset);
        assert_eq!(response.video_url, "/uploads/videos/a.mp4");
        assert_eq!(response.storage, StorageBackend::Local);
    }
}
