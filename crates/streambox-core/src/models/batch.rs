//! Batch upload wire types shared by the server and the clients.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::media_asset::{MediaAssetResponse, UploadMetadata};

/// Per-item metadata in a batch request, index-aligned with the `videos` parts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct BatchItemMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    /// Index into the `thumbnails` parts. When absent, thumbnails are paired
    /// positionally if there are exactly as many thumbnails as videos.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_index: Option<usize>,
}

impl BatchItemMetadata {
    pub fn to_upload_metadata(&self) -> UploadMetadata {
        UploadMetadata::new(
            self.title.clone(),
            self.description.clone(),
            self.genre.clone(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BatchItemStatus {
    Created,
    Failed,
}

/// Outcome of one batch index.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchItemResult {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub status: BatchItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset: Option<MediaAssetResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Machine-readable error code (same vocabulary as error responses)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl BatchItemResult {
    pub fn created(index: usize, filename: Option<String>, asset: MediaAssetResponse) -> Self {
        Self {
            index,
            filename,
            status: BatchItemStatus::Created,
            asset: Some(asset),
            error: None,
            code: None,
        }
    }

    pub fn failed(
        index: usize,
        filename: Option<String>,
        error: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            index,
            filename,
            status: BatchItemStatus::Failed,
            asset: None,
            error: Some(error.into()),
            code: Some(code.into()),
        }
    }

    pub fn is_created(&self) -> bool {
        self.status == BatchItemStatus::Created
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchUploadResponse {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<BatchItemResult>,
}

impl BatchUploadResponse {
    /// Build the response from index-ordered results.
    pub fn from_results(results: Vec<BatchItemResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.is_created()).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }

    pub fn created_assets(&self) -> impl Iterator<Item = &MediaAssetResponse> {
        self.results.iter().filter_map(|r| r.asset.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_parses_with_missing_fields() {
        let items: Vec<BatchItemMetadata> =
            serde_json::from_str(r#"[{"title":"a"},{"genre":"Drama","thumbnail_index":0}]"#)
                .unwrap();
        assert_eq!(items[0].title, "a");
        assert_eq!(items[1].title, "");
        assert_eq!(items[1].thumbnail_index, Some(0));
    }

    #[test]
    fn failed_result_skips_asset_in_json() {
        let result = BatchItemResult::failed(2, Some("c.mp4".into()), "title is required", "INVALID_INPUT");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "failed");
        assert!(json.get("asset").is_none());
        assert_eq!(json["code"], "INVALID_INPUT");
    }

    #[test]
    fn response_counts_outcomes() {
        let response = BatchUploadResponse::from_results(vec![
            BatchItemResult::failed(0, None, "x", "INVALID_INPUT"),
            BatchItemResult::failed(1, None, "y", "STORAGE_EXHAUSTED"),
        ]);
        assert_eq!(response.total, 2);
        assert_eq!(response.succeeded, 0);
        assert_eq!(response.failed, 2);
        assert_eq!(response.created_assets().count(), 0);
    }
}
