pub mod batch;
pub mod media_asset;

pub use batch::{BatchItemMetadata, BatchItemResult, BatchItemStatus, BatchUploadResponse};
pub use media_asset::{MediaAsset, MediaAssetResponse, NewMediaAsset, UploadMetadata};
