//! Shared key generation for storage providers.
//!
//! Key format: `{category}/{filename}`, e.g. `videos/1712345678901-<uuid>.mp4`.

use crate::traits::{StorageError, StorageResult};
use streambox_core::AssetCategory;

/// Generate a storage key for the given category and filename.
pub fn generate_storage_key(category: AssetCategory, filename: &str) -> String {
    format!("{}/{}", category.prefix(), filename.trim_start_matches('/'))
}

/// Reject keys that could escape a provider's namespace.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.trim().is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if key.contains("..") || key.starts_with('/') || key.contains('\\') {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    Ok(())
}

/// Percent-encode each path segment, keeping the `/` separators.
pub fn encode_key_path(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
