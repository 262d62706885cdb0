//! Storage provider abstraction
//!
//! Every destination a media file can be committed to implements
//! [`StorageProvider`]. Providers are built once at startup from explicit
//! configuration and never read the environment at call time.

use crate::chain::ProviderAttempt;
use crate::StorageBackend;
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Required configuration is missing; the provider cannot be used at all.
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The provider was reachable but the write failed (transient or permanent).
    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Every provider in the chain failed for the same file.
    #[error("All {} storage provider(s) failed: {}", .0.len(), summarize_attempts(.0))]
    Exhausted(Vec<ProviderAttempt>),
}

fn summarize_attempts(attempts: &[ProviderAttempt]) -> String {
    if attempts.is_empty() {
        return "no provider configured".to_string();
    }
    attempts
        .iter()
        .map(|a| {
            format!(
                "{}: {}",
                a.backend,
                a.error.as_deref().unwrap_or("unknown error")
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

impl StorageError {
    /// Provider attempts recorded before exhaustion (empty for other variants).
    pub fn attempts(&self) -> &[ProviderAttempt] {
        match self {
            StorageError::Exhausted(attempts) => attempts,
            _ => &[],
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A destination that durably stores a staged file and returns its public URL.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Store the file at `local_path` under `key` and return a publicly
    /// resolvable URL.
    ///
    /// Implementations clean up their own partial artifacts on failure
    /// (best effort) and never return a URL for an object they did not write.
    async fn store(&self, local_path: &Path, key: &str, content_type: &str)
        -> StorageResult<String>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;

    /// Whether a successful `store` takes ownership of the file at `local_path`.
    ///
    /// When true the staged file has become the durable copy and callers must
    /// not delete it.
    fn consumes_source(&self) -> bool {
        false
    }
}
