//! Streambox Core Library
//!
//! Domain models, error types and configuration shared by the ingestion
//! server, the storage providers and the upload clients.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{BaseConfig, Config, IngestConfig, R2Settings, SupabaseSettings};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::{AssetCategory, StorageBackend};
