//! Streambox Storage Library
//!
//! Storage providers for ingested media and the chain that picks between them.
//!
//! # Storage key format
//!
//! Keys are `{category}/{filename}` where category is `videos` or `thumbnails`
//! (see [`AssetCategory`]). Keys must not be empty, contain `..` or start with `/`.
//! Key generation is centralized in the `keys` module so all providers agree.
//!
//! # Fallback order
//!
//! R2 (when configured) → Supabase (when configured) → local filesystem.
//! The local provider is always present and always last.

pub mod chain;
pub mod factory;
pub mod keys;
pub mod local;
#[cfg(feature = "storage-r2")]
pub mod r2;
#[cfg(feature = "storage-supabase")]
pub mod supabase;
pub mod traits;

// Re-export commonly used types
pub use chain::{Placement, ProviderAttempt, ProviderChain};
pub use factory::{create_providers, StorageProviders};
pub use keys::generate_storage_key;
pub use local::LocalProvider;
#[cfg(feature = "storage-r2")]
pub use r2::R2Provider;
pub use streambox_core::{AssetCategory, StorageBackend};
#[cfg(feature = "storage-supabase")]
pub use supabase::SupabaseProvider;
pub use traits::{StorageError, StorageProvider, StorageResult};
