//! Metadata store for ingested media.
//!
//! The ingestion pipeline only ever writes one kind of record, a
//! [`MediaAsset`], and only after its primary file has been placed. The
//! [`MediaAssetStore`] trait is that boundary; Postgres is the production
//! implementation and an in-memory store backs tests and database-less runs.

pub mod media_asset;
pub mod memory;

pub use media_asset::{MediaAssetStore, PgMediaAssetRepository};
pub use memory::InMemoryMediaAssetStore;
pub use streambox_core::models::{MediaAsset, NewMediaAsset};
