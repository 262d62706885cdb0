//! Media ingestion: staging, single-item ingest and batch orchestration.

pub mod batch;
pub mod service;
pub mod staging;

pub use batch::{assemble_batch, run_batch, BatchEntry, ReceivedFile};
pub use service::{IngestRequest, IngestService};
pub use staging::{StagedFile, StagingArea};
