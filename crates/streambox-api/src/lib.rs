//! Streambox API library
//!
//! HTTP handlers, authentication, the ingestion services and application
//! setup for the upload server.

mod api_doc;
mod handlers;
mod telemetry;
mod utils;

pub mod auth;
pub mod error;
pub mod services;
pub mod setup;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use services::upload::{IngestRequest, IngestService, StagedFile, StagingArea};
pub use state::AppState;
