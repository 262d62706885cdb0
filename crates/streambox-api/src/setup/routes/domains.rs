//! Video route groups.

use crate::handlers;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use streambox_core::constants::API_PREFIX;

/// Catalog reads, open to anyone.
pub fn video_read_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/videos", API_PREFIX),
            get(handlers::video_get::list_videos),
        )
        .route(
            &format!("{}/videos/{{id}}", API_PREFIX),
            get(handlers::video_get::get_video),
        )
}

/// Ingestion endpoints; wrapped in the admin auth layer by the caller.
pub fn video_upload_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/videos", API_PREFIX),
            post(handlers::video_upload::upload_video),
        )
        .route(
            &format!("{}/videos/batch", API_PREFIX),
            post(handlers::batch_upload::upload_batch),
        )
}
