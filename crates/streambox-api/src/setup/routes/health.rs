//! Health check handler.

use crate::state::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use streambox_core::StorageBackend;

#[derive(Serialize)]
pub(super) struct HealthCheckResponse {
    pub status: &'static str,
    /// Providers in the order uploads try them.
    pub storage: Vec<StorageBackend>,
    pub unavailable: Vec<UnavailableProvider>,
}

#[derive(Serialize)]
pub(super) struct UnavailableProvider {
    pub provider: StorageBackend,
    pub reason: String,
}

/// Liveness plus the storage chain uploads will use.
pub(super) async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "healthy",
        storage: state.providers.configured_backends(),
        unavailable: state
            .providers
            .unavailable()
            .iter()
            .map(|(provider, reason)| UnavailableProvider {
                provider: *provider,
                reason: reason.clone(),
            })
            .collect(),
    })
}
