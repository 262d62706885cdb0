//! Application state shared by every handler.

use crate::services::upload::{IngestService, StagingArea};
use std::sync::Arc;
use streambox_core::Config;
use streambox_db::MediaAssetStore;
use streambox_storage::StorageProviders;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub providers: StorageProviders,
    pub assets: Arc<dyn MediaAssetStore>,
    pub staging: StagingArea,
    pub ingest: IngestService,
}

impl AppState {
    pub fn new(
        config: Config,
        providers: StorageProviders,
        assets: Arc<dyn MediaAssetStore>,
        staging: StagingArea,
    ) -> Self {
        let ingest = IngestService::new(config.clone(), providers.clone(), assets.clone());
        Self {
            config,
            providers,
            assets,
            staging,
            ingest,
        }
    }
}
