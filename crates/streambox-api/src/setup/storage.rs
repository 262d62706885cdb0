//! Storage providers and staging area

use crate::services::upload::StagingArea;
use anyhow::{Context, Result};
use streambox_core::Config;
use streambox_storage::{create_providers, StorageProviders};

pub async fn setup_storage(config: &Config) -> Result<(StorageProviders, StagingArea)> {
    let providers = create_providers(config)
        .await
        .context("Failed to initialize storage providers")?;

    let staging = StagingArea::new(config.staging_dir())
        .await
        .context("Failed to initialize staging area")?;

    tracing::info!(
        providers = ?providers.configured_backends(),
        staging_dir = %staging.dir().display(),
        public_dir = %config.public_dir().display(),
        "Storage initialized"
    );

    Ok((providers, staging))
}
