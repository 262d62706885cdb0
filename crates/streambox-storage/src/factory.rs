use crate::traits::{StorageError, StorageProvider, StorageResult};
use crate::{LocalProvider, StorageBackend};
use std::sync::Arc;
use streambox_core::Config;

/// Every provider the server may place files with, built once at startup.
///
/// Remote providers whose configuration is incomplete are recorded as
/// unavailable and left out of every chain.
#[derive(Clone)]
pub struct StorageProviders {
    primary: Option<Arc<dyn StorageProvider>>,
    secondary: Option<Arc<dyn StorageProvider>>,
    local: Arc<dyn StorageProvider>,
    unavailable: Vec<(StorageBackend, String)>,
}

impl StorageProviders {
    /// Registry with only the local provider.
    pub fn new(local: Arc<dyn StorageProvider>) -> Self {
        Self {
            primary: None,
            secondary: None,
            local,
            unavailable: Vec::new(),
        }
    }

    pub fn with_primary(mut self, provider: Arc<dyn StorageProvider>) -> Self {
        self.primary = Some(provider);
        self
    }

    pub fn with_secondary(mut self, provider: Arc<dyn StorageProvider>) -> Self {
        self.secondary = Some(provider);
        self
    }

    fn mark_unavailable(mut self, backend: StorageBackend, reason: String) -> Self {
        self.unavailable.push((backend, reason));
        self
    }

    pub fn primary(&self) -> Option<&Arc<dyn StorageProvider>> {
        self.primary.as_ref()
    }

    pub fn secondary(&self) -> Option<&Arc<dyn StorageProvider>> {
        self.secondary.as_ref()
    }

    pub fn local(&self) -> &Arc<dyn StorageProvider> {
        &self.local
    }

    pub fn unavailable(&self) -> &[(StorageBackend, String)] {
        &self.unavailable
    }

    /// Backends that will be tried, in order.
    pub fn configured_backends(&self) -> Vec<StorageBackend> {
        self.primary
            .iter()
            .chain(self.secondary.iter())
            .chain(std::iter::once(&self.local))
            .map(|p| p.backend_type())
            .collect()
    }
}

/// Build the provider registry from configuration.
///
/// Only the local provider is mandatory; failing to create its directory is
/// a startup error.
pub async fn create_providers(config: &Config) -> StorageResult<StorageProviders> {
    let local = LocalProvider::new(config.public_dir(), config.public_mount()).await?;
    let mut providers = StorageProviders::new(Arc::new(local));

    #[cfg(feature = "storage-r2")]
    {
        match crate::R2Provider::new(config.r2()) {
            Ok(r2) => providers = providers.with_primary(Arc::new(r2)),
            Err(StorageError::ProviderUnavailable(reason)) => {
                providers = providers.mark_unavailable(StorageBackend::R2, reason)
            }
            Err(e) => return Err(e),
        }
    }
    #[cfg(not(feature = "storage-r2"))]
    {
        providers = providers.mark_unavailable(
            StorageBackend::R2,
            "R2 backend not available (storage-r2 feature not enabled)".to_string(),
        );
    }

    #[cfg(feature = "storage-supabase")]
    {
        match crate::SupabaseProvider::new(config.supabase()) {
            Ok(supabase) => providers = providers.with_secondary(Arc::new(supabase)),
            Err(StorageError::ProviderUnavailable(reason)) => {
                providers = providers.mark_unavailable(StorageBackend::Supabase, reason)
            }
            Err(e) => return Err(e),
        }
    }
    #[cfg(not(feature = "storage-supabase"))]
    {
        providers = providers.mark_unavailable(
            StorageBackend::Supabase,
            "Supabase backend not available (storage-supabase feature not enabled)".to_string(),
        );
    }

    for (backend, reason) in providers.unavailable() {
        tracing::info!(provider = %backend, reason = %reason, "Storage provider disabled");
    }

    Ok(providers)
}
