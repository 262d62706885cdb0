//! Provider chain resolution and placement.

use crate::factory::StorageProviders;
use crate::traits::{StorageError, StorageProvider, StorageResult};
use crate::StorageBackend;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Outcome of one provider try for one file. Only used for logging and
/// fallback decisions.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProviderAttempt {
    pub backend: StorageBackend,
    pub success: bool,
    pub url: Option<String>,
    pub error: Option<String>,
}

/// Successful placement of one file.
#[derive(Debug, Clone)]
pub struct Placement {
    pub url: String,
    pub backend: StorageBackend,
    /// The committing provider now owns the staged file.
    pub consumed_source: bool,
    pub attempts: Vec<ProviderAttempt>,
}

/// Priority-ordered list of providers for a single upload.
pub struct ProviderChain {
    providers: Vec<Arc<dyn StorageProvider>>,
}

impl ProviderChain {
    /// Order the configured providers: primary remote, secondary remote, then
    /// local. Built per upload so it always reflects the current registry.
    pub fn resolve(registry: &StorageProviders) -> Self {
        let mut providers: Vec<Arc<dyn StorageProvider>> = Vec::with_capacity(3);
        if let Some(primary) = registry.primary() {
            providers.push(primary.clone());
        }
        if let Some(secondary) = registry.secondary() {
            providers.push(secondary.clone());
        }
        for (backend, reason) in registry.unavailable() {
            tracing::debug!(provider = %backend, reason = %reason, "Provider skipped");
        }
        providers.push(registry.local().clone());
        Self { providers }
    }

    pub fn order(&self) -> Vec<StorageBackend> {
        self.providers.iter().map(|p| p.backend_type()).collect()
    }

    /// Try each provider in order until one stores the file.
    ///
    /// Errors from a provider are recorded and the next one is tried. Returns
    /// `StorageError::Exhausted` with every attempt when none succeeds.
    pub async fn place(
        &self,
        local_path: &Path,
        key: &str,
        content_type: &str,
    ) -> StorageResult<Placement> {
        let mut attempts = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            let backend = provider.backend_type();
            let start = std::time::Instant::now();

            match provider.store(local_path, key, content_type).await {
                Ok(url) if !url.trim().is_empty() => {
                    tracing::info!(
                        provider = %backend,
                        key = %key,
                        url = %url,
                        attempt = attempts.len() + 1,
                        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                        "File placed"
                    );
                    attempts.push(ProviderAttempt {
                        backend,
                        success: true,
                        url: Some(url.clone()),
                        error: None,
                    });
                    return Ok(Placement {
                        url,
                        backend,
                        consumed_source: provider.consumes_source(),
                        attempts,
                    });
                }
                Ok(_) => {
                    tracing::warn!(
                        provider = %backend,
                        key = %key,
                        "Provider reported success with an empty URL, trying next provider"
                    );
                    attempts.push(ProviderAttempt {
                        backend,
                        success: false,
                        url: None,
                        error: Some("provider returned an empty URL".to_string()),
                    });
                }
                Err(e) => {
                    match &e {
                        StorageError::ProviderUnavailable(_) => tracing::debug!(
                            provider = %backend,
                            key = %key,
                            error = %e,
                            "Provider unavailable, trying next provider"
                        ),
                        _ => tracing::warn!(
                            provider = %backend,
                            key = %key,
                            error = %e,
                            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                            "Provider failed, trying next provider"
                        ),
                    }
                    attempts.push(ProviderAttempt {
                        backend,
                        success: false,
                        url: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        tracing::error!(
            key = %key,
            attempted = attempts.len(),
            "Every storage provider failed"
        );
        Err(StorageError::Exhausted(attempts))
    }
}
