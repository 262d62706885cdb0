//! Scripted remote providers.

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use streambox_core::StorageBackend;
use streambox_storage::{StorageError, StorageProvider, StorageResult};

pub struct FakeRemote {
    backend: StorageBackend,
    fail: bool,
    calls: AtomicUsize,
}

impl FakeRemote {
    pub fn healthy(backend: StorageBackend) -> Arc<Self> {
        Arc::new(Self {
            backend,
            fail: false,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn down(backend: StorageBackend) -> Arc<Self> {
        Arc::new(Self {
            backend,
            fail: true,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageProvider for FakeRemote {
    async fn store(&self, local_path: &Path, key: &str, _content_type: &str) -> StorageResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(StorageError::ProviderError(format!(
                "{} is unreachable",
                self.backend
            )));
        }
        // A real remote reads the staged file; so does the fake.
        tokio::fs::metadata(local_path).await?;
        Ok(format!("https://{}.test/{}", self.backend, key))
    }

    fn backend_type(&self) -> StorageBackend {
        self.backend
    }
}
