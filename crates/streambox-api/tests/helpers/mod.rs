//! Test helpers: build AppState and router for integration tests.
//!
//! Every app gets its own temporary staging and public directories and an
//! in-memory metadata store; remote providers are replaced by scripted fakes.

pub mod providers;

use axum_test::multipart::Part;
use axum_test::TestServer;
use bytes::Bytes;
use chrono::Duration;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use streambox_api::auth::{issue_token, UserRole};
use streambox_api::setup::routes;
use streambox_api::{AppState, StagingArea};
use streambox_core::constants::API_PREFIX;
use streambox_core::{Config, IngestConfig};
use streambox_db::InMemoryMediaAssetStore;
use streambox_storage::{LocalProvider, StorageProvider, StorageProviders};
use tempfile::TempDir;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "integration-secret-integration-secret";

/// API path prefix for tests (e.g. `/api/v0`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", API_PREFIX, path)
}

pub struct TestApp {
    pub server: TestServer,
    pub store: Arc<InMemoryMediaAssetStore>,
    pub public_dir: PathBuf,
    pub staging_dir: PathBuf,
    _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Number of files currently waiting in the staging directory.
    pub fn staged_count(&self) -> usize {
        std::fs::read_dir(&self.staging_dir)
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

/// Remote providers for a test app, in chain order.
#[derive(Default)]
pub struct Remotes {
    pub primary: Option<Arc<dyn StorageProvider>>,
    pub secondary: Option<Arc<dyn StorageProvider>>,
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(Remotes::default()).await
}

pub async fn setup_test_app_with(remotes: Remotes) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let public_dir = temp_dir.path().join("public");
    let staging_dir = temp_dir.path().join("staging");

    let vars: HashMap<&str, String> = HashMap::from([
        ("JWT_SECRET", TEST_JWT_SECRET.to_string()),
        ("PUBLIC_UPLOADS_DIR", public_dir.display().to_string()),
        ("UPLOAD_STAGING_DIR", staging_dir.display().to_string()),
        ("MAX_VIDEO_SIZE_MB", "1".to_string()),
        ("MAX_THUMBNAIL_SIZE_MB", "1".to_string()),
        ("MAX_BATCH_SIZE", "3".to_string()),
    ]);
    let config = Config(Box::new(
        IngestConfig::from_lookup(|key| vars.get(key).cloned()).expect("test config"),
    ));

    let local = LocalProvider::new(config.public_dir(), config.public_mount())
        .await
        .expect("local provider");
    let mut providers = StorageProviders::new(Arc::new(local));
    if let Some(primary) = remotes.primary {
        providers = providers.with_primary(primary);
    }
    if let Some(secondary) = remotes.secondary {
        providers = providers.with_secondary(secondary);
    }

    let staging = StagingArea::new(config.staging_dir())
        .await
        .expect("staging area");
    let store = Arc::new(InMemoryMediaAssetStore::new());
    let state = Arc::new(AppState::new(
        config.clone(),
        providers,
        store.clone(),
        staging,
    ));

    let app = routes::setup_routes(&config, state).expect("routes");
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        store,
        public_dir,
        staging_dir,
        _temp_dir: temp_dir,
    }
}

pub fn token_for(role: UserRole) -> String {
    issue_token(TEST_JWT_SECRET, Uuid::new_v4(), role, Duration::hours(1)).expect("token")
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

pub fn video_part(name: &str, data: &'static [u8]) -> Part {
    Part::bytes(Bytes::from_static(data))
        .file_name(name.to_string())
        .mime_type("video/mp4")
}

pub fn image_part(name: &str, data: &'static [u8]) -> Part {
    Part::bytes(Bytes::from_static(data))
        .file_name(name.to_string())
        .mime_type("image/jpeg")
}
