//! Configuration module
//!
//! Startup configuration for the ingestion server: HTTP, database, upload
//! limits and the credentials of each storage provider. Everything is read
//! once from the environment and then threaded explicitly into the components
//! that need it.

use std::env;
use std::path::{Path, PathBuf};

// Common constants
const SERVER_PORT: u16 = 4000;
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const MAX_VIDEO_SIZE_MB: usize = 2048;
const MAX_THUMBNAIL_SIZE_MB: usize = 10;
const MAX_BATCH_SIZE: usize = 50;
const MIN_JWT_SECRET_LEN: usize = 32;

/// Base configuration shared by every service binary
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub jwt_secret: String,
    pub environment: String,
}

/// Credentials for the primary S3-compatible store (Cloudflare R2).
///
/// Every field is optional here; the provider refuses to build unless the
/// four required values are present.
#[derive(Clone, Debug, Default)]
pub struct R2Settings {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub account_id: Option<String>,
    pub bucket_name: Option<String>,
    pub endpoint: Option<String>,
}

impl R2Settings {
    /// Names of the required variables that are absent or blank.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        for (name, value) in [
            ("R2_ACCESS_KEY_ID", &self.access_key_id),
            ("R2_SECRET_ACCESS_KEY", &self.secret_access_key),
            ("R2_ACCOUNT_ID", &self.account_id),
            ("R2_BUCKET_NAME", &self.bucket_name),
        ] {
            if value.as_deref().map(str::trim).unwrap_or("").is_empty() {
                missing.push(name);
            }
        }
        missing
    }

    pub fn is_configured(&self) -> bool {
        self.missing().is_empty()
    }
}

/// Credentials for the secondary bucket store (Supabase Storage).
#[derive(Clone, Debug)]
pub struct SupabaseSettings {
    pub url: Option<String>,
    pub service_role_key: Option<String>,
    pub bucket: String,
}

impl Default for SupabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            service_role_key: None,
            bucket: "videos".to_string(),
        }
    }
}

impl SupabaseSettings {
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.url.as_deref().map(str::trim).unwrap_or("").is_empty() {
            missing.push("SUPABASE_URL");
        }
        if self
            .service_role_key
            .as_deref()
            .map(str::trim)
            .unwrap_or("")
            .is_empty()
        {
            missing.push("SUPABASE_SERVICE_ROLE_KEY");
        }
        missing
    }

    pub fn is_configured(&self) -> bool {
        self.missing().is_empty()
    }
}

/// Ingestion server configuration
#[derive(Clone, Debug)]
pub struct IngestConfig {
    pub base: BaseConfig,
    /// Postgres connection string; `None` keeps asset records in memory.
    pub database_url: Option<String>,
    pub staging_dir: PathBuf,
    pub public_dir: PathBuf,
    pub public_mount: String,
    pub max_video_size_bytes: usize,
    pub video_allowed_content_types: Vec<String>,
    pub video_allowed_extensions: Vec<String>,
    pub max_thumbnail_size_bytes: usize,
    pub thumbnail_allowed_content_types: Vec<String>,
    pub thumbnail_allowed_extensions: Vec<String>,
    pub max_batch_size: usize,
    pub r2: R2Settings,
    pub supabase: SupabaseSettings,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<IngestConfig>);

impl Config {
    fn as_ingest(&self) -> &IngestConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        let config = IngestConfig::from_lookup(|key| env::var(key).ok())?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_ingest().validate()
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.as_ingest().base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn environment(&self) -> &str {
        &self.as_ingest().base.environment
    }

    pub fn server_port(&self) -> u16 {
        self.as_ingest().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.as_ingest().base.cors_origins
    }

    pub fn jwt_secret(&self) -> &str {
        &self.as_ingest().base.jwt_secret
    }

    pub fn db_max_connections(&self) -> u32 {
        self.as_ingest().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.as_ingest().base.db_timeout_seconds
    }

    pub fn database_url(&self) -> Option<&str> {
        self.as_ingest().database_url.as_deref()
    }

    pub fn staging_dir(&self) -> &Path {
        &self.as_ingest().staging_dir
    }

    pub fn public_dir(&self) -> &Path {
        &self.as_ingest().public_dir
    }

    pub fn public_mount(&self) -> &str {
        &self.as_ingest().public_mount
    }

    pub fn max_video_size_bytes(&self) -> usize {
        self.as_ingest().max_video_size_bytes
    }

    pub fn video_allowed_content_types(&self) -> &[String] {
        &self.as_ingest().video_allowed_content_types
    }

    pub fn video_allowed_extensions(&self) -> &[String] {
        &self.as_ingest().video_allowed_extensions
    }

    pub fn max_thumbnail_size_bytes(&self) -> usize {
        self.as_ingest().max_thumbnail_size_bytes
    }

    pub fn thumbnail_allowed_content_types(&self) -> &[String] {
        &self.as_ingest().thumbnail_allowed_content_types
    }

    pub fn thumbnail_allowed_extensions(&self) -> &[String] {
        &self.as_ingest().thumbnail_allowed_extensions
    }

    pub fn max_batch_size(&self) -> usize {
        self.as_ingest().max_batch_size
    }

    /// Upper bound for a whole request body (a full batch of maximum-size items).
    pub fn max_request_body_bytes(&self) -> usize {
        let per_item = self
            .max_video_size_bytes()
            .saturating_add(self.max_thumbnail_size_bytes());
        per_item.saturating_mul(self.max_batch_size().max(1))
    }

    pub fn r2(&self) -> &R2Settings {
        &self.as_ingest().r2
    }

    pub fn supabase(&self) -> &SupabaseSettings {
        &self.as_ingest().supabase
    }
}

fn parse_list(raw: String) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn mb_to_bytes(name: &str, mb: usize) -> Result<usize, anyhow::Error> {
    mb.checked_mul(1024 * 1024)
        .ok_or_else(|| anyhow::anyhow!("{} is too large: {} MB", name, mb))
}

impl IngestConfig {
    /// Build the configuration from a variable lookup (the process environment
    /// in production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = var("ENVIRONMENT")
            .or_else(|| var("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let cors_origins_str = var("CORS_ORIGINS").unwrap_or_else(|| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let base = BaseConfig {
            server_port: var("PORT")
                .unwrap_or_else(|| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            db_max_connections: var("DB_MAX_CONNECTIONS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: var("DB_TIMEOUT_SECONDS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            jwt_secret: var("JWT_SECRET")
                .ok_or_else(|| anyhow::anyhow!("JWT_SECRET must be set for authentication"))?,
            environment,
        };

        let max_video_size_mb = var("MAX_VIDEO_SIZE_MB")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(MAX_VIDEO_SIZE_MB);
        let max_thumbnail_size_mb = var("MAX_THUMBNAIL_SIZE_MB")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(MAX_THUMBNAIL_SIZE_MB);

        let max_video_size_bytes = mb_to_bytes("MAX_VIDEO_SIZE_MB", max_video_size_mb)?;
        let max_thumbnail_size_bytes =
            mb_to_bytes("MAX_THUMBNAIL_SIZE_MB", max_thumbnail_size_mb)?;

        let config = IngestConfig {
            base,
            database_url: var("DATABASE_URL"),
            staging_dir: PathBuf::from(
                var("UPLOAD_STAGING_DIR").unwrap_or_else(|| "temp-uploads".to_string()),
            ),
            public_dir: PathBuf::from(
                var("PUBLIC_UPLOADS_DIR").unwrap_or_else(|| "uploads".to_string()),
            ),
            public_mount: var("PUBLIC_UPLOADS_MOUNT").unwrap_or_else(|| "/uploads".to_string()),
            max_video_size_bytes,
            video_allowed_content_types: parse_list(
                var("VIDEO_ALLOWED_CONTENT_TYPES").unwrap_or_else(|| {
                    "video/mp4,video/webm,video/quicktime,video/x-matroska,video/x-msvideo"
                        .to_string()
                }),
            ),
            video_allowed_extensions: parse_list(
                var("VIDEO_ALLOWED_EXTENSIONS").unwrap_or_else(|| "mp4,webm,mov,mkv,avi".to_string()),
            ),
            max_thumbnail_size_bytes,
            thumbnail_allowed_content_types: parse_list(
                var("THUMBNAIL_ALLOWED_CONTENT_TYPES")
                    .unwrap_or_else(|| "image/jpeg,image/png,image/webp".to_string()),
            ),
            thumbnail_allowed_extensions: parse_list(
                var("THUMBNAIL_ALLOWED_EXTENSIONS")
                    .unwrap_or_else(|| "jpg,jpeg,png,webp".to_string()),
            ),
            max_batch_size: var("MAX_BATCH_SIZE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(MAX_BATCH_SIZE),
            r2: R2Settings {
                access_key_id: var("R2_ACCESS_KEY_ID"),
                secret_access_key: var("R2_SECRET_ACCESS_KEY"),
                account_id: var("R2_ACCOUNT_ID"),
                bucket_name: var("R2_BUCKET_NAME"),
                endpoint: var("R2_ENDPOINT"),
            },
            supabase: SupabaseSettings {
                url: var("SUPABASE_URL"),
                service_role_key: var("SUPABASE_SERVICE_ROLE_KEY"),
                bucket: var("SUPABASE_BUCKET").unwrap_or_else(|| "videos".to_string()),
            },
        };

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.base.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LEN
            ));
        }

        if let Some(url) = &self.database_url {
            if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                return Err(anyhow::anyhow!(
                    "DATABASE_URL must be a valid PostgreSQL connection string"
                ));
            }
        }

        if self.max_video_size_bytes == 0 || self.max_thumbnail_size_bytes == 0 {
            return Err(anyhow::anyhow!("Upload size limits must be greater than zero"));
        }

        if self.max_batch_size == 0 {
            return Err(anyhow::anyhow!("MAX_BATCH_SIZE must be greater than zero"));
        }

        if self.video_allowed_content_types.is_empty() || self.video_allowed_extensions.is_empty()
        {
            return Err(anyhow::anyhow!(
                "VIDEO_ALLOWED_CONTENT_TYPES and VIDEO_ALLOWED_EXTENSIONS cannot be empty"
            ));
        }

        if !self.public_mount.starts_with('/') {
            return Err(anyhow::anyhow!("PUBLIC_UPLOADS_MOUNT must start with '/'"));
        }

        Ok(())
    }
}
