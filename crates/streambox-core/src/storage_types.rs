use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Storage provider kinds
///
/// Closed set of places a media file can end up. The order of declaration is
/// not the fallback order; see the provider chain in `streambox-storage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "storage_backend", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    R2,
    Supabase,
    Local,
}

impl StorageBackend {
    /// Whether the backend lives outside this host.
    pub fn is_remote(&self) -> bool {
        !matches!(self, StorageBackend::Local)
    }
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "r2" => Ok(StorageBackend::R2),
            "supabase" => Ok(StorageBackend::Supabase),
            "local" => Ok(StorageBackend::Local),
            _ => Err(anyhow::anyhow!("Invalid storage backend: {}", s)),
        }
    }
}

impl Display for StorageBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageBackend::R2 => write!(f, "r2"),
            StorageBackend::Supabase => write!(f, "supabase"),
            StorageBackend::Local => write!(f, "local"),
        }
    }
}

/// Logical category of an uploaded file; drives the key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetCategory {
    Video,
    Thumbnail,
}

impl AssetCategory {
    pub fn prefix(&self) -> &'static str {
        match self {
            AssetCategory::Video => "videos",
            AssetCategory::Thumbnail => "thumbnails",
        }
    }
}

impl Display for AssetCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AssetCategory::Video => write!(f, "video"),
            AssetCategory::Thumbnail => write!(f, "thumbnail"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_case_insensitively() {
        assert_eq!("R2".parse::<StorageBackend>().unwrap(), StorageBackend::R2);
        assert_eq!(
            "supabase".parse::<StorageBackend>().unwrap(),
            StorageBackend::Supabase
        );
        assert!("nfs".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn only_local_is_not_remote() {
        assert!(StorageBackend::R2.is_remote());
        assert!(StorageBackend::Supabase.is_remote());
        assert!(!StorageBackend::Local.is_remote());
    }

    #[test]
    fn category_prefixes() {
        assert_eq!(AssetCategory::Video.prefix(), "videos");
        assert_eq!(AssetCategory::Thumbnail.prefix(), "thumbnails");
    }
}
