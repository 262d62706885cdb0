//! OpenAPI documentation.
//! Paths in handler annotations use the literal /api/v0 prefix (utoipa requires
//! compile-time literals); they are rewritten if `API_VERSION` changes.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error;
use crate::handlers;
use streambox_core::constants::API_VERSION;
use streambox_core::models;
use streambox_core::StorageBackend;

const OPENAPI_PATH_PLACEHOLDER: &str = "/api/v0";

fn transform_openapi_paths(spec: &mut utoipa::openapi::OpenApi, version: &str) {
    let replacement = format!("/api/{}", version);
    if OPENAPI_PATH_PLACEHOLDER == replacement {
        return;
    }
    let path_map = std::mem::take(&mut spec.paths.paths);
    for (key, item) in path_map {
        let new_key = key.replacen(OPENAPI_PATH_PLACEHOLDER, &replacement, 1);
        spec.paths.paths.insert(new_key, item);
    }
}

/// Returns the OpenAPI spec with path placeholders replaced by the current API version.
pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    let mut spec = ApiDoc::openapi();
    transform_openapi_paths(&mut spec, API_VERSION);
    spec
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Streambox API",
        version = "0.1.0",
        description = "Video ingestion API (v0). Uploads are committed to Cloudflare R2, then Supabase Storage, then the local public directory, whichever accepts the file first."
    ),
    paths(
        handlers::video_upload::upload_video,
        handlers::batch_upload::upload_batch,
        handlers::video_get::list_videos,
        handlers::video_get::get_video,
    ),
    components(
        schemas(
            models::MediaAssetResponse,
            models::BatchItemMetadata,
            models::BatchItemResult,
            models::BatchItemStatus,
            models::BatchUploadResponse,
            StorageBackend,
            error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "videos", description = "Video ingestion and catalog")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_lists_upload_paths() {
        let spec = get_openapi_spec();
        assert!(spec.paths.paths.contains_key("/api/v0/videos"));
        assert!(spec.paths.paths.contains_key("/api/v0/videos/batch"));
        assert!(spec.paths.paths.contains_key("/api/v0/videos/{id}"));
    }
}
