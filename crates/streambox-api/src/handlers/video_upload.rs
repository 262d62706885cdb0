use crate::auth::models::UploaderContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::services::upload::{IngestRequest, StagedFile};
use crate::state::AppState;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use streambox_core::models::{MediaAssetResponse, UploadMetadata};
use streambox_core::AppError;

/// Parts of a single-video upload form.
#[derive(Default)]
struct VideoUploadForm {
    video: Option<StagedFile>,
    thumbnail: Option<StagedFile>,
    title: Option<String>,
    description: Option<String>,
    genre: Option<String>,
}

impl VideoUploadForm {
    async fn discard(self) {
        if let Some(video) = self.video {
            video.discard().await;
        }
        if let Some(thumbnail) = self.thumbnail {
            thumbnail.discard().await;
        }
    }
}

async fn text_field(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read form field: {}", e)))
}

async fn read_form(
    state: &AppState,
    multipart: &mut Multipart,
    form: &mut VideoUploadForm,
) -> Result<(), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read multipart: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "video" => {
                if form.video.is_some() {
                    return Err(AppError::InvalidInput(
                        "Only one 'video' field is allowed; use the batch endpoint for several"
                            .to_string(),
                    ));
                }
                let filename = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let staged = state
                    .staging
                    .stage(
                        filename.as_deref(),
                        content_type.as_deref(),
                        field,
                        state.config.max_video_size_bytes(),
                    )
                    .await?;
                form.video = Some(staged);
            }
            "thumbnail" => {
                let filename = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let staged = state
                    .staging
                    .stage(
                        filename.as_deref(),
                        content_type.as_deref(),
                        field,
                        state.config.max_thumbnail_size_bytes(),
                    )
                    .await;
                match staged {
                    Ok(staged) => {
                        if let Some(previous) = form.thumbnail.replace(staged) {
                            previous.discard().await;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, filename = ?filename, "Thumbnail not staged, continuing without it");
                    }
                }
            }
            "title" => form.title = Some(text_field(field).await?),
            "description" => form.description = Some(text_field(field).await?),
            "genre" => form.genre = Some(text_field(field).await?),
            other => tracing::debug!(field = %other, "Ignoring unknown multipart field"),
        }
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/v0/videos",
    tag = "videos",
    request_body(content = inline(Object), content_type = "multipart/form-data",
        description = "Fields: video (file, required), thumbnail (file), title (required), description, genre"),
    responses(
        (status = 201, description = "Video uploaded successfully", body = MediaAssetResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 502, description = "No storage provider accepted the video", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_video(
    State(state): State<Arc<AppState>>,
    uploader: UploaderContext,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<MediaAssetResponse>), HttpAppError> {
    let mut form = VideoUploadForm::default();
    if let Err(e) = read_form(&state, &mut multipart, &mut form).await {
        form.discard().await;
        return Err(e.into());
    }

    let Some(video) = form.video.take() else {
        form.discard().await;
        return Err(AppError::InvalidInput("A video file is required (field 'video')".to_string()).into());
    };

    let request = IngestRequest {
        video,
        thumbnail: form.thumbnail.take(),
        metadata: UploadMetadata::new(
            form.title.take().unwrap_or_default(),
            form.description.take(),
            form.genre.take(),
        ),
        owner_id: uploader.user_id,
    };

    let asset = state.ingest.ingest(request).await?;

    Ok((StatusCode::CREATED, Json(asset.into())))
}
