use crate::auth::models::UploaderContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::services::upload::{assemble_batch, run_batch, ReceivedFile, StagedFile};
use crate::state::AppState;
use axum::{
    extract::{Multipart, State},
    Json,
};
use std::sync::Arc;
use streambox_core::models::{BatchItemMetadata, BatchUploadResponse};
use streambox_core::AppError;

/// Parts of a batch upload form, in arrival order.
#[derive(Default)]
struct BatchUploadForm {
    videos: Vec<ReceivedFile>,
    thumbnails: Vec<Option<StagedFile>>,
    metadata: Option<String>,
}

impl BatchUploadForm {
    async fn discard(self) {
        for video in self.videos {
            if let Ok(staged) = video.staged {
                staged.discard().await;
            }
        }
        for thumbnail in self.thumbnails.into_iter().flatten() {
            thumbnail.discard().await;
        }
    }
}

async fn read_form(
    state: &AppState,
    multipart: &mut Multipart,
    form: &mut BatchUploadForm,
) -> Result<(), AppError> {
    let max_batch = state.config.max_batch_size();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read multipart: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "videos" | "videos[]" => {
                if form.videos.len() >= max_batch {
                    return Err(AppError::BadRequest(format!(
                        "Batch exceeds the maximum of {} videos",
                        max_batch
                    )));
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
                    .await;
                form.videos.push(ReceivedFile { filename, staged });
            }
            "thumbnails" | "thumbnails[]" => {
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
                // Keep the slot so thumbnail indices stay aligned.
                form.thumbnails.push(match staged {
                    Ok(staged) => Some(staged),
                    Err(e) => {
                        tracing::warn!(error = %e, filename = ?filename, "Thumbnail not staged, continuing without it");
                        None
                    }
                });
            }
            "metadata" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read metadata: {}", e)))?;
                form.metadata = Some(text);
            }
            other => tracing::debug!(field = %other, "Ignoring unknown multipart field"),
        }
    }
    Ok(())
}

fn parse_metadata(raw: Option<&str>, max_batch: usize) -> Result<Vec<BatchItemMetadata>, AppError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("The 'metadata' field is required".to_string()))?;
    let items: Vec<BatchItemMetadata> = serde_json::from_str(raw)
        .map_err(|e| AppError::BadRequest(format!("Invalid metadata JSON: {}", e)))?;
    if items.len() > max_batch {
        return Err(AppError::BadRequest(format!(
            "Batch exceeds the maximum of {} videos",
            max_batch
        )));
    }
    Ok(items)
}

#[utoipa::path(
    post,
    path = "/api/v0/videos/batch",
    tag = "videos",
    request_body(content = inline(Object), content_type = "multipart/form-data",
        description = "Fields: videos (repeated files), thumbnails (repeated files), metadata (JSON array of {title, description?, genre?, thumbnail_index?})"),
    responses(
        (status = 200, description = "Per-item results, in request order", body = BatchUploadResponse),
        (status = 400, description = "Malformed batch request", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_batch(
    State(state): State<Arc<AppState>>,
    uploader: UploaderContext,
    mut multipart: Multipart,
) -> Result<Json<BatchUploadResponse>, HttpAppError> {
    let mut form = BatchUploadForm::default();
    if let Err(e) = read_form(&state, &mut multipart, &mut form).await {
        form.discard().await;
        return Err(e.into());
    }

    let metadata = match parse_metadata(form.metadata.as_deref(), state.config.max_batch_size()) {
        Ok(items) => items,
        Err(e) => {
            form.discard().await;
            return Err(e.into());
        }
    };
    if form.videos.is_empty() && metadata.is_empty() {
        form.discard().await;
        return Err(AppError::BadRequest("No videos provided".to_string()).into());
    }

    tracing::info!(
        videos = form.videos.len(),
        thumbnails = form.thumbnails.len(),
        metadata = metadata.len(),
        "Batch upload received"
    );

    let (entries, unused) = assemble_batch(form.videos, form.thumbnails, metadata);
    for thumbnail in unused {
        tracing::debug!(filename = %thumbnail.original_filename(), "Unreferenced thumbnail discarded");
        thumbnail.discard().await;
    }

    let response = run_batch(&state.ingest, entries, uploader.user_id).await;
    Ok(Json(response))
}
