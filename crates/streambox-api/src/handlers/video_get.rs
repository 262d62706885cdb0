use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use streambox_core::models::MediaAssetResponse;
use streambox_core::AppError;
use utoipa::IntoParams;
use uuid::Uuid;

const DEFAULT_LIST_LIMIT: i64 = 50;
const MAX_LIST_LIMIT: i64 = 100;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListQuery {
    /// Number of videos to return (1-100, default 50)
    pub limit: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/v0/videos",
    tag = "videos",
    params(ListQuery),
    responses(
        (status = 200, description = "Most recent videos first", body = Vec<MediaAssetResponse>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn list_videos(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<MediaAssetResponse>>, HttpAppError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    let assets = state.assets.list_recent(limit).await?;
    Ok(Json(assets.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v0/videos/{id}",
    tag = "videos",
    params(("id" = Uuid, Path, description = "Video ID")),
    responses(
        (status = 200, description = "Video found", body = MediaAssetResponse),
        (status = 404, description = "Video not found", body = ErrorResponse)
    )
)]
pub async fn get_video(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<MediaAssetResponse>, HttpAppError> {
    let asset = state
        .assets
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Video {} not found", id)))?;
    Ok(Json(asset.into()))
}
