//! Announcement API endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use super::{created, parse_body, success, ApiResult};
use crate::models::{Announcement, CreateAnnouncementRequest, UpdateAnnouncementRequest};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct AnnouncementDeleted {
    pub id: String,
    pub removed: usize,
}

/// GET /api/announcements - Newest first.
pub async fn list_announcements(State(state): State<AppState>) -> ApiResult<Vec<Announcement>> {
    success(state.coordinator.list_announcements().await?)
}

/// POST /api/announcements
pub async fn create_announcement(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Announcement> {
    let request: CreateAnnouncementRequest = parse_body(payload)?;
    created(state.coordinator.create_announcement(request).await?)
}

/// PUT /api/announcements/{id}
pub async fn update_announcement(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Announcement> {
    let request: UpdateAnnouncementRequest = parse_body(payload)?;
    success(state.coordinator.update_announcement(&id, request).await?)
}

/// DELETE /api/announcements/{id}
pub async fn delete_announcement(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<AnnouncementDeleted> {
    let removed = state.coordinator.delete_announcement(&id).await?;
    success(AnnouncementDeleted { id, removed })
}
