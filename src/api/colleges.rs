//! College API endpoints.

use std::collections::BTreeMap;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use serde_json::Value;

use super::{created, parse_body, success, ApiResult};
use crate::db::Row;
use crate::errors::AppError;
use crate::models::{
    CollegeCreated, CollegeDeleted, CollegeRecord, CollegeUpdated, CreateCollegeRequest,
    ListCollegesQuery, UpdateCollegeRequest,
};
use crate::AppState;

/// POST /api/colleges - Create a college in its category table and the detail table.
pub async fn create_college(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<CollegeCreated> {
    let request: CreateCollegeRequest = parse_body(payload)?;
    created(state.coordinator.create_college(request).await?)
}

/// GET /api/colleges?category= - List summary rows of one category.
pub async fn list_colleges(
    State(state): State<AppState>,
    Query(query): Query<ListCollegesQuery>,
) -> ApiResult<Vec<Row>> {
    let category = query
        .category
        .ok_or_else(|| AppError::Validation("category query parameter is required".to_string()))?;
    success(state.coordinator.list_colleges(&category).await?)
}

/// GET /api/colleges/all - Summary rows of every category.
pub async fn list_all_colleges(
    State(state): State<AppState>,
) -> ApiResult<BTreeMap<String, Vec<Row>>> {
    success(state.coordinator.list_all_colleges().await?)
}

/// GET /api/colleges/{uuid}/{category} - Get both halves of a college.
pub async fn get_college(
    State(state): State<AppState>,
    Path((uuid, category)): Path<(String, String)>,
) -> ApiResult<CollegeRecord> {
    success(state.coordinator.get_college(&uuid, &category).await?)
}

/// PUT /api/colleges/{uuid}/{category} - Replace detail and summary data.
pub async fn update_college(
    State(state): State<AppState>,
    Path((uuid, category)): Path<(String, String)>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<CollegeUpdated> {
    let request: UpdateCollegeRequest = parse_body(payload)?;
    success(
        state
            .coordinator
            .update_college(&uuid, &category, request)
            .await?,
    )
}

/// DELETE /api/colleges/{uuid}/{category} - Delete a college from both tables.
pub async fn delete_college(
    State(state): State<AppState>,
    Path((uuid, category)): Path<(String, String)>,
) -> ApiResult<CollegeDeleted> {
    success(state.coordinator.delete_college(&uuid, &category).await?)
}
