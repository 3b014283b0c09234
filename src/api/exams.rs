//! Exam API endpoints.
//!
//! `/exams` and `/college-exams` share handlers; they differ in the namespace
//! new records go to and the order in which namespaces are probed by identity.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde_json::{Map, Value};

use super::{created, parse_body, success, ApiResult};
use crate::errors::AppError;
use crate::models::{
    ExamCreated, ExamDeleted, ExamList, ExamPayload, ExamRecord, ExamUpdated, GenerateRequest,
};
use crate::registry::{ExamNamespace, COLLEGE_EXAM_LOOKUP_ORDER, EXAM_LOOKUP_ORDER};
use crate::AppState;

async fn create_in(
    state: &AppState,
    namespace: ExamNamespace,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<ExamCreated> {
    let request: ExamPayload = parse_body(payload)?;
    created(state.coordinator.create_exam(namespace, request).await?)
}

async fn update_in(
    state: &AppState,
    identity: &str,
    order: &[ExamNamespace],
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<ExamUpdated> {
    let request: ExamPayload = parse_body(payload)?;
    success(state.coordinator.update_exam(identity, order, request).await?)
}

/// GET /api/exams - List standalone exams.
pub async fn list_exams(State(state): State<AppState>) -> ApiResult<ExamList> {
    success(state.coordinator.list_exams(ExamNamespace::Standalone).await?)
}

/// POST /api/exams - Create a standalone exam.
pub async fn create_exam(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<ExamCreated> {
    create_in(&state, ExamNamespace::Standalone, payload).await
}

/// GET /api/exams/{uuid}
pub async fn get_exam(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
) -> ApiResult<ExamRecord> {
    success(state.coordinator.get_exam(&uuid, &EXAM_LOOKUP_ORDER).await?)
}

/// PUT /api/exams/{uuid}
pub async fn update_exam(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<ExamUpdated> {
    update_in(&state, &uuid, &EXAM_LOOKUP_ORDER, payload).await
}

/// DELETE /api/exams/{uuid}
pub async fn delete_exam(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
) -> ApiResult<ExamDeleted> {
    success(state.coordinator.delete_exam(&uuid, &EXAM_LOOKUP_ORDER).await?)
}

/// GET /api/college-exams - List college-specific exams.
pub async fn list_college_exams(State(state): State<AppState>) -> ApiResult<ExamList> {
    success(
        state
            .coordinator
            .list_exams(ExamNamespace::CollegeSpecific)
            .await?,
    )
}

/// POST /api/college-exams - Create a college-specific exam.
pub async fn create_college_exam(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<ExamCreated> {
    create_in(&state, ExamNamespace::CollegeSpecific, payload).await
}

/// GET /api/college-exams/{uuid}
pub async fn get_college_exam(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
) -> ApiResult<ExamRecord> {
    success(
        state
            .coordinator
            .get_exam(&uuid, &COLLEGE_EXAM_LOOKUP_ORDER)
            .await?,
    )
}

/// PUT /api/college-exams/{uuid}
pub async fn update_college_exam(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<ExamUpdated> {
    update_in(&state, &uuid, &COLLEGE_EXAM_LOOKUP_ORDER, payload).await
}

/// DELETE /api/college-exams/{uuid}
pub async fn delete_college_exam(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
) -> ApiResult<ExamDeleted> {
    success(
        state
            .coordinator
            .delete_exam(&uuid, &COLLEGE_EXAM_LOOKUP_ORDER)
            .await?,
    )
}

/// POST /api/exams/generate - Draft exam detail content from free text.
pub async fn generate_exam_content(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Map<String, Value>> {
    let request: GenerateRequest = parse_body(payload)?;

    let generator = state.generator.as_ref().ok_or_else(|| {
        AppError::Generation("Content generation is not configured".to_string())
    })?;

    success(
        generator
            .generate(request.topic_name.as_deref(), request.raw_text.as_deref())
            .await?,
    )
}
