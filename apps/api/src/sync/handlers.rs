//! Axum route handlers for the sync endpoints (primary system → mirror).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::state::AppState;
use crate::store::JOB_NOT_FOUND;
use crate::sync::extract::SyncJson;
use crate::sync::payloads::{JobPayload, ReviewPayload, UserPayload};
use crate::sync::validation::{
    validate_job_changes, validate_new_job, validate_new_review, validate_new_user,
    validate_user_changes,
};

type SyncResponse = (StatusCode, Json<Value>);

fn ok(status: StatusCode) -> SyncResponse {
    (status, Json(json!({ "ok": true })))
}

/// POST /sync/jobs/
pub async fn handle_create_job(
    State(state): State<AppState>,
    SyncJson(payload): SyncJson<JobPayload>,
) -> Result<SyncResponse, AppError> {
    let job = validate_new_job(payload)?;
    state.store.create_job(job).await?;
    Ok(ok(StatusCode::CREATED))
}

/// PUT /sync/jobs/:id
///
/// The path carries the local job id; anything that is not an integer cannot
/// name a job and is reported as not found.
pub async fn handle_update_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
    SyncJson(payload): SyncJson<JobPayload>,
) -> Result<SyncResponse, AppError> {
    let id: i32 = id
        .parse()
        .map_err(|_| AppError::NotFound(JOB_NOT_FOUND.to_string()))?;
    let changes = validate_job_changes(payload)?;
    state.store.update_job(id, changes).await?;
    Ok(ok(StatusCode::OK))
}

/// POST /sync/users/
pub async fn handle_create_user(
    State(state): State<AppState>,
    SyncJson(payload): SyncJson<UserPayload>,
) -> Result<SyncResponse, AppError> {
    let user = validate_new_user(payload)?;
    state.store.create_user(user).await?;
    Ok(ok(StatusCode::CREATED))
}

/// PUT /sync/users/:uid
pub async fn handle_update_user(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    SyncJson(payload): SyncJson<UserPayload>,
) -> Result<SyncResponse, AppError> {
    let changes = validate_user_changes(payload)?;
    state.store.update_user(&uid, changes).await?;
    Ok(ok(StatusCode::OK))
}

/// POST /sync/reviews/
pub async fn handle_create_review(
    State(state): State<AppState>,
    SyncJson(payload): SyncJson<ReviewPayload>,
) -> Result<SyncResponse, AppError> {
    let review = validate_new_review(payload)?;
    state.store.create_review(review).await?;
    Ok(ok(StatusCode::CREATED))
}

/// DELETE /sync/reviews/:id
pub async fn handle_delete_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<SyncResponse, AppError> {
    state.store.delete_review(&id).await?;
    Ok(ok(StatusCode::OK))
}
