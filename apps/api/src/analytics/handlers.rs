use axum::{extract::State, Json};
use serde::Serialize;

use crate::analytics::stats::{
    review_stats, user_stats, worker_stats, ReviewStats, UserStats, WorkerStats,
};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

/// GET /analytics/users/
pub async fn handle_user_stats(
    State(state): State<AppState>,
) -> Result<Json<Envelope<UserStats>>, AppError> {
    let raw = state.store.user_aggregates().await?;
    Ok(Json(Envelope {
        success: true,
        data: user_stats(raw),
    }))
}

/// GET /analytics/workers/
pub async fn handle_worker_stats(
    State(state): State<AppState>,
) -> Result<Json<WorkerStats>, AppError> {
    let raw = state.store.worker_aggregates().await?;
    Ok(Json(worker_stats(raw)?))
}

/// GET /analytics/reviews/
pub async fn handle_review_stats(
    State(state): State<AppState>,
) -> Result<Json<ReviewStats>, AppError> {
    let raw = state.store.review_aggregates().await?;
    Ok(Json(review_stats(raw)?))
}
