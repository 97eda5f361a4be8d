//! Time-log handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use tb_core::traits::Id;
use tb_models::TimeLog;

use crate::error::ApiResult;
use crate::state::{AppState, AuthenticatedUser};

#[derive(Debug, Deserialize)]
pub struct StartTimeLogRequest {
    pub subtask_id: Id,
}

/// POST /api/v1/time-logs/start
pub async fn start_time_log(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<StartTimeLogRequest>,
) -> ApiResult<(StatusCode, Json<TimeLog>)> {
    let log = state.ledger().start(user.id, body.subtask_id).await?;
    Ok((StatusCode::CREATED, Json(log)))
}

#[derive(Debug, Deserialize)]
pub struct EndTimeLogRequest {
    pub subtask_id: Id,
    pub description: Option<String>,
}

/// PUT /api/v1/time-logs/end
pub async fn end_time_log(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<EndTimeLogRequest>,
) -> ApiResult<Json<TimeLog>> {
    let log = state
        .ledger()
        .end(user.id, body.subtask_id, body.description)
        .await?;
    Ok(Json(log))
}
