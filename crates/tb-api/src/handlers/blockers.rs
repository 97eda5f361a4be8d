//! Blocker handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use tb_core::traits::Id;
use tb_models::{Blocker, BlockerTarget};

use crate::error::ApiResult;
use crate::state::{AppState, AuthenticatedUser};

#[derive(Debug, Deserialize)]
pub struct ReportBlockerRequest {
    /// `{"type": "card", "id": 7}` or `{"type": "subtask", "id": 9}`
    pub target: BlockerTarget,
    pub reason: String,
}

/// POST /api/v1/blockers
pub async fn report_blocker(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<ReportBlockerRequest>,
) -> ApiResult<(StatusCode, Json<Blocker>)> {
    let blocker = state
        .blockers()
        .report(body.target, body.reason, &*user)
        .await?;
    Ok((StatusCode::CREATED, Json(blocker)))
}

#[derive(Debug, Deserialize)]
pub struct SolveBlockerRequest {
    pub solution: String,
}

/// PUT /api/v1/blockers/:id/solve
pub async fn solve_blocker(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(blocker_id): Path<Id>,
    Json(body): Json<SolveBlockerRequest>,
) -> ApiResult<Json<Blocker>> {
    Ok(Json(
        state.blockers().solve(blocker_id, body.solution, &*user).await?,
    ))
}

/// GET /api/v1/cards/:card_id/blockers
pub async fn list_card_blockers(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(card_id): Path<Id>,
) -> ApiResult<Json<Vec<Blocker>>> {
    Ok(Json(state.blockers().list_for_card(card_id).await?))
}

/// GET /api/v1/subtasks/:subtask_id/blockers
pub async fn list_subtask_blockers(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(subtask_id): Path<Id>,
) -> ApiResult<Json<Vec<Blocker>>> {
    Ok(Json(state.blockers().list_for_subtask(subtask_id).await?))
}
