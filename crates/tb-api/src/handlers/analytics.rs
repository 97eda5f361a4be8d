//! Analytics relay handlers
//!
//! Boundary only: fetch a fresh snapshot from the reporting collaborator
//! and republish it to the analytics rooms.

use axum::{
    extract::{Path, State},
    Json,
};

use tb_core::traits::Id;

use crate::error::ApiResult;
use crate::state::{AppState, AuthenticatedUser};

/// POST /api/v1/analytics/boards/:board_id/refresh
pub async fn refresh_board(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(board_id): Path<Id>,
) -> ApiResult<Json<serde_json::Value>> {
    Ok(Json(state.analytics().refresh_board(board_id).await?))
}

/// POST /api/v1/analytics/global/refresh
pub async fn refresh_global(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> ApiResult<Json<serde_json::Value>> {
    Ok(Json(state.analytics().refresh_global().await?))
}
