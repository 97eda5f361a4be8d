//! Subtask handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use tb_core::traits::Id;
use tb_models::{ReviewDecision, Subtask};
use tb_workflow::NewSubtask;

use crate::error::ApiResult;
use crate::state::{AppState, AuthenticatedUser};

#[derive(Debug, Deserialize)]
pub struct CreateSubtaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub estimated_hours: Option<f64>,
    pub assigned_to: Option<Id>,
}

/// POST /api/v1/cards/:card_id/subtasks
pub async fn create_subtask(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(card_id): Path<Id>,
    Json(body): Json<CreateSubtaskRequest>,
) -> ApiResult<(StatusCode, Json<Subtask>)> {
    let subtask = state
        .subtasks()
        .create(
            card_id,
            NewSubtask {
                title: body.title,
                description: body.description,
                estimated_hours: body.estimated_hours,
                assigned_to: body.assigned_to,
            },
            &*user,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(subtask)))
}

/// GET /api/v1/cards/:card_id/subtasks
pub async fn list_subtasks(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(card_id): Path<Id>,
) -> ApiResult<Json<Vec<Subtask>>> {
    Ok(Json(state.subtasks().list_by_card(card_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct AssignSubtaskRequest {
    pub user_id: Id,
}

/// PUT /api/v1/subtasks/:id/assign
pub async fn assign_subtask(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(subtask_id): Path<Id>,
    Json(body): Json<AssignSubtaskRequest>,
) -> ApiResult<Json<Subtask>> {
    Ok(Json(state.subtasks().assign(subtask_id, body.user_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct ReviewSubtaskRequest {
    pub decision: ReviewDecision,
    pub reason: Option<String>,
}

/// PUT /api/v1/subtasks/:id/review
pub async fn review_subtask(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(subtask_id): Path<Id>,
    Json(body): Json<ReviewSubtaskRequest>,
) -> ApiResult<Json<Subtask>> {
    Ok(Json(
        state
            .subtasks()
            .review(subtask_id, body.decision, body.reason, &*user)
            .await?,
    ))
}
