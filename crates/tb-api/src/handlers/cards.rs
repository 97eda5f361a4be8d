//! Card handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use tb_core::traits::Id;
use tb_models::{Assignment, Card, Priority};
use tb_workflow::{CardDetail, CardPatch, CardSummary, NewCard};

use crate::error::ApiResult;
use crate::state::{AppState, AuthenticatedUser};

#[derive(Debug, Deserialize)]
pub struct CreateCardRequest {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub estimated_hours: Option<f64>,
    pub due_date: Option<chrono::NaiveDate>,
    #[serde(default)]
    pub assignee_ids: Vec<Id>,
    #[serde(default)]
    pub subtasks: Vec<String>,
}

/// POST /api/v1/boards/:board_id/cards
pub async fn create_card(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(board_id): Path<Id>,
    Json(body): Json<CreateCardRequest>,
) -> ApiResult<(StatusCode, Json<CardDetail>)> {
    let detail = state
        .cards()
        .create(
            board_id,
            NewCard {
                title: body.title,
                description: body.description,
                priority: body.priority,
                estimated_hours: body.estimated_hours,
                due_date: body.due_date,
                assignee_ids: body.assignee_ids,
                subtask_titles: body.subtasks,
            },
            &*user,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// GET /api/v1/boards/:board_id/cards
pub async fn list_cards(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(board_id): Path<Id>,
) -> ApiResult<Json<Vec<CardSummary>>> {
    Ok(Json(state.cards().list_by_board(board_id, &*user).await?))
}

/// GET /api/v1/cards/:id
pub async fn get_card(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(card_id): Path<Id>,
) -> ApiResult<Json<CardDetail>> {
    Ok(Json(state.cards().detail(card_id).await?))
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateCardRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<chrono::NaiveDate>,
    pub priority: Option<Priority>,
    pub estimated_hours: Option<f64>,
}

/// PUT /api/v1/cards/:id
pub async fn update_card(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(card_id): Path<Id>,
    Json(body): Json<UpdateCardRequest>,
) -> ApiResult<Json<Card>> {
    let patch = CardPatch {
        title: body.title,
        description: body.description,
        due_date: body.due_date,
        priority: body.priority,
        estimated_hours: body.estimated_hours,
    };
    Ok(Json(state.cards().update(card_id, patch).await?))
}

/// PUT /api/v1/cards/:id/move-to-review
pub async fn move_to_review(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(card_id): Path<Id>,
) -> ApiResult<Json<Card>> {
    Ok(Json(state.cards().move_to_review(card_id, &*user).await?))
}

/// PUT /api/v1/cards/:id/approve
pub async fn approve_card(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(card_id): Path<Id>,
) -> ApiResult<Json<Card>> {
    Ok(Json(state.cards().approve(card_id, &*user).await?))
}

/// PUT /api/v1/cards/:id/revise
pub async fn revise_card(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(card_id): Path<Id>,
) -> ApiResult<Json<Card>> {
    Ok(Json(state.cards().revise(card_id, &*user).await?))
}

#[derive(Debug, Deserialize)]
pub struct ReassignRequest {
    pub user_ids: Vec<Id>,
}

/// PUT /api/v1/cards/:id/assignees
pub async fn reassign_card(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(card_id): Path<Id>,
    Json(body): Json<ReassignRequest>,
) -> ApiResult<Json<Vec<Assignment>>> {
    Ok(Json(state.cards().reassign(card_id, body.user_ids).await?))
}
