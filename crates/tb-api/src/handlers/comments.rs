//! Comment handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use tb_core::traits::Id;
use tb_models::Comment;
use tb_workflow::{CommentThread, NewComment};

use crate::error::ApiResult;
use crate::state::{AppState, AuthenticatedUser};

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub text: String,
    pub parent_comment_id: Option<Id>,
}

/// POST /api/v1/cards/:card_id/comments
pub async fn create_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(card_id): Path<Id>,
    Json(body): Json<CreateCommentRequest>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let comment = state
        .comments()
        .create(
            card_id,
            NewComment {
                text: body.text,
                parent_comment_id: body.parent_comment_id,
            },
            &*user,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// GET /api/v1/cards/:card_id/comments
pub async fn list_comments(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(card_id): Path<Id>,
) -> ApiResult<Json<Vec<CommentThread>>> {
    Ok(Json(state.comments().list_by_card(card_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommentRequest {
    pub text: String,
}

/// PUT /api/v1/comments/:id
pub async fn update_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(comment_id): Path<Id>,
    Json(body): Json<UpdateCommentRequest>,
) -> ApiResult<Json<Comment>> {
    Ok(Json(
        state.comments().update(comment_id, body.text, &*user).await?,
    ))
}

/// DELETE /api/v1/comments/:id
pub async fn delete_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(comment_id): Path<Id>,
) -> ApiResult<StatusCode> {
    state.comments().delete(comment_id, &*user).await?;
    Ok(StatusCode::NO_CONTENT)
}
