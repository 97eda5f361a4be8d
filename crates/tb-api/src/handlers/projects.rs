//! Project and board handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use tb_core::traits::Id;
use tb_models::{Board, Project};
use tb_workflow::{NewProject, ProjectDetail, WorkflowStore};

use crate::error::ApiResult;
use crate::state::{AppState, AuthenticatedUser};

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: Option<String>,
    pub deadline: Option<chrono::NaiveDate>,
    #[serde(default)]
    pub members: Vec<MemberSpec>,
}

#[derive(Debug, Deserialize)]
pub struct MemberSpec {
    pub user_id: Id,
    pub role: String,
}

/// POST /api/v1/projects
pub async fn create_project(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<ProjectDetail>)> {
    let detail = state
        .projects()
        .create(
            NewProject {
                name: body.name,
                description: body.description,
                deadline: body.deadline,
                members: body
                    .members
                    .into_iter()
                    .map(|m| (m.user_id, m.role))
                    .collect(),
            },
            &*user,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// GET /api/v1/projects
pub async fn list_projects(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> ApiResult<Json<Vec<Project>>> {
    Ok(Json(state.projects().list().await?))
}

/// GET /api/v1/projects/:id
pub async fn get_project(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<Json<ProjectDetail>> {
    Ok(Json(state.projects().detail(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct CreateBoardRequest {
    pub name: String,
}

/// POST /api/v1/projects/:id/board — idempotent
pub async fn create_board(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(project_id): Path<Id>,
    Json(body): Json<CreateBoardRequest>,
) -> ApiResult<Json<Board>> {
    Ok(Json(
        state.projects().create_board(project_id, body.name).await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct RenameBoardRequest {
    pub name: String,
}

/// PUT /api/v1/boards/:id
pub async fn rename_board(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(board_id): Path<Id>,
    Json(body): Json<RenameBoardRequest>,
) -> ApiResult<Json<Board>> {
    Ok(Json(
        state.projects().rename_board(board_id, body.name).await?,
    ))
}

/// GET /api/v1/boards/:id
pub async fn get_board(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(board_id): Path<Id>,
) -> ApiResult<Json<Board>> {
    Ok(Json(state.store.board(board_id).await?))
}

/// PUT /api/v1/projects/board/:board_id/review-request
pub async fn request_review(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(board_id): Path<Id>,
) -> ApiResult<Json<Project>> {
    Ok(Json(
        state.projects().request_review(board_id, &*user).await?,
    ))
}

/// PUT /api/v1/projects/:id/approve
pub async fn approve_project(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(project_id): Path<Id>,
) -> ApiResult<Json<Project>> {
    Ok(Json(state.projects().approve(project_id, &*user).await?))
}

#[derive(Debug, Deserialize)]
pub struct RejectProjectRequest {
    pub reason: String,
}

/// PUT /api/v1/projects/:id/reject
pub async fn reject_project(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(project_id): Path<Id>,
    Json(body): Json<RejectProjectRequest>,
) -> ApiResult<Json<Project>> {
    Ok(Json(
        state.projects().reject(project_id, body.reason, &*user).await?,
    ))
}
