//! API routes

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use serde::Serialize;

use crate::handlers::{analytics, blockers, cards, comments, projects, subtasks, time_logs, ws};
use crate::state::AppState;

/// Create the complete application router
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", api_v1_router())
        .route("/ws", get(ws::upgrade))
        .route("/health", get(health))
}

fn api_v1_router() -> Router<AppState> {
    Router::new()
        .nest("/projects", projects_router())
        .nest("/boards", boards_router())
        .nest("/cards", cards_router())
        .nest("/subtasks", subtasks_router())
        .nest("/comments", comments_router())
        .nest("/blockers", blockers_router())
        .nest("/time-logs", time_logs_router())
        .nest("/analytics", analytics_router())
}

fn projects_router() -> Router<AppState> {
    Router::new()
        .route("/", get(projects::list_projects))
        .route("/", post(projects::create_project))
        .route("/:id", get(projects::get_project))
        .route("/:id/board", post(projects::create_board))
        .route("/board/:board_id/review-request", put(projects::request_review))
        .route("/:id/approve", put(projects::approve_project))
        .route("/:id/reject", put(projects::reject_project))
}

fn boards_router() -> Router<AppState> {
    Router::new()
        .route("/:id", get(projects::get_board))
        .route("/:id", put(projects::rename_board))
        .route("/:board_id/cards", get(cards::list_cards))
        .route("/:board_id/cards", post(cards::create_card))
}

fn cards_router() -> Router<AppState> {
    Router::new()
        .route("/:id", get(cards::get_card))
        .route("/:id", put(cards::update_card))
        .route("/:id/move-to-review", put(cards::move_to_review))
        .route("/:id/approve", put(cards::approve_card))
        .route("/:id/revise", put(cards::revise_card))
        .route("/:id/assignees", put(cards::reassign_card))
        .route("/:card_id/subtasks", get(subtasks::list_subtasks))
        .route("/:card_id/subtasks", post(subtasks::create_subtask))
        .route("/:card_id/comments", get(comments::list_comments))
        .route("/:card_id/comments", post(comments::create_comment))
        .route("/:card_id/blockers", get(blockers::list_card_blockers))
}

fn subtasks_router() -> Router<AppState> {
    Router::new()
        .route("/:id/assign", put(subtasks::assign_subtask))
        .route("/:id/review", put(subtasks::review_subtask))
        .route("/:subtask_id/blockers", get(blockers::list_subtask_blockers))
}

fn comments_router() -> Router<AppState> {
    Router::new()
        .route("/:id", put(comments::update_comment))
        .route("/:id", delete(comments::delete_comment))
}

fn blockers_router() -> Router<AppState> {
    Router::new()
        .route("/", post(blockers::report_blocker))
        .route("/:id/solve", put(blockers::solve_blocker))
}

fn time_logs_router() -> Router<AppState> {
    Router::new()
        .route("/start", post(time_logs::start_time_log))
        .route("/end", put(time_logs::end_time_log))
}

fn analytics_router() -> Router<AppState> {
    Router::new()
        .route("/boards/:board_id/refresh", post(analytics::refresh_board))
        .route("/global/refresh", post(analytics::refresh_global))
}

async fn health() -> axum::Json<Health> {
    axum::Json(Health { status: "ok" })
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}
