//! HTTP surface tests against the in-memory store.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use tower::ServiceExt;

use tb_auth::{JwtService, Role};
use tb_core::error::TbResult;
use tb_core::traits::Id;
use tb_realtime::broadcast::{Broadcaster, RecordingPublisher};
use tb_realtime::registry::RoomRegistry;
use tb_workflow::{MemoryStore, ReportingClient};

use tb_api::{router, AppState};

struct StubReporting;

#[async_trait]
impl ReportingClient for StubReporting {
    async fn board_snapshot(&self, board_id: Id) -> TbResult<serde_json::Value> {
        Ok(serde_json::json!({ "board_id": board_id, "cards": 0 }))
    }

    async fn global_snapshot(&self) -> TbResult<serde_json::Value> {
        Ok(serde_json::json!({ "projects": 0 }))
    }
}

struct TestApp {
    state: AppState,
    jwt: Arc<JwtService>,
}

fn test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let publisher = Arc::new(RecordingPublisher::new());
    let registry = Arc::new(RoomRegistry::new(16));
    let jwt = Arc::new(JwtService::new(b"test-secret", 3600));
    let state = AppState {
        store,
        publisher,
        broadcaster: Arc::new(Broadcaster::new(registry)),
        reporting: Arc::new(StubReporting),
        jwt: jwt.clone(),
        realtime_send_buffer: 16,
    };
    TestApp { state, jwt }
}

impl TestApp {
    fn token(&self, user_id: Id, role: Role) -> String {
        self.jwt.issue(user_id, role).unwrap()
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let app = router().with_state(self.state.clone());
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }
}

#[tokio::test]
async fn test_health_is_public() {
    let app = test_app();
    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = test_app();
    let (status, body) = app.call(Method::GET, "/api/v1/projects", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorized");
}

#[tokio::test]
async fn test_garbage_token_is_unauthorized() {
    let app = test_app();
    let (status, _) = app
        .call(Method::GET, "/api/v1/projects", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_project_board_card_round_trip() {
    let app = test_app();
    let lead = app.token(1, Role::TeamLead);

    let (status, project) = app
        .call(
            Method::POST,
            "/api/v1/projects",
            Some(&lead),
            Some(serde_json::json!({
                "name": "Launch prep",
                "members": [{"user_id": 7, "role": "member"}]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let project_id = project["project"]["id"].as_i64().unwrap();

    let (status, board) = app
        .call(
            Method::POST,
            &format!("/api/v1/projects/{project_id}/board"),
            Some(&lead),
            Some(serde_json::json!({"name": "Sprint board"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let board_id = board["id"].as_i64().unwrap();

    let (status, card) = app
        .call(
            Method::POST,
            &format!("/api/v1/boards/{board_id}/cards"),
            Some(&lead),
            Some(serde_json::json!({
                "title": "Ship the thing",
                "assignee_ids": [7],
                "subtasks": ["Write docs"]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(card["card"]["title"], "Ship the thing");
    assert_eq!(card["subtasks"].as_array().unwrap().len(), 1);

    let (status, cards) = app
        .call(
            Method::GET,
            &format!("/api/v1/boards/{board_id}/cards"),
            Some(&lead),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cards.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_time_log_start_and_end() {
    let app = test_app();
    let lead = app.token(1, Role::TeamLead);
    let dev = app.token(7, Role::Member);

    let (_, project) = app
        .call(
            Method::POST,
            "/api/v1/projects",
            Some(&lead),
            Some(serde_json::json!({
                "name": "Tracked work",
                "members": [{"user_id": 7, "role": "member"}]
            })),
        )
        .await;
    let project_id = project["project"]["id"].as_i64().unwrap();
    let (_, board) = app
        .call(
            Method::POST,
            &format!("/api/v1/projects/{project_id}/board"),
            Some(&lead),
            Some(serde_json::json!({"name": "Board"})),
        )
        .await;
    let board_id = board["id"].as_i64().unwrap();
    let (_, card) = app
        .call(
            Method::POST,
            &format!("/api/v1/boards/{board_id}/cards"),
            Some(&lead),
            Some(serde_json::json!({
                "title": "Card",
                "assignee_ids": [7],
                "subtasks": ["Step one"]
            })),
        )
        .await;
    let subtask_id = card["subtasks"][0]["id"].as_i64().unwrap();

    let (status, log) = app
        .call(
            Method::POST,
            "/api/v1/time-logs/start",
            Some(&dev),
            Some(serde_json::json!({"subtask_id": subtask_id})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(log["end_time"].is_null());

    let (status, log) = app
        .call(
            Method::PUT,
            "/api/v1/time-logs/end",
            Some(&dev),
            Some(serde_json::json!({
                "subtask_id": subtask_id,
                "description": "finished step one"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!log["end_time"].is_null());

    // Ending again: no open log remains.
    let (status, _) = app
        .call(
            Method::PUT,
            "/api/v1/time-logs/end",
            Some(&dev),
            Some(serde_json::json!({"subtask_id": subtask_id})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_member_cannot_approve_card() {
    let app = test_app();
    let lead = app.token(1, Role::TeamLead);
    let dev = app.token(7, Role::Member);

    let (_, project) = app
        .call(
            Method::POST,
            "/api/v1/projects",
            Some(&lead),
            Some(serde_json::json!({"name": "Guarded"})),
        )
        .await;
    let project_id = project["project"]["id"].as_i64().unwrap();
    let (_, board) = app
        .call(
            Method::POST,
            &format!("/api/v1/projects/{project_id}/board"),
            Some(&lead),
            Some(serde_json::json!({"name": "Board"})),
        )
        .await;
    let board_id = board["id"].as_i64().unwrap();
    let (_, card) = app
        .call(
            Method::POST,
            &format!("/api/v1/boards/{board_id}/cards"),
            Some(&lead),
            Some(serde_json::json!({"title": "Card", "assignee_ids": [7]})),
        )
        .await;
    let card_id = card["card"]["id"].as_i64().unwrap();

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/api/v1/cards/{card_id}/approve"),
            Some(&dev),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "forbidden");
}

#[tokio::test]
async fn test_analytics_refresh_returns_snapshot() {
    let app = test_app();
    let dev = app.token(7, Role::Member);

    let (status, body) = app
        .call(Method::POST, "/api/v1/analytics/boards/3/refresh", Some(&dev), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["board_id"], 3);
}
