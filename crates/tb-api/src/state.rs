//! Application state and extractors

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use tb_auth::{CurrentUser, JwtService};
use tb_realtime::broadcast::{Broadcaster, EventPublisher};
use tb_workflow::{
    AnalyticsRelay, BlockerFlow, CardWorkflow, CommentFlow, ProjectFlow, ReportingClient,
    SubtaskFlow, TimeLedger, WorkflowStore,
};

use crate::error::ApiError;

/// Shared state injected into every handler.
///
/// The store, publisher, and broadcaster are constructed once in the server
/// binary; workflow facades are cheap Arc-clone bundles built per call.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn WorkflowStore>,
    pub publisher: Arc<dyn EventPublisher>,
    pub broadcaster: Arc<Broadcaster>,
    pub reporting: Arc<dyn ReportingClient>,
    pub jwt: Arc<JwtService>,
    /// Outbound queue bound per realtime connection
    pub realtime_send_buffer: usize,
}

impl AppState {
    pub fn projects(&self) -> ProjectFlow {
        ProjectFlow::new(self.store.clone(), self.publisher.clone())
    }

    pub fn cards(&self) -> CardWorkflow {
        CardWorkflow::new(self.store.clone(), self.publisher.clone())
    }

    pub fn subtasks(&self) -> SubtaskFlow {
        SubtaskFlow::new(self.store.clone(), self.publisher.clone())
    }

    pub fn comments(&self) -> CommentFlow {
        CommentFlow::new(self.store.clone(), self.publisher.clone())
    }

    pub fn blockers(&self) -> BlockerFlow {
        BlockerFlow::new(self.store.clone(), self.publisher.clone())
    }

    pub fn ledger(&self) -> TimeLedger {
        TimeLedger::new(self.store.clone(), self.publisher.clone())
    }

    pub fn analytics(&self) -> AnalyticsRelay {
        AnalyticsRelay::new(self.reporting.clone(), self.publisher.clone())
    }
}

/// Bearer-token extractor producing the resolved actor
pub struct AuthenticatedUser(pub CurrentUser);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(tb_auth::JwtError::Missing)?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(tb_auth::JwtError::Missing)?;

        let claims = app_state.jwt.verify(token)?;
        let user = CurrentUser::from_claims(&claims)?;
        Ok(AuthenticatedUser(user))
    }
}

impl std::ops::Deref for AuthenticatedUser {
    type Target = CurrentUser;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
