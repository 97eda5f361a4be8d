//! Project membership and per-user work status

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tb_core::traits::{Id, Identifiable};

/// What the user is currently doing, system-wide.
///
/// Reset to `Available` for every member when their project is approved.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserTaskStatus {
    #[default]
    Available,
    Working,
}

/// (project, user, role) association; the role drives authorization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMember {
    pub id: Option<Id>,
    pub project_id: Id,
    pub user_id: Id,
    pub role: String,
    pub joined_at: Option<DateTime<Utc>>,
}

impl ProjectMember {
    pub fn new(project_id: Id, user_id: Id, role: impl Into<String>) -> Self {
        Self {
            id: None,
            project_id,
            user_id,
            role: role.into(),
            joined_at: None,
        }
    }
}

impl Identifiable for ProjectMember {
    fn id(&self) -> Option<Id> {
        self.id
    }
}
