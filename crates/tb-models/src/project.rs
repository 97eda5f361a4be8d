//! Project model
//!
//! A project owns zero-or-one board and its member list. Lifecycle:
//! created → in_progress (board created) → review (leader requests)
//! → done (admin approves) or back to in_progress (admin rejects).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tb_core::traits::{Id, Identifiable, Timestamped};
use validator::Validate;

use crate::status::ProjectStatus;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Project {
    pub id: Option<Id>,

    #[validate(length(min = 1, max = 255))]
    pub name: String,

    pub description: Option<String>,

    pub status: ProjectStatus,

    pub created_by: Id,

    pub deadline: Option<NaiveDate>,

    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Project {
    pub fn new(name: impl Into<String>, created_by: Id) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: None,
            status: ProjectStatus::InProgress,
            created_by,
            deadline: None,
            created_at: None,
            updated_at: None,
        }
    }
}

impl Identifiable for Project {
    fn id(&self) -> Option<Id> {
        self.id
    }
}

impl Timestamped for Project {
    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

/// A logged review decision on a project (approve or reject, with reason)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectReview {
    pub id: Option<Id>,
    pub project_id: Id,
    pub reviewed_by: Id,
    pub review_status: crate::status::ReviewDecision,
    pub reason: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}
