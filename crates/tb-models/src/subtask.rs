//! Subtask model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tb_core::traits::{Id, Identifiable, Timestamped};
use validator::Validate;

use crate::status::{ReviewDecision, SubtaskStatus};

/// A decomposed unit of work belonging to exactly one card.
///
/// Invariant (enforced by the time ledger): a user has at most one subtask
/// with status in_progress at a time.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Subtask {
    pub id: Option<Id>,

    pub card_id: Id,

    #[validate(length(min = 1, max = 255))]
    pub title: String,

    pub description: Option<String>,

    pub status: SubtaskStatus,

    pub assigned_to: Option<Id>,

    /// Ordering within the card, 1-based
    pub position: i32,

    pub estimated_hours: Option<f64>,

    /// Refreshed from the time-log aggregate each time a log closes
    pub actual_hours: Option<f64>,

    /// Last review decision, if the subtask has been reviewed
    pub review_status: Option<ReviewDecision>,

    pub created_by: Id,

    /// User who moved the subtask into review
    pub completed_by: Option<Id>,

    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Subtask {
    pub fn new(card_id: Id, title: impl Into<String>, created_by: Id) -> Self {
        Self {
            id: None,
            card_id,
            title: title.into(),
            description: None,
            status: SubtaskStatus::Todo,
            assigned_to: None,
            position: 0,
            estimated_hours: None,
            actual_hours: None,
            review_status: None,
            created_by,
            completed_by: None,
            created_at: None,
            updated_at: None,
        }
    }
}

impl Identifiable for Subtask {
    fn id(&self) -> Option<Id> {
        self.id
    }
}

impl Timestamped for Subtask {
    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}
