//! Card and assignment models
//!
//! A card is the unit of work on a board. It exclusively owns its subtasks,
//! assignments, blockers, and comments. The assignment links a card to the
//! user responsible for it, with a status independent of the card's own.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tb_core::traits::{Id, Identifiable, Timestamped};
use validator::Validate;

use crate::status::{AssignmentStatus, CardStatus, Priority};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Card {
    pub id: Option<Id>,

    pub board_id: Id,

    #[validate(length(min = 1, max = 255))]
    pub title: String,

    pub description: Option<String>,

    pub status: CardStatus,

    pub priority: Priority,

    pub estimated_hours: Option<f64>,

    /// Set when the card is approved: Σ time-log seconds / 3600, or the
    /// sum of subtask actual_hours when no logs exist
    pub actual_hours: Option<f64>,

    pub due_date: Option<NaiveDate>,

    pub position: i32,

    pub created_by: Id,

    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Card {
    pub fn new(board_id: Id, title: impl Into<String>, created_by: Id) -> Self {
        Self {
            id: None,
            board_id,
            title: title.into(),
            description: None,
            status: CardStatus::Todo,
            priority: Priority::Medium,
            estimated_hours: None,
            actual_hours: None,
            due_date: None,
            position: 0,
            created_by,
            created_at: None,
            updated_at: None,
        }
    }
}

impl Identifiable for Card {
    fn id(&self) -> Option<Id> {
        self.id
    }
}

impl Timestamped for Card {
    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

/// Card-to-user assignment.
///
/// Invariant (enforced by the time ledger): a user holds at most one
/// assignment with status in_progress across the whole system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Option<Id>,
    pub card_id: Id,
    pub user_id: Id,
    pub status: AssignmentStatus,
    pub assigned_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Assignment {
    pub fn new(card_id: Id, user_id: Id) -> Self {
        Self {
            id: None,
            card_id,
            user_id,
            status: AssignmentStatus::Assigned,
            assigned_at: None,
            started_at: None,
            completed_at: None,
        }
    }
}

impl Identifiable for Assignment {
    fn id(&self) -> Option<Id> {
        self.id
    }
}
