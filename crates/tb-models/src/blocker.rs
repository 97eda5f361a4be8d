//! Blocker model
//!
//! A reported impediment against a card or a subtask. Created unresolved,
//! transitions once to resolved, never reopened.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tb_core::traits::{Id, Identifiable};

/// The entity a blocker is reported against.
///
/// Tagged variant instead of a string discriminator: the report/solve logic
/// is written once, parametrized over the target.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum BlockerTarget {
    Card(Id),
    Subtask(Id),
}

impl BlockerTarget {
    pub fn target_id(self) -> Id {
        match self {
            BlockerTarget::Card(id) | BlockerTarget::Subtask(id) => id,
        }
    }

    pub fn kind(self) -> &'static str {
        match self {
            BlockerTarget::Card(_) => "card",
            BlockerTarget::Subtask(_) => "subtask",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blocker {
    pub id: Option<Id>,

    pub target: BlockerTarget,

    pub reason: String,

    pub reported_by: Id,

    pub is_resolved: bool,

    pub solution: Option<String>,

    pub resolved_by: Option<Id>,

    pub resolved_at: Option<DateTime<Utc>>,

    pub created_at: Option<DateTime<Utc>>,
}

impl Blocker {
    pub fn new(target: BlockerTarget, reason: impl Into<String>, reported_by: Id) -> Self {
        Self {
            id: None,
            target,
            reason: reason.into(),
            reported_by,
            is_resolved: false,
            solution: None,
            resolved_by: None,
            resolved_at: None,
            created_at: None,
        }
    }
}

impl Identifiable for Blocker {
    fn id(&self) -> Option<Id> {
        self.id
    }
}
