//! Domain events delivered over the realtime channel
//!
//! Closed set; every event carries the entity ids a client needs to patch its
//! local state. Serialized as `{"event": "<name>", "data": {...}}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tb_core::traits::Id;
use tb_models::{Blocker, CardStatus, Comment, Subtask, SubtaskStatus};

/// What caused a status-changed event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatusTrigger {
    /// A time log was started
    Start,
    /// A time log was ended
    End,
    /// A reviewer decided on a subtask
    ReviewUpdate,
    /// An explicit move-to-review action
    MoveToReview,
    /// The card was approved
    Approve,
    /// The card was sent back for revision
    Revise,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum DomainEvent {
    #[serde(rename = "subtask_status_changed")]
    SubtaskStatusChanged {
        trigger: StatusTrigger,
        subtask_id: Id,
        card_id: Id,
        status: SubtaskStatus,
        user_id: Option<Id>,
        reviewer_id: Option<Id>,
        at: DateTime<Utc>,
    },

    #[serde(rename = "card_status_changed")]
    CardStatusChanged {
        trigger: StatusTrigger,
        card_id: Id,
        board_id: Id,
        new_status: CardStatus,
        user_id: Option<Id>,
        total_actual_hours: Option<f64>,
        at: DateTime<Utc>,
    },

    #[serde(rename = "subtask_added")]
    SubtaskAdded { subtask: Subtask },

    #[serde(rename = "subtask_assigned")]
    SubtaskAssigned { subtask: Subtask },

    #[serde(rename = "comment:new")]
    CommentNew { comment: Comment },

    #[serde(rename = "comment:updated")]
    CommentUpdated { comment: Comment },

    #[serde(rename = "comment:deleted")]
    CommentDeleted { comment_id: Id, card_id: Id },

    /// Private nudge to a subtask assignee whose subtask was commented on
    #[serde(rename = "subtask_commented")]
    SubtaskCommented {
        subtask_id: Id,
        card_id: Id,
        message: String,
    },

    /// Private nudge to a subtask assignee whose work was rejected
    #[serde(rename = "subtask_rejected")]
    SubtaskRejected {
        subtask_id: Id,
        reason: String,
        comment: Comment,
    },

    #[serde(rename = "blocker_reported")]
    BlockerReported {
        blocker: Blocker,
        board_id: Option<Id>,
        card_id: Option<Id>,
    },

    #[serde(rename = "blocker_solved")]
    BlockerSolved {
        blocker: Blocker,
        board_id: Option<Id>,
        card_id: Option<Id>,
    },

    #[serde(rename = "analytics_refetch")]
    AnalyticsRefetch {
        board_id: Id,
        data: serde_json::Value,
    },

    #[serde(rename = "analytics_refetch_global")]
    AnalyticsRefetchGlobal { data: serde_json::Value },

    #[serde(rename = "project_approved")]
    ProjectApproved { project_id: Id, approved_by: Id },

    #[serde(rename = "user_typing")]
    UserTyping { card_id: Id, user_id: Id },
}

impl DomainEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::SubtaskStatusChanged { .. } => "subtask_status_changed",
            DomainEvent::CardStatusChanged { .. } => "card_status_changed",
            DomainEvent::SubtaskAdded { .. } => "subtask_added",
            DomainEvent::SubtaskAssigned { .. } => "subtask_assigned",
            DomainEvent::CommentNew { .. } => "comment:new",
            DomainEvent::CommentUpdated { .. } => "comment:updated",
            DomainEvent::CommentDeleted { .. } => "comment:deleted",
            DomainEvent::SubtaskCommented { .. } => "subtask_commented",
            DomainEvent::SubtaskRejected { .. } => "subtask_rejected",
            DomainEvent::BlockerReported { .. } => "blocker_reported",
            DomainEvent::BlockerSolved { .. } => "blocker_solved",
            DomainEvent::AnalyticsRefetch { .. } => "analytics_refetch",
            DomainEvent::AnalyticsRefetchGlobal { .. } => "analytics_refetch_global",
            DomainEvent::ProjectApproved { .. } => "project_approved",
            DomainEvent::UserTyping { .. } => "user_typing",
        }
    }
}
