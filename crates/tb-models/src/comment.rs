//! Comment model
//!
//! Comments belong to a card. A comment may tag a subtask (derived from a
//! `#hashtag` match against subtask titles) and/or reply to a parent comment
//! (one level of nesting). A `reject` category marks the system comment the
//! workflow creates when a subtask review is rejected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tb_core::traits::{Id, Identifiable};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CommentCategory {
    #[default]
    General,
    Feedback,
    /// System comment recording a subtask review rejection
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Option<Id>,

    pub card_id: Id,

    /// Tagged subtask, resolved from the comment text
    pub subtask_id: Option<Id>,

    pub user_id: Id,

    /// Threaded reply target; replies to replies are not modeled
    pub parent_comment_id: Option<Id>,

    pub text: String,

    pub category: CommentCategory,

    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Comment {
    pub fn new(card_id: Id, user_id: Id, text: impl Into<String>) -> Self {
        Self {
            id: None,
            card_id,
            subtask_id: None,
            user_id,
            parent_comment_id: None,
            text: text.into(),
            category: CommentCategory::General,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn is_reply(&self) -> bool {
        self.parent_comment_id.is_some()
    }
}

impl Identifiable for Comment {
    fn id(&self) -> Option<Id> {
        self.id
    }
}
