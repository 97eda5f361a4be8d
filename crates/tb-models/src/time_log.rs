//! Time log model
//!
//! An open/closed interval of work against a (user, card, subtask) triple.
//! Invariant (enforced by the ledger): at most one open log per
//! (user, subtask) pair at any instant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tb_core::traits::{Id, Identifiable};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeLog {
    pub id: Option<Id>,

    pub card_id: Id,
    pub subtask_id: Id,
    pub user_id: Id,

    pub start_time: DateTime<Utc>,

    /// Null while the log is open
    pub end_time: Option<DateTime<Utc>>,

    /// max(0, end_time − start_time), set when the log closes
    pub duration_seconds: Option<i64>,

    pub description: Option<String>,
}

impl TimeLog {
    pub fn open(card_id: Id, subtask_id: Id, user_id: Id, start_time: DateTime<Utc>) -> Self {
        Self {
            id: None,
            card_id,
            subtask_id,
            user_id,
            start_time,
            end_time: None,
            duration_seconds: None,
            description: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Close the log, clamping the duration to a non-negative number
    pub fn close(&mut self, end_time: DateTime<Utc>) {
        let secs = (end_time - self.start_time).num_seconds().max(0);
        self.end_time = Some(end_time);
        self.duration_seconds = Some(secs);
    }
}

impl Identifiable for TimeLog {
    fn id(&self) -> Option<Id> {
        self.id
    }
}
