//! Board model
//!
//! One board per project in practice; the 1:1 is enforced by the idempotent
//! create path in the workflow crate, not by the schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tb_core::traits::{Id, Identifiable, Timestamped};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Board {
    pub id: Option<Id>,

    pub project_id: Id,

    #[validate(length(min = 1, max = 255))]
    pub name: String,

    /// Sort position; defaults to the board's own id on create
    pub position: i32,

    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Board {
    pub fn new(project_id: Id, name: impl Into<String>) -> Self {
        Self {
            id: None,
            project_id,
            name: name.into(),
            position: 0,
            created_at: None,
            updated_at: None,
        }
    }
}

impl Identifiable for Board {
    fn id(&self) -> Option<Id> {
        self.id
    }
}

impl Timestamped for Board {
    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}
