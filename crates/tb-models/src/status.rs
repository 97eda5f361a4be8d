//! Status enums and their transition predicates
//!
//! The workflow state machine consults these predicates before every write;
//! they encode the valid edges, not the cascades (those live in tb-workflow).

use serde::{Deserialize, Serialize};

/// Card lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CardStatus {
    #[default]
    Todo,
    InProgress,
    Review,
    Done,
}

impl CardStatus {
    pub fn can_transition_to(self, next: CardStatus) -> bool {
        use CardStatus::*;
        matches!(
            (self, next),
            (Todo, InProgress)
                | (InProgress, Review)
                | (Review, Done)
                | (Review, InProgress)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, CardStatus::Done)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CardStatus::Todo => "todo",
            CardStatus::InProgress => "in_progress",
            CardStatus::Review => "review",
            CardStatus::Done => "done",
        }
    }
}

/// Subtask lifecycle status (same state set as cards, independent edges)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubtaskStatus {
    #[default]
    Todo,
    InProgress,
    Review,
    Done,
}

impl SubtaskStatus {
    pub fn can_transition_to(self, next: SubtaskStatus) -> bool {
        use SubtaskStatus::*;
        matches!(
            (self, next),
            (Todo, InProgress)
                | (InProgress, Review)
                | (Review, Done)
                | (Review, InProgress)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SubtaskStatus::Todo => "todo",
            SubtaskStatus::InProgress => "in_progress",
            SubtaskStatus::Review => "review",
            SubtaskStatus::Done => "done",
        }
    }
}

/// Assignment status, independent of the card's own status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    #[default]
    Assigned,
    InProgress,
    Completed,
}

impl AssignmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignmentStatus::Assigned => "assigned",
            AssignmentStatus::InProgress => "in_progress",
            AssignmentStatus::Completed => "completed",
        }
    }
}

/// Project lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    InProgress,
    Review,
    Done,
}

impl ProjectStatus {
    pub fn can_transition_to(self, next: ProjectStatus) -> bool {
        use ProjectStatus::*;
        matches!(
            (self, next),
            (InProgress, Review) | (Review, Done) | (Review, InProgress)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::InProgress => "in_progress",
            ProjectStatus::Review => "review",
            ProjectStatus::Done => "done",
        }
    }
}

/// Reviewer's decision on a subtask or project in review
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

/// Card priority
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}
