//! # tb-models
//!
//! Domain entities for Taskboard RS: projects, boards, cards, subtasks,
//! assignments, blockers, comments, and time logs, plus the status enums
//! whose transition rules the workflow crate enforces.

pub mod blocker;
pub mod board;
pub mod card;
pub mod comment;
pub mod member;
pub mod project;
pub mod status;
pub mod subtask;
pub mod time_log;

pub use blocker::{Blocker, BlockerTarget};
pub use board::Board;
pub use card::{Assignment, Card};
pub use comment::{Comment, CommentCategory};
pub use member::{ProjectMember, UserTaskStatus};
pub use project::Project;
pub use status::{
    AssignmentStatus, CardStatus, Priority, ProjectStatus, ReviewDecision, SubtaskStatus,
};
pub use subtask::Subtask;
pub use time_log::TimeLog;
