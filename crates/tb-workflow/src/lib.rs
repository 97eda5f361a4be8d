//! Workflow engine for Taskboard RS
//!
//! The state machine over projects, boards, cards, subtasks, assignments and
//! blockers, plus the time-tracking ledger. Everything is written against
//! the [`store::WorkflowStore`] capability trait and an injected
//! [`tb_realtime::broadcast::EventPublisher`]; multi-entity cascades go
//! through `transact` so a precondition failure mutates nothing, and events
//! are broadcast only after the commit.

pub mod analytics;
pub mod blockers;
pub mod cards;
pub mod comments;
pub mod ledger;
pub mod memory;
pub mod projects;
pub mod store;
pub mod subtasks;

pub use analytics::{AnalyticsRelay, ReportingClient};
pub use blockers::BlockerFlow;
pub use cards::{CardDetail, CardSummary, CardWorkflow, NewCard};
pub use comments::{CommentFlow, CommentThread, NewComment};
pub use ledger::TimeLedger;
pub use memory::MemoryStore;
pub use projects::{NewProject, ProjectDetail, ProjectFlow};
pub use store::{CardPatch, TxOutcome, WorkflowStore, WriteOp};
pub use subtasks::{NewSubtask, SubtaskFlow};
