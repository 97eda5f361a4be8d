//! Persistent store capability
//!
//! The workflow engine is written against this trait rather than a concrete
//! database. Reads are granular; multi-entity cascades go through
//! [`WorkflowStore::transact`], which applies a sequence of writes atomically
//! — if any step fails, none of the sequence's writes may be observed.
//!
//! `total_logged_seconds_*` and `review_subtask_tx` are opaque aggregates:
//! the Postgres side may map them to stored procedures, the in-memory side
//! computes them directly. Their internals are not part of this contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use tb_core::error::TbResult;
use tb_core::traits::Id;
use tb_models::{
    Assignment, AssignmentStatus, Blocker, Board, Card, CardStatus, Comment, Priority, Project,
    ProjectMember, ProjectStatus, ReviewDecision, Subtask, SubtaskStatus, TimeLog, UserTaskStatus,
};
use tb_models::project::ProjectReview;

/// One write inside an atomic cascade
#[derive(Debug, Clone)]
pub enum WriteOp {
    InsertTimeLog(TimeLog),
    CloseTimeLog {
        log_id: Id,
        end_time: DateTime<Utc>,
        duration_seconds: i64,
        description: Option<String>,
    },
    SetSubtaskStatus {
        subtask_id: Id,
        status: SubtaskStatus,
        assigned_to: Option<Id>,
        completed_by: Option<Id>,
        review_status: Option<ReviewDecision>,
    },
    SetSubtaskActualHours {
        subtask_id: Id,
        hours: f64,
    },
    SetCardStatus {
        card_id: Id,
        status: CardStatus,
    },
    SetCardActualHours {
        card_id: Id,
        hours: f64,
    },
    /// Update assignment status on a card; `user_id = None` touches every
    /// assignment of the card (the approve cascade), `Some` only that user's
    SetAssignmentStatus {
        card_id: Id,
        user_id: Option<Id>,
        status: AssignmentStatus,
        started_at: Option<DateTime<Utc>>,
        completed_at: Option<DateTime<Utc>>,
    },
    SetUserTaskStatus {
        user_ids: Vec<Id>,
        status: UserTaskStatus,
    },
    InsertComment(Comment),
    SetProjectStatus {
        project_id: Id,
        status: ProjectStatus,
    },
    InsertProjectReview(ProjectReview),
    ResolveBlocker {
        blocker_id: Id,
        solution: String,
        resolved_by: Id,
        resolved_at: DateTime<Utc>,
    },
}

/// Entities created inside a transaction, echoed back with their new ids
#[derive(Debug, Clone, Default)]
pub struct TxOutcome {
    pub time_log: Option<TimeLog>,
    pub comment: Option<Comment>,
}

/// Allow-listed card field updates (title, description, due date, priority,
/// estimate — never status, which only the state machine touches)
#[derive(Debug, Clone, Default)]
pub struct CardPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<chrono::NaiveDate>,
    pub priority: Option<Priority>,
    pub estimated_hours: Option<f64>,
}

impl CardPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.due_date.is_none()
            && self.priority.is_none()
            && self.estimated_hours.is_none()
    }
}

/// Relational store capability consumed by the workflow engine
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    // ---- reads ----

    async fn project(&self, id: Id) -> TbResult<Project>;
    async fn projects(&self) -> TbResult<Vec<Project>>;
    async fn board(&self, id: Id) -> TbResult<Board>;
    async fn board_by_project(&self, project_id: Id) -> TbResult<Option<Board>>;
    async fn card(&self, id: Id) -> TbResult<Card>;
    async fn cards_by_board(&self, board_id: Id) -> TbResult<Vec<Card>>;
    async fn subtask(&self, id: Id) -> TbResult<Subtask>;
    async fn subtasks_by_card(&self, card_id: Id) -> TbResult<Vec<Subtask>>;
    /// Case-insensitive title match within one card (hashtag detection)
    async fn find_subtask_by_title(&self, card_id: Id, title: &str) -> TbResult<Option<Subtask>>;
    async fn assignments_by_card(&self, card_id: Id) -> TbResult<Vec<Assignment>>;
    /// Assignments with status in_progress held by this user, system-wide
    async fn active_assignments_by_user(&self, user_id: Id) -> TbResult<Vec<Assignment>>;
    /// Subtasks with status in_progress assigned to this user, system-wide
    async fn active_subtasks_by_user(&self, user_id: Id) -> TbResult<Vec<Subtask>>;
    /// Most recent open time log for (user, subtask), latest start_time wins
    async fn open_time_log(&self, user_id: Id, subtask_id: Id) -> TbResult<Option<TimeLog>>;
    async fn members_by_project(&self, project_id: Id) -> TbResult<Vec<ProjectMember>>;
    async fn is_card_assignee(&self, card_id: Id, user_id: Id) -> TbResult<bool>;
    async fn comment(&self, id: Id) -> TbResult<Comment>;
    async fn comments_by_card(&self, card_id: Id) -> TbResult<Vec<Comment>>;
    async fn blocker(&self, id: Id) -> TbResult<Blocker>;
    async fn blockers_for_card(&self, card_id: Id) -> TbResult<Vec<Blocker>>;
    async fn blockers_for_subtask(&self, subtask_id: Id) -> TbResult<Vec<Blocker>>;

    // ---- plain inserts / single-entity writes ----

    async fn insert_project(
        &self,
        project: Project,
        members: Vec<ProjectMember>,
    ) -> TbResult<(Project, Vec<ProjectMember>)>;
    async fn insert_board(&self, board: Board) -> TbResult<Board>;
    async fn update_board_name(&self, id: Id, name: String) -> TbResult<Board>;
    async fn insert_card(&self, card: Card) -> TbResult<Card>;
    async fn update_card_fields(&self, id: Id, patch: CardPatch) -> TbResult<Card>;
    async fn insert_assignment(&self, assignment: Assignment) -> TbResult<Assignment>;
    async fn delete_assignments_by_card(&self, card_id: Id) -> TbResult<()>;
    async fn insert_subtask(&self, subtask: Subtask) -> TbResult<Subtask>;
    async fn update_subtask_assignee(&self, id: Id, user_id: Id) -> TbResult<Subtask>;
    async fn insert_comment(&self, comment: Comment) -> TbResult<Comment>;
    async fn update_comment_text(&self, id: Id, text: String) -> TbResult<Comment>;
    /// Returns the deleted comment (callers broadcast its card room)
    async fn delete_comment(&self, id: Id) -> TbResult<Comment>;
    async fn insert_blocker(&self, blocker: Blocker) -> TbResult<Blocker>;
    async fn set_user_task_status(&self, user_ids: &[Id], status: UserTaskStatus) -> TbResult<()>;

    // ---- opaque aggregates ----

    /// Σ duration_seconds over all closed logs of one subtask
    async fn total_logged_seconds_for_subtask(&self, subtask_id: Id) -> TbResult<i64>;
    /// Σ duration_seconds over all closed logs of one card; `None` when the
    /// card has no logs at all (callers fall back to subtask actual_hours)
    async fn total_logged_seconds_for_card(&self, card_id: Id) -> TbResult<Option<i64>>;
    /// Atomic subtask review decision: sets status (approved ⇒ done,
    /// rejected ⇒ in_progress) and review_status, returns the updated row
    async fn review_subtask_tx(
        &self,
        subtask_id: Id,
        reviewer_id: Option<Id>,
        decision: ReviewDecision,
    ) -> TbResult<Subtask>;

    // ---- transactional cascade ----

    /// Apply a sequence of writes atomically. No partial application: if any
    /// op fails, none of the sequence's effects are visible.
    async fn transact(&self, ops: Vec<WriteOp>) -> TbResult<TxOutcome>;
}
