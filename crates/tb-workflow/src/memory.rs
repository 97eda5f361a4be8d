//! In-memory store for development and testing
//!
//! A single `RwLock` over all tables: every write holds the lock exclusively,
//! so the read-then-conditionally-write sequences of the engine are never
//! interleaved with a conflicting write. `transact` mutates a copy of the
//! tables and swaps it in on success, giving all-or-nothing semantics.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use tb_core::error::{TbError, TbResult};
use tb_core::traits::Id;
use tb_models::project::ProjectReview;
use tb_models::{
    Assignment, AssignmentStatus, Blocker, BlockerTarget, Board, Card, Comment, Project,
    ProjectMember, ReviewDecision, Subtask, SubtaskStatus, TimeLog, UserTaskStatus,
};

use crate::store::{CardPatch, TxOutcome, WorkflowStore, WriteOp};

#[derive(Debug, Clone, Default)]
struct Tables {
    projects: HashMap<Id, Project>,
    project_reviews: Vec<ProjectReview>,
    boards: HashMap<Id, Board>,
    cards: HashMap<Id, Card>,
    assignments: HashMap<Id, Assignment>,
    subtasks: HashMap<Id, Subtask>,
    time_logs: HashMap<Id, TimeLog>,
    comments: HashMap<Id, Comment>,
    blockers: HashMap<Id, Blocker>,
    members: HashMap<Id, ProjectMember>,
    user_task_status: HashMap<Id, UserTaskStatus>,
}

/// In-memory [`WorkflowStore`]
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    next_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            next_id: AtomicI64::new(1),
        }
    }

    fn alloc_id(&self) -> Id {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Seed helpers used by tests and local development

    pub async fn seed_project(&self, mut project: Project) -> Project {
        let id = self.alloc_id();
        project.id = Some(id);
        self.tables.write().await.projects.insert(id, project.clone());
        project
    }

    pub async fn seed_board(&self, mut board: Board) -> Board {
        let id = self.alloc_id();
        board.id = Some(id);
        if board.position == 0 {
            board.position = id as i32;
        }
        self.tables.write().await.boards.insert(id, board.clone());
        board
    }

    pub async fn seed_card(&self, mut card: Card) -> Card {
        let id = self.alloc_id();
        card.id = Some(id);
        self.tables.write().await.cards.insert(id, card.clone());
        card
    }

    pub async fn seed_subtask(&self, mut subtask: Subtask) -> Subtask {
        let id = self.alloc_id();
        subtask.id = Some(id);
        self.tables.write().await.subtasks.insert(id, subtask.clone());
        subtask
    }

    pub async fn seed_assignment(&self, mut assignment: Assignment) -> Assignment {
        let id = self.alloc_id();
        assignment.id = Some(id);
        self.tables
            .write()
            .await
            .assignments
            .insert(id, assignment.clone());
        assignment
    }

    pub async fn seed_time_log(&self, mut log: TimeLog) -> TimeLog {
        let id = self.alloc_id();
        log.id = Some(id);
        self.tables.write().await.time_logs.insert(id, log.clone());
        log
    }

    pub async fn seed_member(&self, mut member: ProjectMember) -> ProjectMember {
        let id = self.alloc_id();
        member.id = Some(id);
        self.tables.write().await.members.insert(id, member.clone());
        member
    }

    pub async fn user_task_status(&self, user_id: Id) -> UserTaskStatus {
        self.tables
            .read()
            .await
            .user_task_status
            .get(&user_id)
            .copied()
            .unwrap_or_default()
    }

    pub async fn time_log(&self, id: Id) -> Option<TimeLog> {
        self.tables.read().await.time_logs.get(&id).cloned()
    }

    pub async fn project_reviews(&self, project_id: Id) -> Vec<ProjectReview> {
        self.tables
            .read()
            .await
            .project_reviews
            .iter()
            .filter(|r| r.project_id == project_id)
            .cloned()
            .collect()
    }

    fn apply_op(&self, tables: &mut Tables, op: WriteOp, outcome: &mut TxOutcome) -> TbResult<()> {
        match op {
            WriteOp::InsertTimeLog(mut log) => {
                let id = self.alloc_id();
                log.id = Some(id);
                tables.time_logs.insert(id, log.clone());
                outcome.time_log = Some(log);
            }
            WriteOp::CloseTimeLog {
                log_id,
                end_time,
                duration_seconds,
                description,
            } => {
                let log = tables
                    .time_logs
                    .get_mut(&log_id)
                    .ok_or_else(|| TbError::not_found("TimeLog", "id", log_id))?;
                log.end_time = Some(end_time);
                log.duration_seconds = Some(duration_seconds);
                if description.is_some() {
                    log.description = description;
                }
                outcome.time_log = Some(log.clone());
            }
            WriteOp::SetSubtaskStatus {
                subtask_id,
                status,
                assigned_to,
                completed_by,
                review_status,
            } => {
                let subtask = tables
                    .subtasks
                    .get_mut(&subtask_id)
                    .ok_or_else(|| TbError::not_found("Subtask", "id", subtask_id))?;
                subtask.status = status;
                if assigned_to.is_some() {
                    subtask.assigned_to = assigned_to;
                }
                if completed_by.is_some() {
                    subtask.completed_by = completed_by;
                }
                if review_status.is_some() {
                    subtask.review_status = review_status;
                }
                subtask.updated_at = Some(Utc::now());
            }
            WriteOp::SetSubtaskActualHours { subtask_id, hours } => {
                let subtask = tables
                    .subtasks
                    .get_mut(&subtask_id)
                    .ok_or_else(|| TbError::not_found("Subtask", "id", subtask_id))?;
                subtask.actual_hours = Some(hours);
            }
            WriteOp::SetCardStatus { card_id, status } => {
                let card = tables
                    .cards
                    .get_mut(&card_id)
                    .ok_or_else(|| TbError::not_found("Card", "id", card_id))?;
                card.status = status;
                card.updated_at = Some(Utc::now());
            }
            WriteOp::SetCardActualHours { card_id, hours } => {
                let card = tables
                    .cards
                    .get_mut(&card_id)
                    .ok_or_else(|| TbError::not_found("Card", "id", card_id))?;
                card.actual_hours = Some(hours);
            }
            WriteOp::SetAssignmentStatus {
                card_id,
                user_id,
                status,
                started_at,
                completed_at,
            } => {
                for assignment in tables.assignments.values_mut() {
                    if assignment.card_id != card_id {
                        continue;
                    }
                    if let Some(uid) = user_id {
                        if assignment.user_id != uid {
                            continue;
                        }
                    }
                    assignment.status = status;
                    if started_at.is_some() {
                        assignment.started_at = started_at;
                    }
                    if completed_at.is_some() {
                        assignment.completed_at = completed_at;
                    }
                }
            }
            WriteOp::SetUserTaskStatus { user_ids, status } => {
                for user_id in user_ids {
                    tables.user_task_status.insert(user_id, status);
                }
            }
            WriteOp::InsertComment(mut comment) => {
                let id = self.alloc_id();
                comment.id = Some(id);
                comment.created_at = Some(Utc::now());
                tables.comments.insert(id, comment.clone());
                outcome.comment = Some(comment);
            }
            WriteOp::SetProjectStatus { project_id, status } => {
                let project = tables
                    .projects
                    .get_mut(&project_id)
                    .ok_or_else(|| TbError::not_found("Project", "id", project_id))?;
                project.status = status;
                project.updated_at = Some(Utc::now());
            }
            WriteOp::InsertProjectReview(mut review) => {
                review.id = Some(self.alloc_id());
                review.created_at = Some(Utc::now());
                tables.project_reviews.push(review);
            }
            WriteOp::ResolveBlocker {
                blocker_id,
                solution,
                resolved_by,
                resolved_at,
            } => {
                let blocker = tables
                    .blockers
                    .get_mut(&blocker_id)
                    .ok_or_else(|| TbError::not_found("Blocker", "id", blocker_id))?;
                blocker.is_resolved = true;
                blocker.solution = Some(solution);
                blocker.resolved_by = Some(resolved_by);
                blocker.resolved_at = Some(resolved_at);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl WorkflowStore for MemoryStore {
    async fn project(&self, id: Id) -> TbResult<Project> {
        self.tables
            .read()
            .await
            .projects
            .get(&id)
            .cloned()
            .ok_or_else(|| TbError::not_found("Project", "id", id))
    }

    async fn projects(&self) -> TbResult<Vec<Project>> {
        let mut projects: Vec<Project> =
            self.tables.read().await.projects.values().cloned().collect();
        projects.sort_by_key(|p| p.id);
        Ok(projects)
    }

    async fn board(&self, id: Id) -> TbResult<Board> {
        self.tables
            .read()
            .await
            .boards
            .get(&id)
            .cloned()
            .ok_or_else(|| TbError::not_found("Board", "id", id))
    }

    async fn board_by_project(&self, project_id: Id) -> TbResult<Option<Board>> {
        Ok(self
            .tables
            .read()
            .await
            .boards
            .values()
            .find(|b| b.project_id == project_id)
            .cloned())
    }

    async fn card(&self, id: Id) -> TbResult<Card> {
        self.tables
            .read()
            .await
            .cards
            .get(&id)
            .cloned()
            .ok_or_else(|| TbError::not_found("Card", "id", id))
    }

    async fn cards_by_board(&self, board_id: Id) -> TbResult<Vec<Card>> {
        let mut cards: Vec<Card> = self
            .tables
            .read()
            .await
            .cards
            .values()
            .filter(|c| c.board_id == board_id)
            .cloned()
            .collect();
        cards.sort_by_key(|c| c.id);
        Ok(cards)
    }

    async fn subtask(&self, id: Id) -> TbResult<Subtask> {
        self.tables
            .read()
            .await
            .subtasks
            .get(&id)
            .cloned()
            .ok_or_else(|| TbError::not_found("Subtask", "id", id))
    }

    async fn subtasks_by_card(&self, card_id: Id) -> TbResult<Vec<Subtask>> {
        let mut subtasks: Vec<Subtask> = self
            .tables
            .read()
            .await
            .subtasks
            .values()
            .filter(|s| s.card_id == card_id)
            .cloned()
            .collect();
        subtasks.sort_by_key(|s| s.position);
        Ok(subtasks)
    }

    async fn find_subtask_by_title(&self, card_id: Id, title: &str) -> TbResult<Option<Subtask>> {
        Ok(self
            .tables
            .read()
            .await
            .subtasks
            .values()
            .find(|s| s.card_id == card_id && s.title.eq_ignore_ascii_case(title))
            .cloned())
    }

    async fn assignments_by_card(&self, card_id: Id) -> TbResult<Vec<Assignment>> {
        Ok(self
            .tables
            .read()
            .await
            .assignments
            .values()
            .filter(|a| a.card_id == card_id)
            .cloned()
            .collect())
    }

    async fn active_assignments_by_user(&self, user_id: Id) -> TbResult<Vec<Assignment>> {
        Ok(self
            .tables
            .read()
            .await
            .assignments
            .values()
            .filter(|a| a.user_id == user_id && a.status == AssignmentStatus::InProgress)
            .cloned()
            .collect())
    }

    async fn active_subtasks_by_user(&self, user_id: Id) -> TbResult<Vec<Subtask>> {
        Ok(self
            .tables
            .read()
            .await
            .subtasks
            .values()
            .filter(|s| s.assigned_to == Some(user_id) && s.status == SubtaskStatus::InProgress)
            .cloned()
            .collect())
    }

    async fn open_time_log(&self, user_id: Id, subtask_id: Id) -> TbResult<Option<TimeLog>> {
        Ok(self
            .tables
            .read()
            .await
            .time_logs
            .values()
            .filter(|l| l.user_id == user_id && l.subtask_id == subtask_id && l.is_open())
            .max_by_key(|l| l.start_time)
            .cloned())
    }

    async fn members_by_project(&self, project_id: Id) -> TbResult<Vec<ProjectMember>> {
        Ok(self
            .tables
            .read()
            .await
            .members
            .values()
            .filter(|m| m.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn is_card_assignee(&self, card_id: Id, user_id: Id) -> TbResult<bool> {
        Ok(self
            .tables
            .read()
            .await
            .assignments
            .values()
            .any(|a| a.card_id == card_id && a.user_id == user_id))
    }

    async fn comment(&self, id: Id) -> TbResult<Comment> {
        self.tables
            .read()
            .await
            .comments
            .get(&id)
            .cloned()
            .ok_or_else(|| TbError::not_found("Comment", "id", id))
    }

    async fn comments_by_card(&self, card_id: Id) -> TbResult<Vec<Comment>> {
        let mut comments: Vec<Comment> = self
            .tables
            .read()
            .await
            .comments
            .values()
            .filter(|c| c.card_id == card_id)
            .cloned()
            .collect();
        comments.sort_by_key(|c| c.created_at);
        Ok(comments)
    }

    async fn blocker(&self, id: Id) -> TbResult<Blocker> {
        self.tables
            .read()
            .await
            .blockers
            .get(&id)
            .cloned()
            .ok_or_else(|| TbError::not_found("Blocker", "id", id))
    }

    async fn blockers_for_card(&self, card_id: Id) -> TbResult<Vec<Blocker>> {
        Ok(self
            .tables
            .read()
            .await
            .blockers
            .values()
            .filter(|b| b.target == BlockerTarget::Card(card_id))
            .cloned()
            .collect())
    }

    async fn blockers_for_subtask(&self, subtask_id: Id) -> TbResult<Vec<Blocker>> {
        Ok(self
            .tables
            .read()
            .await
            .blockers
            .values()
            .filter(|b| b.target == BlockerTarget::Subtask(subtask_id))
            .cloned()
            .collect())
    }

    async fn insert_project(
        &self,
        mut project: Project,
        members: Vec<ProjectMember>,
    ) -> TbResult<(Project, Vec<ProjectMember>)> {
        let mut tables = self.tables.write().await;
        let project_id = self.alloc_id();
        project.id = Some(project_id);
        project.created_at = Some(Utc::now());
        tables.projects.insert(project_id, project.clone());

        let mut inserted = Vec::with_capacity(members.len());
        for mut member in members {
            let id = self.alloc_id();
            member.id = Some(id);
            member.project_id = project_id;
            member.joined_at = Some(Utc::now());
            tables.members.insert(id, member.clone());
            inserted.push(member);
        }
        Ok((project, inserted))
    }

    async fn insert_board(&self, mut board: Board) -> TbResult<Board> {
        let mut tables = self.tables.write().await;
        let id = self.alloc_id();
        board.id = Some(id);
        board.position = id as i32;
        board.created_at = Some(Utc::now());
        tables.boards.insert(id, board.clone());
        Ok(board)
    }

    async fn update_board_name(&self, id: Id, name: String) -> TbResult<Board> {
        let mut tables = self.tables.write().await;
        let board = tables
            .boards
            .get_mut(&id)
            .ok_or_else(|| TbError::not_found("Board", "id", id))?;
        board.name = name;
        board.updated_at = Some(Utc::now());
        Ok(board.clone())
    }

    async fn insert_card(&self, mut card: Card) -> TbResult<Card> {
        let mut tables = self.tables.write().await;
        let id = self.alloc_id();
        card.id = Some(id);
        card.position = id as i32;
        card.created_at = Some(Utc::now());
        tables.cards.insert(id, card.clone());
        Ok(card)
    }

    async fn update_card_fields(&self, id: Id, patch: CardPatch) -> TbResult<Card> {
        let mut tables = self.tables.write().await;
        let card = tables
            .cards
            .get_mut(&id)
            .ok_or_else(|| TbError::not_found("Card", "id", id))?;
        if let Some(title) = patch.title {
            card.title = title;
        }
        if let Some(description) = patch.description {
            card.description = Some(description);
        }
        if let Some(due_date) = patch.due_date {
            card.due_date = Some(due_date);
        }
        if let Some(priority) = patch.priority {
            card.priority = priority;
        }
        if let Some(estimated_hours) = patch.estimated_hours {
            card.estimated_hours = Some(estimated_hours);
        }
        card.updated_at = Some(Utc::now());
        Ok(card.clone())
    }

    async fn insert_assignment(&self, mut assignment: Assignment) -> TbResult<Assignment> {
        let mut tables = self.tables.write().await;
        let id = self.alloc_id();
        assignment.id = Some(id);
        assignment.assigned_at = Some(Utc::now());
        tables.assignments.insert(id, assignment.clone());
        Ok(assignment)
    }

    async fn delete_assignments_by_card(&self, card_id: Id) -> TbResult<()> {
        self.tables
            .write()
            .await
            .assignments
            .retain(|_, a| a.card_id != card_id);
        Ok(())
    }

    async fn insert_subtask(&self, mut subtask: Subtask) -> TbResult<Subtask> {
        let mut tables = self.tables.write().await;
        let next_position = tables
            .subtasks
            .values()
            .filter(|s| s.card_id == subtask.card_id)
            .map(|s| s.position)
            .max()
            .unwrap_or(0)
            + 1;
        let id = self.alloc_id();
        subtask.id = Some(id);
        if subtask.position == 0 {
            subtask.position = next_position;
        }
        subtask.created_at = Some(Utc::now());
        tables.subtasks.insert(id, subtask.clone());
        Ok(subtask)
    }

    async fn update_subtask_assignee(&self, id: Id, user_id: Id) -> TbResult<Subtask> {
        let mut tables = self.tables.write().await;
        let subtask = tables
            .subtasks
            .get_mut(&id)
            .ok_or_else(|| TbError::not_found("Subtask", "id", id))?;
        subtask.assigned_to = Some(user_id);
        subtask.updated_at = Some(Utc::now());
        Ok(subtask.clone())
    }

    async fn insert_comment(&self, mut comment: Comment) -> TbResult<Comment> {
        let mut tables = self.tables.write().await;
        let id = self.alloc_id();
        comment.id = Some(id);
        comment.created_at = Some(Utc::now());
        tables.comments.insert(id, comment.clone());
        Ok(comment)
    }

    async fn update_comment_text(&self, id: Id, text: String) -> TbResult<Comment> {
        let mut tables = self.tables.write().await;
        let comment = tables
            .comments
            .get_mut(&id)
            .ok_or_else(|| TbError::not_found("Comment", "id", id))?;
        comment.text = text;
        comment.updated_at = Some(Utc::now());
        Ok(comment.clone())
    }

    async fn delete_comment(&self, id: Id) -> TbResult<Comment> {
        self.tables
            .write()
            .await
            .comments
            .remove(&id)
            .ok_or_else(|| TbError::not_found("Comment", "id", id))
    }

    async fn insert_blocker(&self, mut blocker: Blocker) -> TbResult<Blocker> {
        let mut tables = self.tables.write().await;
        let id = self.alloc_id();
        blocker.id = Some(id);
        blocker.created_at = Some(Utc::now());
        tables.blockers.insert(id, blocker.clone());
        Ok(blocker)
    }

    async fn set_user_task_status(&self, user_ids: &[Id], status: UserTaskStatus) -> TbResult<()> {
        let mut tables = self.tables.write().await;
        for user_id in user_ids {
            tables.user_task_status.insert(*user_id, status);
        }
        Ok(())
    }

    async fn total_logged_seconds_for_subtask(&self, subtask_id: Id) -> TbResult<i64> {
        Ok(self
            .tables
            .read()
            .await
            .time_logs
            .values()
            .filter(|l| l.subtask_id == subtask_id)
            .filter_map(|l| l.duration_seconds)
            .sum())
    }

    async fn total_logged_seconds_for_card(&self, card_id: Id) -> TbResult<Option<i64>> {
        let tables = self.tables.read().await;
        let logs: Vec<&TimeLog> = tables
            .time_logs
            .values()
            .filter(|l| l.card_id == card_id)
            .collect();
        if logs.is_empty() {
            return Ok(None);
        }
        Ok(Some(logs.iter().filter_map(|l| l.duration_seconds).sum()))
    }

    async fn review_subtask_tx(
        &self,
        subtask_id: Id,
        _reviewer_id: Option<Id>,
        decision: ReviewDecision,
    ) -> TbResult<Subtask> {
        let mut tables = self.tables.write().await;
        let subtask = tables
            .subtasks
            .get_mut(&subtask_id)
            .ok_or_else(|| TbError::not_found("Subtask", "id", subtask_id))?;
        subtask.status = match decision {
            ReviewDecision::Approved => SubtaskStatus::Done,
            ReviewDecision::Rejected => SubtaskStatus::InProgress,
        };
        subtask.review_status = Some(decision);
        subtask.updated_at = Some(Utc::now());
        Ok(subtask.clone())
    }

    async fn transact(&self, ops: Vec<WriteOp>) -> TbResult<TxOutcome> {
        let mut tables = self.tables.write().await;
        // Work on a copy so a failing op leaves nothing applied.
        let mut staged = tables.clone();
        let mut outcome = TxOutcome::default();
        for op in ops {
            self.apply_op(&mut staged, op, &mut outcome)?;
        }
        *tables = staged;
        Ok(outcome)
    }
}
