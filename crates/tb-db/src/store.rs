//! Postgres implementation of the workflow store
//!
//! Granular reads map straight to queries; `transact` opens one database
//! transaction and applies the write sequence inside it. The opaque
//! aggregates are single SQL statements.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::error;

use tb_core::error::{TbError, TbResult};
use tb_core::traits::Id;
use tb_models::project::ProjectReview;
use tb_models::{
    Assignment, Blocker, BlockerTarget, Board, Card, Comment, Project, ProjectMember,
    ReviewDecision, Subtask, SubtaskStatus, TimeLog, UserTaskStatus,
};
use tb_workflow::store::{CardPatch, TxOutcome, WorkflowStore, WriteOp};

use crate::rows::{
    comment_category_str, priority_str, review_decision_str, user_task_status_str, AssignmentRow,
    BlockerRow, BoardRow, CardRow, CommentRow, MemberRow, SubtaskRow, TimeLogRow,
};

const TIME_LOG_COLUMNS: &str =
    "id, card_id, subtask_id, user_id, start_time, end_time, duration_seconds, description";
const CARD_COLUMNS: &str = "id, board_id, title, description, status, priority, estimated_hours, \
     actual_hours, due_date, position, created_by, created_at, updated_at";
const SUBTASK_COLUMNS: &str = "id, card_id, title, description, status, assigned_to, position, \
     estimated_hours, actual_hours, review_status, created_by, completed_by, created_at, updated_at";
const COMMENT_COLUMNS: &str =
    "id, card_id, subtask_id, user_id, parent_comment_id, text, category, created_at, updated_at";
const BLOCKER_COLUMNS: &str = "id, target_type, target_id, reason, reported_by, is_resolved, \
     solution, resolved_by, resolved_at, created_at";

fn store_err(e: sqlx::Error) -> TbError {
    error!(error = %e, "Database operation failed");
    TbError::Store(e.to_string())
}

pub struct PgWorkflowStore {
    pool: PgPool,
}

impl PgWorkflowStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn apply_op(
        tx: &mut Transaction<'_, Postgres>,
        op: WriteOp,
        outcome: &mut TxOutcome,
    ) -> TbResult<()> {
        match op {
            WriteOp::InsertTimeLog(log) => {
                let row = sqlx::query_as::<_, TimeLogRow>(&format!(
                    "INSERT INTO time_logs \
                     (card_id, subtask_id, user_id, start_time, end_time, duration_seconds, description) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {TIME_LOG_COLUMNS}"
                ))
                .bind(log.card_id)
                .bind(log.subtask_id)
                .bind(log.user_id)
                .bind(log.start_time)
                .bind(log.end_time)
                .bind(log.duration_seconds)
                .bind(&log.description)
                .fetch_one(&mut **tx)
                .await
                .map_err(store_err)?;
                outcome.time_log = Some(row.into_domain());
            }
            WriteOp::CloseTimeLog {
                log_id,
                end_time,
                duration_seconds,
                description,
            } => {
                let row = sqlx::query_as::<_, TimeLogRow>(&format!(
                    "UPDATE time_logs SET end_time = $2, duration_seconds = $3, \
                     description = COALESCE($4, description) \
                     WHERE id = $1 RETURNING {TIME_LOG_COLUMNS}"
                ))
                .bind(log_id)
                .bind(end_time)
                .bind(duration_seconds)
                .bind(&description)
                .fetch_optional(&mut **tx)
                .await
                .map_err(store_err)?
                .ok_or_else(|| TbError::not_found("TimeLog", "id", log_id))?;
                outcome.time_log = Some(row.into_domain());
            }
            WriteOp::SetSubtaskStatus {
                subtask_id,
                status,
                assigned_to,
                completed_by,
                review_status,
            } => {
                let affected = sqlx::query(
                    "UPDATE subtasks SET status = $2, \
                     assigned_to = COALESCE($3, assigned_to), \
                     completed_by = COALESCE($4, completed_by), \
                     review_status = COALESCE($5, review_status), \
                     updated_at = now() WHERE id = $1",
                )
                .bind(subtask_id)
                .bind(status.as_str())
                .bind(assigned_to)
                .bind(completed_by)
                .bind(review_status.map(review_decision_str))
                .execute(&mut **tx)
                .await
                .map_err(store_err)?
                .rows_affected();
                if affected == 0 {
                    return Err(TbError::not_found("Subtask", "id", subtask_id));
                }
            }
            WriteOp::SetSubtaskActualHours { subtask_id, hours } => {
                sqlx::query("UPDATE subtasks SET actual_hours = $2 WHERE id = $1")
                    .bind(subtask_id)
                    .bind(hours)
                    .execute(&mut **tx)
                    .await
                    .map_err(store_err)?;
            }
            WriteOp::SetCardStatus { card_id, status } => {
                let affected =
                    sqlx::query("UPDATE cards SET status = $2, updated_at = now() WHERE id = $1")
                        .bind(card_id)
                        .bind(status.as_str())
                        .execute(&mut **tx)
                        .await
                        .map_err(store_err)?
                        .rows_affected();
                if affected == 0 {
                    return Err(TbError::not_found("Card", "id", card_id));
                }
            }
            WriteOp::SetCardActualHours { card_id, hours } => {
                sqlx::query("UPDATE cards SET actual_hours = $2 WHERE id = $1")
                    .bind(card_id)
                    .bind(hours)
                    .execute(&mut **tx)
                    .await
                    .map_err(store_err)?;
            }
            WriteOp::SetAssignmentStatus {
                card_id,
                user_id,
                status,
                started_at,
                completed_at,
            } => {
                sqlx::query(
                    "UPDATE card_assignments SET status = $3, \
                     started_at = COALESCE($4, started_at), \
                     completed_at = COALESCE($5, completed_at) \
                     WHERE card_id = $1 AND ($2::bigint IS NULL OR user_id = $2)",
                )
                .bind(card_id)
                .bind(user_id)
                .bind(status.as_str())
                .bind(started_at)
                .bind(completed_at)
                .execute(&mut **tx)
                .await
                .map_err(store_err)?;
            }
            WriteOp::SetUserTaskStatus { user_ids, status } => {
                sqlx::query("UPDATE users SET current_task_status = $2 WHERE id = ANY($1)")
                    .bind(&user_ids)
                    .bind(user_task_status_str(status))
                    .execute(&mut **tx)
                    .await
                    .map_err(store_err)?;
            }
            WriteOp::InsertComment(comment) => {
                let row = sqlx::query_as::<_, CommentRow>(&format!(
                    "INSERT INTO comments \
                     (card_id, subtask_id, user_id, parent_comment_id, text, category) \
                     VALUES ($1, $2, $3, $4, $5, $6) RETURNING {COMMENT_COLUMNS}"
                ))
                .bind(comment.card_id)
                .bind(comment.subtask_id)
                .bind(comment.user_id)
                .bind(comment.parent_comment_id)
                .bind(&comment.text)
                .bind(comment_category_str(comment.category))
                .fetch_one(&mut **tx)
                .await
                .map_err(store_err)?;
                outcome.comment = Some(row.into_domain()?);
            }
            WriteOp::SetProjectStatus { project_id, status } => {
                let affected = sqlx::query(
                    "UPDATE projects SET status = $2, updated_at = now() WHERE id = $1",
                )
                .bind(project_id)
                .bind(status.as_str())
                .execute(&mut **tx)
                .await
                .map_err(store_err)?
                .rows_affected();
                if affected == 0 {
                    return Err(TbError::not_found("Project", "id", project_id));
                }
            }
            WriteOp::InsertProjectReview(review) => {
                sqlx::query(
                    "INSERT INTO project_reviews (project_id, reviewed_by, review_status, reason) \
                     VALUES ($1, $2, $3, $4)",
                )
                .bind(review.project_id)
                .bind(review.reviewed_by)
                .bind(review_decision_str(review.review_status))
                .bind(&review.reason)
                .execute(&mut **tx)
                .await
                .map_err(store_err)?;
            }
            WriteOp::ResolveBlocker {
                blocker_id,
                solution,
                resolved_by,
                resolved_at,
            } => {
                let affected = sqlx::query(
                    "UPDATE blockers SET is_resolved = true, solution = $2, \
                     resolved_by = $3, resolved_at = $4 \
                     WHERE id = $1 AND is_resolved = false",
                )
                .bind(blocker_id)
                .bind(&solution)
                .bind(resolved_by)
                .bind(resolved_at)
                .execute(&mut **tx)
                .await
                .map_err(store_err)?
                .rows_affected();
                if affected == 0 {
                    return Err(TbError::precondition(
                        "Blocker is missing or already resolved",
                    ));
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl WorkflowStore for PgWorkflowStore {
    async fn project(&self, id: Id) -> TbResult<Project> {
        sqlx::query_as::<_, crate::rows::ProjectRow>(
            "SELECT id, name, description, status, created_by, deadline, created_at, updated_at \
             FROM projects WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?
        .ok_or_else(|| TbError::not_found("Project", "id", id))?
        .into_domain()
    }

    async fn projects(&self) -> TbResult<Vec<Project>> {
        let rows = sqlx::query_as::<_, crate::rows::ProjectRow>(
            "SELECT id, name, description, status, created_by, deadline, created_at, updated_at \
             FROM projects ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.into_iter()
            .map(crate::rows::ProjectRow::into_domain)
            .collect()
    }

    async fn board(&self, id: Id) -> TbResult<Board> {
        let row = sqlx::query_as::<_, BoardRow>(
            "SELECT id, project_id, name, position, created_at, updated_at \
             FROM boards WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?
        .ok_or_else(|| TbError::not_found("Board", "id", id))?;
        Ok(row.into_domain())
    }

    async fn board_by_project(&self, project_id: Id) -> TbResult<Option<Board>> {
        let row = sqlx::query_as::<_, BoardRow>(
            "SELECT id, project_id, name, position, created_at, updated_at \
             FROM boards WHERE project_id = $1 ORDER BY id LIMIT 1",
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(row.map(BoardRow::into_domain))
    }

    async fn card(&self, id: Id) -> TbResult<Card> {
        sqlx::query_as::<_, CardRow>(&format!("SELECT {CARD_COLUMNS} FROM cards WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?
            .ok_or_else(|| TbError::not_found("Card", "id", id))?
            .into_domain()
    }

    async fn cards_by_board(&self, board_id: Id) -> TbResult<Vec<Card>> {
        let rows = sqlx::query_as::<_, CardRow>(&format!(
            "SELECT {CARD_COLUMNS} FROM cards WHERE board_id = $1 ORDER BY position, id"
        ))
        .bind(board_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.into_iter().map(CardRow::into_domain).collect()
    }

    async fn subtask(&self, id: Id) -> TbResult<Subtask> {
        sqlx::query_as::<_, SubtaskRow>(&format!(
            "SELECT {SUBTASK_COLUMNS} FROM subtasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?
        .ok_or_else(|| TbError::not_found("Subtask", "id", id))?
        .into_domain()
    }

    async fn subtasks_by_card(&self, card_id: Id) -> TbResult<Vec<Subtask>> {
        let rows = sqlx::query_as::<_, SubtaskRow>(&format!(
            "SELECT {SUBTASK_COLUMNS} FROM subtasks WHERE card_id = $1 ORDER BY position, id"
        ))
        .bind(card_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.into_iter().map(SubtaskRow::into_domain).collect()
    }

    async fn find_subtask_by_title(&self, card_id: Id, title: &str) -> TbResult<Option<Subtask>> {
        let row = sqlx::query_as::<_, SubtaskRow>(&format!(
            "SELECT {SUBTASK_COLUMNS} FROM subtasks \
             WHERE card_id = $1 AND LOWER(title) = LOWER($2) LIMIT 1"
        ))
        .bind(card_id)
        .bind(title)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        row.map(SubtaskRow::into_domain).transpose()
    }

    async fn assignments_by_card(&self, card_id: Id) -> TbResult<Vec<Assignment>> {
        let rows = sqlx::query_as::<_, AssignmentRow>(
            "SELECT id, card_id, user_id, status, assigned_at, started_at, completed_at \
             FROM card_assignments WHERE card_id = $1 ORDER BY id",
        )
        .bind(card_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.into_iter().map(AssignmentRow::into_domain).collect()
    }

    async fn active_assignments_by_user(&self, user_id: Id) -> TbResult<Vec<Assignment>> {
        let rows = sqlx::query_as::<_, AssignmentRow>(
            "SELECT id, card_id, user_id, status, assigned_at, started_at, completed_at \
             FROM card_assignments WHERE user_id = $1 AND status = 'in_progress'",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.into_iter().map(AssignmentRow::into_domain).collect()
    }

    async fn active_subtasks_by_user(&self, user_id: Id) -> TbResult<Vec<Subtask>> {
        let rows = sqlx::query_as::<_, SubtaskRow>(&format!(
            "SELECT {SUBTASK_COLUMNS} FROM subtasks \
             WHERE assigned_to = $1 AND status = 'in_progress'"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.into_iter().map(SubtaskRow::into_domain).collect()
    }

    async fn open_time_log(&self, user_id: Id, subtask_id: Id) -> TbResult<Option<TimeLog>> {
        let row = sqlx::query_as::<_, TimeLogRow>(&format!(
            "SELECT {TIME_LOG_COLUMNS} FROM time_logs \
             WHERE user_id = $1 AND subtask_id = $2 AND end_time IS NULL \
             ORDER BY start_time DESC LIMIT 1"
        ))
        .bind(user_id)
        .bind(subtask_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(row.map(TimeLogRow::into_domain))
    }

    async fn members_by_project(&self, project_id: Id) -> TbResult<Vec<ProjectMember>> {
        let rows = sqlx::query_as::<_, MemberRow>(
            "SELECT id, project_id, user_id, role, joined_at \
             FROM project_members WHERE project_id = $1 ORDER BY id",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(rows.into_iter().map(MemberRow::into_domain).collect())
    }

    async fn is_card_assignee(&self, card_id: Id, user_id: Id) -> TbResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM card_assignments WHERE card_id = $1 AND user_id = $2)",
        )
        .bind(card_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)
    }

    async fn comment(&self, id: Id) -> TbResult<Comment> {
        sqlx::query_as::<_, CommentRow>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?
        .ok_or_else(|| TbError::not_found("Comment", "id", id))?
        .into_domain()
    }

    async fn comments_by_card(&self, card_id: Id) -> TbResult<Vec<Comment>> {
        let rows = sqlx::query_as::<_, CommentRow>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE card_id = $1 ORDER BY created_at, id"
        ))
        .bind(card_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.into_iter().map(CommentRow::into_domain).collect()
    }

    async fn blocker(&self, id: Id) -> TbResult<Blocker> {
        sqlx::query_as::<_, BlockerRow>(&format!(
            "SELECT {BLOCKER_COLUMNS} FROM blockers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?
        .ok_or_else(|| TbError::not_found("Blocker", "id", id))?
        .into_domain()
    }

    async fn blockers_for_card(&self, card_id: Id) -> TbResult<Vec<Blocker>> {
        let rows = sqlx::query_as::<_, BlockerRow>(&format!(
            "SELECT {BLOCKER_COLUMNS} FROM blockers \
             WHERE target_type = 'card' AND target_id = $1 ORDER BY id"
        ))
        .bind(card_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.into_iter().map(BlockerRow::into_domain).collect()
    }

    async fn blockers_for_subtask(&self, subtask_id: Id) -> TbResult<Vec<Blocker>> {
        let rows = sqlx::query_as::<_, BlockerRow>(&format!(
            "SELECT {BLOCKER_COLUMNS} FROM blockers \
             WHERE target_type = 'subtask' AND target_id = $1 ORDER BY id"
        ))
        .bind(subtask_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.into_iter().map(BlockerRow::into_domain).collect()
    }

    async fn insert_project(
        &self,
        project: Project,
        members: Vec<ProjectMember>,
    ) -> TbResult<(Project, Vec<ProjectMember>)> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        let project_row = sqlx::query_as::<_, crate::rows::ProjectRow>(
            "INSERT INTO projects (name, description, status, created_by, deadline) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, name, description, status, created_by, deadline, created_at, updated_at",
        )
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.status.as_str())
        .bind(project.created_by)
        .bind(project.deadline)
        .fetch_one(&mut *tx)
        .await
        .map_err(store_err)?;
        let project_id = project_row.id;

        let mut inserted = Vec::with_capacity(members.len());
        for member in members {
            let row = sqlx::query_as::<_, MemberRow>(
                "INSERT INTO project_members (project_id, user_id, role) \
                 VALUES ($1, $2, $3) RETURNING id, project_id, user_id, role, joined_at",
            )
            .bind(project_id)
            .bind(member.user_id)
            .bind(&member.role)
            .fetch_one(&mut *tx)
            .await
            .map_err(store_err)?;
            inserted.push(row.into_domain());
        }

        tx.commit().await.map_err(store_err)?;
        Ok((project_row.into_domain()?, inserted))
    }

    async fn insert_board(&self, board: Board) -> TbResult<Board> {
        let row = sqlx::query_as::<_, BoardRow>(
            "INSERT INTO boards (project_id, name, position) \
             VALUES ($1, $2, \
                     (SELECT COALESCE(MAX(position), 0) + 1 FROM boards WHERE project_id = $1)) \
             RETURNING id, project_id, name, position, created_at, updated_at",
        )
        .bind(board.project_id)
        .bind(&board.name)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(row.into_domain())
    }

    async fn update_board_name(&self, id: Id, name: String) -> TbResult<Board> {
        let row = sqlx::query_as::<_, BoardRow>(
            "UPDATE boards SET name = $2, updated_at = now() WHERE id = $1 \
             RETURNING id, project_id, name, position, created_at, updated_at",
        )
        .bind(id)
        .bind(&name)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?
        .ok_or_else(|| TbError::not_found("Board", "id", id))?;
        Ok(row.into_domain())
    }

    async fn insert_card(&self, card: Card) -> TbResult<Card> {
        sqlx::query_as::<_, CardRow>(&format!(
            "INSERT INTO cards \
             (board_id, title, description, status, priority, estimated_hours, due_date, \
              position, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, \
                     (SELECT COALESCE(MAX(position), 0) + 1 FROM cards WHERE board_id = $1), $8) \
             RETURNING {CARD_COLUMNS}"
        ))
        .bind(card.board_id)
        .bind(&card.title)
        .bind(&card.description)
        .bind(card.status.as_str())
        .bind(priority_str(card.priority))
        .bind(card.estimated_hours)
        .bind(card.due_date)
        .bind(card.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?
        .into_domain()
    }

    async fn update_card_fields(&self, id: Id, patch: CardPatch) -> TbResult<Card> {
        sqlx::query_as::<_, CardRow>(&format!(
            "UPDATE cards SET \
             title = COALESCE($2, title), \
             description = COALESCE($3, description), \
             due_date = COALESCE($4, due_date), \
             priority = COALESCE($5, priority), \
             estimated_hours = COALESCE($6, estimated_hours), \
             updated_at = now() \
             WHERE id = $1 RETURNING {CARD_COLUMNS}"
        ))
        .bind(id)
        .bind(&patch.title)
        .bind(&patch.description)
        .bind(patch.due_date)
        .bind(patch.priority.map(priority_str))
        .bind(patch.estimated_hours)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?
        .ok_or_else(|| TbError::not_found("Card", "id", id))?
        .into_domain()
    }

    async fn insert_assignment(&self, assignment: Assignment) -> TbResult<Assignment> {
        sqlx::query_as::<_, AssignmentRow>(
            "INSERT INTO card_assignments (card_id, user_id, status) VALUES ($1, $2, $3) \
             RETURNING id, card_id, user_id, status, assigned_at, started_at, completed_at",
        )
        .bind(assignment.card_id)
        .bind(assignment.user_id)
        .bind(assignment.status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?
        .into_domain()
    }

    async fn delete_assignments_by_card(&self, card_id: Id) -> TbResult<()> {
        sqlx::query("DELETE FROM card_assignments WHERE card_id = $1")
            .bind(card_id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn insert_subtask(&self, subtask: Subtask) -> TbResult<Subtask> {
        sqlx::query_as::<_, SubtaskRow>(&format!(
            "INSERT INTO subtasks \
             (card_id, title, description, status, assigned_to, position, estimated_hours, \
              created_by) \
             VALUES ($1, $2, $3, $4, $5, \
                     CASE WHEN $6 > 0 THEN $6 ELSE \
                       (SELECT COALESCE(MAX(position), 0) + 1 FROM subtasks WHERE card_id = $1) \
                     END, $7, $8) \
             RETURNING {SUBTASK_COLUMNS}"
        ))
        .bind(subtask.card_id)
        .bind(&subtask.title)
        .bind(&subtask.description)
        .bind(subtask.status.as_str())
        .bind(subtask.assigned_to)
        .bind(subtask.position)
        .bind(subtask.estimated_hours)
        .bind(subtask.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?
        .into_domain()
    }

    async fn update_subtask_assignee(&self, id: Id, user_id: Id) -> TbResult<Subtask> {
        sqlx::query_as::<_, SubtaskRow>(&format!(
            "UPDATE subtasks SET assigned_to = $2, updated_at = now() WHERE id = $1 \
             RETURNING {SUBTASK_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?
        .ok_or_else(|| TbError::not_found("Subtask", "id", id))?
        .into_domain()
    }

    async fn insert_comment(&self, comment: Comment) -> TbResult<Comment> {
        sqlx::query_as::<_, CommentRow>(&format!(
            "INSERT INTO comments \
             (card_id, subtask_id, user_id, parent_comment_id, text, category) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(comment.card_id)
        .bind(comment.subtask_id)
        .bind(comment.user_id)
        .bind(comment.parent_comment_id)
        .bind(&comment.text)
        .bind(comment_category_str(comment.category))
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?
        .into_domain()
    }

    async fn update_comment_text(&self, id: Id, text: String) -> TbResult<Comment> {
        sqlx::query_as::<_, CommentRow>(&format!(
            "UPDATE comments SET text = $2, updated_at = now() WHERE id = $1 \
             RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(id)
        .bind(&text)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?
        .ok_or_else(|| TbError::not_found("Comment", "id", id))?
        .into_domain()
    }

    async fn delete_comment(&self, id: Id) -> TbResult<Comment> {
        sqlx::query_as::<_, CommentRow>(&format!(
            "DELETE FROM comments WHERE id = $1 RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?
        .ok_or_else(|| TbError::not_found("Comment", "id", id))?
        .into_domain()
    }

    async fn insert_blocker(&self, blocker: Blocker) -> TbResult<Blocker> {
        let (target_type, target_id) = match blocker.target {
            BlockerTarget::Card(id) => ("card", id),
            BlockerTarget::Subtask(id) => ("subtask", id),
        };
        sqlx::query_as::<_, BlockerRow>(&format!(
            "INSERT INTO blockers (target_type, target_id, reason, reported_by) \
             VALUES ($1, $2, $3, $4) RETURNING {BLOCKER_COLUMNS}"
        ))
        .bind(target_type)
        .bind(target_id)
        .bind(&blocker.reason)
        .bind(blocker.reported_by)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?
        .into_domain()
    }

    async fn set_user_task_status(&self, user_ids: &[Id], status: UserTaskStatus) -> TbResult<()> {
        sqlx::query("UPDATE users SET current_task_status = $2 WHERE id = ANY($1)")
            .bind(user_ids)
            .bind(user_task_status_str(status))
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn total_logged_seconds_for_subtask(&self, subtask_id: Id) -> TbResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(duration_seconds), 0) FROM time_logs \
             WHERE subtask_id = $1 AND duration_seconds IS NOT NULL",
        )
        .bind(subtask_id)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)
    }

    async fn total_logged_seconds_for_card(&self, card_id: Id) -> TbResult<Option<i64>> {
        sqlx::query_scalar::<_, Option<i64>>(
            "SELECT CASE WHEN COUNT(*) = 0 THEN NULL \
                    ELSE COALESCE(SUM(duration_seconds), 0) END \
             FROM time_logs WHERE card_id = $1",
        )
        .bind(card_id)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)
    }

    async fn review_subtask_tx(
        &self,
        subtask_id: Id,
        _reviewer_id: Option<Id>,
        decision: ReviewDecision,
    ) -> TbResult<Subtask> {
        let next_status = match decision {
            ReviewDecision::Approved => SubtaskStatus::Done,
            ReviewDecision::Rejected => SubtaskStatus::InProgress,
        };
        sqlx::query_as::<_, SubtaskRow>(&format!(
            "UPDATE subtasks SET status = $2, review_status = $3, updated_at = now() \
             WHERE id = $1 RETURNING {SUBTASK_COLUMNS}"
        ))
        .bind(subtask_id)
        .bind(next_status.as_str())
        .bind(review_decision_str(decision))
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?
        .ok_or_else(|| TbError::not_found("Subtask", "id", subtask_id))?
        .into_domain()
    }

    async fn transact(&self, ops: Vec<WriteOp>) -> TbResult<TxOutcome> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;
        let mut outcome = TxOutcome::default();
        for op in ops {
            // A failing op aborts the whole transaction on drop.
            Self::apply_op(&mut tx, op, &mut outcome).await?;
        }
        tx.commit().await.map_err(store_err)?;
        Ok(outcome)
    }
}
