//! Database row types and their domain conversions
//!
//! Status columns are stored as text and parsed on read; an unknown value
//! is a store error, not a validation error, since only this crate writes
//! those columns.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

use tb_core::error::{TbError, TbResult};
use tb_models::{
    Assignment, AssignmentStatus, Blocker, BlockerTarget, Board, Card, CardStatus, Comment,
    CommentCategory, Priority, Project, ProjectMember, ProjectStatus, ReviewDecision, Subtask,
    SubtaskStatus, TimeLog, UserTaskStatus,
};

fn bad_column(column: &str, value: &str) -> TbError {
    TbError::Store(format!("unexpected {column} value: {value}"))
}

pub(crate) fn parse_card_status(value: &str) -> TbResult<CardStatus> {
    match value {
        "todo" => Ok(CardStatus::Todo),
        "in_progress" => Ok(CardStatus::InProgress),
        "review" => Ok(CardStatus::Review),
        "done" => Ok(CardStatus::Done),
        other => Err(bad_column("card status", other)),
    }
}

pub(crate) fn parse_subtask_status(value: &str) -> TbResult<SubtaskStatus> {
    match value {
        "todo" => Ok(SubtaskStatus::Todo),
        "in_progress" => Ok(SubtaskStatus::InProgress),
        "review" => Ok(SubtaskStatus::Review),
        "done" => Ok(SubtaskStatus::Done),
        other => Err(bad_column("subtask status", other)),
    }
}

pub(crate) fn parse_assignment_status(value: &str) -> TbResult<AssignmentStatus> {
    match value {
        "assigned" => Ok(AssignmentStatus::Assigned),
        "in_progress" => Ok(AssignmentStatus::InProgress),
        "completed" => Ok(AssignmentStatus::Completed),
        other => Err(bad_column("assignment status", other)),
    }
}

pub(crate) fn parse_project_status(value: &str) -> TbResult<ProjectStatus> {
    match value {
        "in_progress" => Ok(ProjectStatus::InProgress),
        "review" => Ok(ProjectStatus::Review),
        "done" => Ok(ProjectStatus::Done),
        other => Err(bad_column("project status", other)),
    }
}

pub(crate) fn parse_priority(value: &str) -> TbResult<Priority> {
    match value {
        "low" => Ok(Priority::Low),
        "medium" => Ok(Priority::Medium),
        "high" => Ok(Priority::High),
        "urgent" => Ok(Priority::Urgent),
        other => Err(bad_column("priority", other)),
    }
}

pub(crate) fn parse_review_decision(value: &str) -> TbResult<ReviewDecision> {
    match value {
        "approved" => Ok(ReviewDecision::Approved),
        "rejected" => Ok(ReviewDecision::Rejected),
        other => Err(bad_column("review decision", other)),
    }
}

pub(crate) fn parse_comment_category(value: &str) -> TbResult<CommentCategory> {
    match value {
        "general" => Ok(CommentCategory::General),
        "feedback" => Ok(CommentCategory::Feedback),
        "reject" => Ok(CommentCategory::Reject),
        other => Err(bad_column("comment category", other)),
    }
}

pub(crate) fn parse_user_task_status(value: &str) -> TbResult<UserTaskStatus> {
    match value {
        "available" => Ok(UserTaskStatus::Available),
        "working" => Ok(UserTaskStatus::Working),
        other => Err(bad_column("user task status", other)),
    }
}

pub(crate) fn review_decision_str(decision: ReviewDecision) -> &'static str {
    match decision {
        ReviewDecision::Approved => "approved",
        ReviewDecision::Rejected => "rejected",
    }
}

pub(crate) fn priority_str(priority: Priority) -> &'static str {
    match priority {
        Priority::Low => "low",
        Priority::Medium => "medium",
        Priority::High => "high",
        Priority::Urgent => "urgent",
    }
}

pub(crate) fn comment_category_str(category: CommentCategory) -> &'static str {
    match category {
        CommentCategory::General => "general",
        CommentCategory::Feedback => "feedback",
        CommentCategory::Reject => "reject",
    }
}

pub(crate) fn user_task_status_str(status: UserTaskStatus) -> &'static str {
    match status {
        UserTaskStatus::Available => "available",
        UserTaskStatus::Working => "working",
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ProjectRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub created_by: i64,
    pub deadline: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProjectRow {
    pub fn into_domain(self) -> TbResult<Project> {
        Ok(Project {
            id: Some(self.id),
            name: self.name,
            description: self.description,
            status: parse_project_status(&self.status)?,
            created_by: self.created_by,
            deadline: self.deadline,
            created_at: Some(self.created_at),
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct BoardRow {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl BoardRow {
    pub fn into_domain(self) -> Board {
        Board {
            id: Some(self.id),
            project_id: self.project_id,
            name: self.name,
            position: self.position,
            created_at: Some(self.created_at),
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct CardRow {
    pub id: i64,
    pub board_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: String,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
    pub due_date: Option<NaiveDate>,
    pub position: i32,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CardRow {
    pub fn into_domain(self) -> TbResult<Card> {
        Ok(Card {
            id: Some(self.id),
            board_id: self.board_id,
            title: self.title,
            description: self.description,
            status: parse_card_status(&self.status)?,
            priority: parse_priority(&self.priority)?,
            estimated_hours: self.estimated_hours,
            actual_hours: self.actual_hours,
            due_date: self.due_date,
            position: self.position,
            created_by: self.created_by,
            created_at: Some(self.created_at),
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct AssignmentRow {
    pub id: i64,
    pub card_id: i64,
    pub user_id: i64,
    pub status: String,
    pub assigned_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl AssignmentRow {
    pub fn into_domain(self) -> TbResult<Assignment> {
        Ok(Assignment {
            id: Some(self.id),
            card_id: self.card_id,
            user_id: self.user_id,
            status: parse_assignment_status(&self.status)?,
            assigned_at: Some(self.assigned_at),
            started_at: self.started_at,
            completed_at: self.completed_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct SubtaskRow {
    pub id: i64,
    pub card_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub assigned_to: Option<i64>,
    pub position: i32,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
    pub review_status: Option<String>,
    pub created_by: i64,
    pub completed_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SubtaskRow {
    pub fn into_domain(self) -> TbResult<Subtask> {
        Ok(Subtask {
            id: Some(self.id),
            card_id: self.card_id,
            title: self.title,
            description: self.description,
            status: parse_subtask_status(&self.status)?,
            assigned_to: self.assigned_to,
            position: self.position,
            estimated_hours: self.estimated_hours,
            actual_hours: self.actual_hours,
            review_status: self
                .review_status
                .as_deref()
                .map(parse_review_decision)
                .transpose()?,
            created_by: self.created_by,
            completed_by: self.completed_by,
            created_at: Some(self.created_at),
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct TimeLogRow {
    pub id: i64,
    pub card_id: i64,
    pub subtask_id: i64,
    pub user_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
    pub description: Option<String>,
}

impl TimeLogRow {
    pub fn into_domain(self) -> TimeLog {
        TimeLog {
            id: Some(self.id),
            card_id: self.card_id,
            subtask_id: self.subtask_id,
            user_id: self.user_id,
            start_time: self.start_time,
            end_time: self.end_time,
            duration_seconds: self.duration_seconds,
            description: self.description,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct CommentRow {
    pub id: i64,
    pub card_id: i64,
    pub subtask_id: Option<i64>,
    pub user_id: i64,
    pub parent_comment_id: Option<i64>,
    pub text: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CommentRow {
    pub fn into_domain(self) -> TbResult<Comment> {
        Ok(Comment {
            id: Some(self.id),
            card_id: self.card_id,
            subtask_id: self.subtask_id,
            user_id: self.user_id,
            parent_comment_id: self.parent_comment_id,
            text: self.text,
            category: parse_comment_category(&self.category)?,
            created_at: Some(self.created_at),
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct BlockerRow {
    pub id: i64,
    pub target_type: String,
    pub target_id: i64,
    pub reason: String,
    pub reported_by: i64,
    pub is_resolved: bool,
    pub solution: Option<String>,
    pub resolved_by: Option<i64>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl BlockerRow {
    pub fn into_domain(self) -> TbResult<Blocker> {
        let target = match self.target_type.as_str() {
            "card" => BlockerTarget::Card(self.target_id),
            "subtask" => BlockerTarget::Subtask(self.target_id),
            other => return Err(bad_column("blocker target type", other)),
        };
        Ok(Blocker {
            id: Some(self.id),
            target,
            reason: self.reason,
            reported_by: self.reported_by,
            is_resolved: self.is_resolved,
            solution: self.solution,
            resolved_by: self.resolved_by,
            resolved_at: self.resolved_at,
            created_at: Some(self.created_at),
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct MemberRow {
    pub id: i64,
    pub project_id: i64,
    pub user_id: i64,
    pub role: String,
    pub joined_at: DateTime<Utc>,
}

impl MemberRow {
    pub fn into_domain(self) -> ProjectMember {
        ProjectMember {
            id: Some(self.id),
            project_id: self.project_id,
            user_id: self.user_id,
            role: self.role,
            joined_at: Some(self.joined_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsers_round_trip() {
        assert_eq!(
            parse_card_status(CardStatus::Review.as_str()).unwrap(),
            CardStatus::Review
        );
        assert_eq!(
            parse_assignment_status(AssignmentStatus::Completed.as_str()).unwrap(),
            AssignmentStatus::Completed
        );
        assert_eq!(
            parse_review_decision(review_decision_str(ReviewDecision::Rejected)).unwrap(),
            ReviewDecision::Rejected
        );
        assert_eq!(parse_user_task_status("working").unwrap(), UserTaskStatus::Working);
    }

    #[test]
    fn test_unknown_status_is_store_error() {
        assert!(matches!(
            parse_card_status("archived").unwrap_err(),
            TbError::Store(_)
        ));
    }
}
