//! Project lifecycle
//!
//! Creation with its member list, the idempotent one-board-per-project
//! create path, and the review cycle: a lead requests review via the board,
//! an admin approves (members return to available) or rejects with a reason.

use std::sync::Arc;

use tracing::info;
use validator::Validate;

use tb_core::error::{TbError, TbResult};
use tb_core::traits::{Id, UserContext};
use tb_models::project::ProjectReview;
use tb_models::{
    Board, Project, ProjectMember, ProjectStatus, ReviewDecision, UserTaskStatus,
};
use tb_realtime::broadcast::EventPublisher;
use tb_realtime::event::DomainEvent;
use tb_realtime::room::RoomKind;

use crate::store::{WorkflowStore, WriteOp};

/// Input for project creation
#[derive(Debug, Clone, Default)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub deadline: Option<chrono::NaiveDate>,
    /// (user_id, role) pairs; the creator is added as lead when absent
    pub members: Vec<(Id, String)>,
}

/// A project with its member list
#[derive(Debug, Clone, serde::Serialize)]
pub struct ProjectDetail {
    pub project: Project,
    pub members: Vec<ProjectMember>,
}

pub struct ProjectFlow {
    store: Arc<dyn WorkflowStore>,
    publisher: Arc<dyn EventPublisher>,
}

impl ProjectFlow {
    pub fn new(store: Arc<dyn WorkflowStore>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { store, publisher }
    }

    /// Create a project with its members; everyone involved flips to working.
    pub async fn create(&self, input: NewProject, ctx: &dyn UserContext) -> TbResult<ProjectDetail> {
        let mut project = Project::new(input.name, ctx.user_id());
        project.description = input.description;
        project.deadline = input.deadline;
        project
            .validate()
            .map_err(|e| TbError::validation(e.to_string()))?;

        let mut members: Vec<ProjectMember> = input
            .members
            .into_iter()
            .map(|(user_id, role)| ProjectMember::new(0, user_id, role))
            .collect();
        if !members.iter().any(|m| m.user_id == ctx.user_id()) {
            members.push(ProjectMember::new(0, ctx.user_id(), "team_lead"));
        }

        let (project, members) = self.store.insert_project(project, members).await?;
        let user_ids: Vec<Id> = members.iter().map(|m| m.user_id).collect();
        self.store
            .set_user_task_status(&user_ids, UserTaskStatus::Working)
            .await?;

        info!(project_id = ?project.id, member_count = members.len(), "Project created");
        Ok(ProjectDetail { project, members })
    }

    pub async fn list(&self) -> TbResult<Vec<Project>> {
        self.store.projects().await
    }

    pub async fn detail(&self, project_id: Id) -> TbResult<ProjectDetail> {
        let project = self.store.project(project_id).await?;
        let members = self.store.members_by_project(project_id).await?;
        Ok(ProjectDetail { project, members })
    }

    /// Create the project's board, or return the existing one.
    pub async fn create_board(&self, project_id: Id, name: String) -> TbResult<Board> {
        self.store.project(project_id).await?;
        if let Some(existing) = self.store.board_by_project(project_id).await? {
            return Ok(existing);
        }
        let board = Board::new(project_id, name);
        board
            .validate()
            .map_err(|e| TbError::validation(e.to_string()))?;
        let board = self.store.insert_board(board).await?;
        info!(project_id, board_id = ?board.id, "Board created");
        Ok(board)
    }

    pub async fn rename_board(&self, board_id: Id, name: String) -> TbResult<Board> {
        if name.trim().is_empty() {
            return Err(TbError::validation("Board name is required"));
        }
        self.store.update_board_name(board_id, name).await
    }

    /// Put the project in review, addressed by its board.
    pub async fn request_review(&self, board_id: Id, ctx: &dyn UserContext) -> TbResult<Project> {
        if !ctx.is_admin() && !ctx.is_team_lead() {
            return Err(TbError::forbidden(
                "Only a lead or admin can request a project review",
            ));
        }
        let board = self.store.board(board_id).await?;
        let project = self.store.project(board.project_id).await?;
        let project_id = board.project_id;
        if !project.status.can_transition_to(ProjectStatus::Review) {
            return Err(TbError::precondition(format!(
                "Project cannot enter review from {}",
                project.status.as_str()
            )));
        }

        self.store
            .transact(vec![WriteOp::SetProjectStatus {
                project_id,
                status: ProjectStatus::Review,
            }])
            .await?;
        info!(project_id, board_id, "Project review requested");
        self.store.project(project_id).await
    }

    /// Admin approval: project done, review logged, every member's task
    /// status reset to available, `project_approved` broadcast.
    pub async fn approve(&self, project_id: Id, ctx: &dyn UserContext) -> TbResult<Project> {
        if !ctx.is_admin() {
            return Err(TbError::forbidden("Only an admin can approve a project"));
        }
        let project = self.store.project(project_id).await?;
        if project.status != ProjectStatus::Review {
            return Err(TbError::precondition(format!(
                "Project must be in review to approve, was {}",
                project.status.as_str()
            )));
        }

        let member_ids: Vec<Id> = self
            .store
            .members_by_project(project_id)
            .await?
            .iter()
            .map(|m| m.user_id)
            .collect();

        self.store
            .transact(vec![
                WriteOp::SetProjectStatus {
                    project_id,
                    status: ProjectStatus::Done,
                },
                WriteOp::SetUserTaskStatus {
                    user_ids: member_ids,
                    status: UserTaskStatus::Available,
                },
                WriteOp::InsertProjectReview(ProjectReview {
                    id: None,
                    project_id,
                    reviewed_by: ctx.user_id(),
                    review_status: ReviewDecision::Approved,
                    reason: None,
                    created_at: None,
                }),
            ])
            .await?;
        info!(project_id, "Project approved");

        if let Some(board) = self.store.board_by_project(project_id).await? {
            if let Some(board_id) = board.id {
                self.publisher.publish(
                    RoomKind::Board(board_id),
                    DomainEvent::ProjectApproved {
                        project_id,
                        approved_by: ctx.user_id(),
                    },
                );
            }
        }
        self.store.project(project_id).await
    }

    /// Admin rejection with a recorded reason; project back to in_progress.
    pub async fn reject(
        &self,
        project_id: Id,
        reason: String,
        ctx: &dyn UserContext,
    ) -> TbResult<Project> {
        if !ctx.is_admin() {
            return Err(TbError::forbidden("Only an admin can reject a project"));
        }
        if reason.trim().is_empty() {
            return Err(TbError::validation("A rejection reason is required"));
        }
        let project = self.store.project(project_id).await?;
        if project.status != ProjectStatus::Review {
            return Err(TbError::precondition(format!(
                "Project must be in review to reject, was {}",
                project.status.as_str()
            )));
        }

        self.store
            .transact(vec![
                WriteOp::SetProjectStatus {
                    project_id,
                    status: ProjectStatus::InProgress,
                },
                WriteOp::InsertProjectReview(ProjectReview {
                    id: None,
                    project_id,
                    reviewed_by: ctx.user_id(),
                    review_status: ReviewDecision::Rejected,
                    reason: Some(reason),
                    created_at: None,
                }),
            ])
            .await?;
        info!(project_id, "Project rejected");
        self.store.project(project_id).await
    }
}
