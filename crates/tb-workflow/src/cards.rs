//! Card workflow
//!
//! Creation with owner assignment and initial subtasks, field updates,
//! the explicit move-to-review gate, approval with actual-hours settlement,
//! and revision back to in_progress.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use validator::Validate;

use tb_core::error::{TbError, TbResult};
use tb_core::traits::{Id, UserContext};
use tb_models::{Assignment, AssignmentStatus, Card, CardStatus, Subtask, SubtaskStatus};
use tb_realtime::broadcast::EventPublisher;
use tb_realtime::event::{DomainEvent, StatusTrigger};
use tb_realtime::room::RoomKind;

use crate::store::{CardPatch, WorkflowStore, WriteOp};

/// Input for card creation
#[derive(Debug, Clone, Default)]
pub struct NewCard {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<tb_models::Priority>,
    pub estimated_hours: Option<f64>,
    pub due_date: Option<chrono::NaiveDate>,
    /// Users assigned at creation; the creator is always included
    pub assignee_ids: Vec<Id>,
    /// Initial subtasks, appended in order
    pub subtask_titles: Vec<String>,
}

/// A card with its assignments and subtasks
#[derive(Debug, Clone, serde::Serialize)]
pub struct CardDetail {
    pub card: Card,
    pub assignments: Vec<Assignment>,
    pub subtasks: Vec<Subtask>,
}

/// Board-listing row: the card plus the flags the client renders
#[derive(Debug, Clone, serde::Serialize)]
pub struct CardSummary {
    pub card: Card,
    /// Whether the requesting user holds an assignment on this card
    pub is_assignee: bool,
    pub open_blocker_count: usize,
}

pub struct CardWorkflow {
    store: Arc<dyn WorkflowStore>,
    publisher: Arc<dyn EventPublisher>,
}

impl CardWorkflow {
    pub fn new(store: Arc<dyn WorkflowStore>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { store, publisher }
    }

    pub async fn create(
        &self,
        board_id: Id,
        input: NewCard,
        ctx: &dyn UserContext,
    ) -> TbResult<CardDetail> {
        self.store.board(board_id).await?;

        let mut card = Card::new(board_id, input.title, ctx.user_id());
        card.description = input.description;
        if let Some(priority) = input.priority {
            card.priority = priority;
        }
        card.estimated_hours = input.estimated_hours;
        card.due_date = input.due_date;
        card.validate()
            .map_err(|e| TbError::validation(e.to_string()))?;

        let card = self.store.insert_card(card).await?;
        let card_id = card
            .id
            .ok_or_else(|| TbError::Internal("inserted card without id".into()))?;

        let mut assignee_ids = input.assignee_ids;
        if !assignee_ids.contains(&ctx.user_id()) {
            assignee_ids.push(ctx.user_id());
        }
        let mut assignments = Vec::with_capacity(assignee_ids.len());
        for user_id in assignee_ids {
            assignments.push(
                self.store
                    .insert_assignment(Assignment::new(card_id, user_id))
                    .await?,
            );
        }

        let mut subtasks = Vec::with_capacity(input.subtask_titles.len());
        for title in input.subtask_titles {
            let subtask = Subtask::new(card_id, title, ctx.user_id());
            subtask
                .validate()
                .map_err(|e| TbError::validation(e.to_string()))?;
            subtasks.push(self.store.insert_subtask(subtask).await?);
        }

        info!(card_id, board_id, "Card created");
        Ok(CardDetail {
            card,
            assignments,
            subtasks,
        })
    }

    pub async fn detail(&self, card_id: Id) -> TbResult<CardDetail> {
        let card = self.store.card(card_id).await?;
        let assignments = self.store.assignments_by_card(card_id).await?;
        let subtasks = self.store.subtasks_by_card(card_id).await?;
        Ok(CardDetail {
            card,
            assignments,
            subtasks,
        })
    }

    pub async fn list_by_board(
        &self,
        board_id: Id,
        ctx: &dyn UserContext,
    ) -> TbResult<Vec<CardSummary>> {
        self.store.board(board_id).await?;
        let cards = self.store.cards_by_board(board_id).await?;
        let mut summaries = Vec::with_capacity(cards.len());
        for card in cards {
            let card_id = card
                .id
                .ok_or_else(|| TbError::Internal("card row without id".into()))?;
            let is_assignee = self.store.is_card_assignee(card_id, ctx.user_id()).await?;
            let open_blocker_count = self
                .store
                .blockers_for_card(card_id)
                .await?
                .iter()
                .filter(|b| !b.is_resolved)
                .count();
            summaries.push(CardSummary {
                card,
                is_assignee,
                open_blocker_count,
            });
        }
        Ok(summaries)
    }

    /// Allow-listed field update; card status is never touched here.
    pub async fn update(&self, card_id: Id, patch: CardPatch) -> TbResult<Card> {
        if patch.is_empty() {
            return Err(TbError::validation("No updatable fields provided"));
        }
        if let Some(title) = &patch.title {
            if title.is_empty() || title.len() > 255 {
                return Err(TbError::validation("Title must be 1-255 characters"));
            }
        }
        self.store.update_card_fields(card_id, patch).await
    }

    /// Explicit in_progress → review move.
    ///
    /// Requires every subtask done; otherwise fails listing the unfinished
    /// subtask ids and mutates nothing.
    pub async fn move_to_review(&self, card_id: Id, ctx: &dyn UserContext) -> TbResult<Card> {
        let card = self.store.card(card_id).await?;
        if !card.status.can_transition_to(CardStatus::Review) {
            return Err(TbError::precondition(format!(
                "Card cannot move to review from {}",
                card.status.as_str()
            )));
        }

        let unfinished: Vec<Id> = self
            .store
            .subtasks_by_card(card_id)
            .await?
            .into_iter()
            .filter(|s| s.status != SubtaskStatus::Done)
            .filter_map(|s| s.id)
            .collect();
        if !unfinished.is_empty() {
            return Err(TbError::precondition_with_ids(
                "Card has unfinished subtasks",
                unfinished,
            ));
        }

        self.store
            .transact(vec![WriteOp::SetCardStatus {
                card_id,
                status: CardStatus::Review,
            }])
            .await?;

        let now = Utc::now();
        self.publisher.publish(
            RoomKind::Board(card.board_id),
            DomainEvent::CardStatusChanged {
                trigger: StatusTrigger::MoveToReview,
                card_id,
                board_id: card.board_id,
                new_status: CardStatus::Review,
                user_id: Some(ctx.user_id()),
                total_actual_hours: None,
                at: now,
            },
        );
        self.store.card(card_id).await
    }

    /// review → done.
    ///
    /// Settles actual_hours: the time-log aggregate when the card has any
    /// logs, otherwise the sum of subtask actual_hours. Every assignment on
    /// the card completes.
    pub async fn approve(&self, card_id: Id, ctx: &dyn UserContext) -> TbResult<Card> {
        if !ctx.is_admin() && !ctx.is_team_lead() {
            return Err(TbError::forbidden("Only a lead or admin can approve a card"));
        }
        let card = self.store.card(card_id).await?;
        if card.status != CardStatus::Review {
            return Err(TbError::precondition(format!(
                "Card must be in review to approve, was {}",
                card.status.as_str()
            )));
        }

        let total_actual_hours = settled_hours(self.store.as_ref(), card_id).await?;
        let now = Utc::now();
        self.store
            .transact(vec![
                WriteOp::SetCardStatus {
                    card_id,
                    status: CardStatus::Done,
                },
                WriteOp::SetCardActualHours {
                    card_id,
                    hours: total_actual_hours,
                },
                WriteOp::SetAssignmentStatus {
                    card_id,
                    user_id: None,
                    status: AssignmentStatus::Completed,
                    started_at: None,
                    completed_at: Some(now),
                },
            ])
            .await?;

        info!(card_id, total_actual_hours, "Card approved");
        self.publisher.publish(
            RoomKind::Board(card.board_id),
            DomainEvent::CardStatusChanged {
                trigger: StatusTrigger::Approve,
                card_id,
                board_id: card.board_id,
                new_status: CardStatus::Done,
                user_id: Some(ctx.user_id()),
                total_actual_hours: Some(total_actual_hours),
                at: now,
            },
        );
        self.store.card(card_id).await
    }

    /// review → in_progress, sending the card back for more work.
    pub async fn revise(&self, card_id: Id, ctx: &dyn UserContext) -> TbResult<Card> {
        if !ctx.is_admin() && !ctx.is_team_lead() {
            return Err(TbError::forbidden("Only a lead or admin can revise a card"));
        }
        let card = self.store.card(card_id).await?;
        if card.status != CardStatus::Review {
            return Err(TbError::precondition(format!(
                "Card must be in review to revise, was {}",
                card.status.as_str()
            )));
        }

        self.store
            .transact(vec![WriteOp::SetCardStatus {
                card_id,
                status: CardStatus::InProgress,
            }])
            .await?;

        self.publisher.publish(
            RoomKind::Board(card.board_id),
            DomainEvent::CardStatusChanged {
                trigger: StatusTrigger::Revise,
                card_id,
                board_id: card.board_id,
                new_status: CardStatus::InProgress,
                user_id: Some(ctx.user_id()),
                total_actual_hours: None,
                at: Utc::now(),
            },
        );
        self.store.card(card_id).await
    }

    /// Replace the card's assignment set.
    pub async fn reassign(&self, card_id: Id, user_ids: Vec<Id>) -> TbResult<Vec<Assignment>> {
        if user_ids.is_empty() {
            return Err(TbError::validation("At least one assignee is required"));
        }
        self.store.card(card_id).await?;
        self.store.delete_assignments_by_card(card_id).await?;
        let mut assignments = Vec::with_capacity(user_ids.len());
        for user_id in user_ids {
            assignments.push(
                self.store
                    .insert_assignment(Assignment::new(card_id, user_id))
                    .await?,
            );
        }
        Ok(assignments)
    }
}

/// Hours to settle on a card: Σ time-log seconds when any log exists,
/// otherwise Σ subtask actual_hours.
pub(crate) async fn settled_hours(store: &dyn WorkflowStore, card_id: Id) -> TbResult<f64> {
    match store.total_logged_seconds_for_card(card_id).await? {
        Some(seconds) => Ok(seconds as f64 / 3600.0),
        None => Ok(store
            .subtasks_by_card(card_id)
            .await?
            .iter()
            .filter_map(|s| s.actual_hours)
            .sum()),
    }
}
