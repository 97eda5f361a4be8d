//! Subtask workflow
//!
//! Creation under a live card, reassignment, and the review decision path.
//! A review decision runs through the store's `review_subtask_tx` capability,
//! then re-evaluates the parent card: approving the last open subtask settles
//! the card as done; a rejection sends subtask and card back to in_progress
//! and records a system comment carrying the reason.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use validator::Validate;

use tb_core::error::{TbError, TbResult};
use tb_core::traits::{Id, UserContext};
use tb_models::{
    AssignmentStatus, CardStatus, Comment, CommentCategory, ReviewDecision, Subtask, SubtaskStatus,
};
use tb_realtime::broadcast::EventPublisher;
use tb_realtime::event::{DomainEvent, StatusTrigger};
use tb_realtime::room::RoomKind;

use crate::cards::settled_hours;
use crate::store::{WorkflowStore, WriteOp};

/// Input for subtask creation
#[derive(Debug, Clone, Default)]
pub struct NewSubtask {
    pub title: String,
    pub description: Option<String>,
    pub estimated_hours: Option<f64>,
    pub assigned_to: Option<Id>,
}

pub struct SubtaskFlow {
    store: Arc<dyn WorkflowStore>,
    publisher: Arc<dyn EventPublisher>,
}

impl SubtaskFlow {
    pub fn new(store: Arc<dyn WorkflowStore>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { store, publisher }
    }

    /// Add a subtask to a card that is not yet done.
    ///
    /// The actor must hold an assignment on the card. The subtask is
    /// appended at the next position.
    pub async fn create(
        &self,
        card_id: Id,
        input: NewSubtask,
        ctx: &dyn UserContext,
    ) -> TbResult<Subtask> {
        let card = self.store.card(card_id).await?;
        if card.status == CardStatus::Done {
            return Err(TbError::precondition("Cannot add subtasks to a done card"));
        }
        if !self.store.is_card_assignee(card_id, ctx.user_id()).await? {
            return Err(TbError::forbidden(
                "Only a card assignee can add subtasks to it",
            ));
        }

        let mut subtask = Subtask::new(card_id, input.title, ctx.user_id());
        subtask.description = input.description;
        subtask.estimated_hours = input.estimated_hours;
        subtask.assigned_to = input.assigned_to;
        subtask
            .validate()
            .map_err(|e| TbError::validation(e.to_string()))?;

        let subtask = self.store.insert_subtask(subtask).await?;
        info!(card_id, subtask_id = ?subtask.id, "Subtask created");

        self.publisher.publish(
            RoomKind::Card(card_id),
            DomainEvent::SubtaskAdded {
                subtask: subtask.clone(),
            },
        );
        if let Some(assignee) = subtask.assigned_to {
            self.publisher.publish(
                RoomKind::User(assignee),
                DomainEvent::SubtaskAssigned {
                    subtask: subtask.clone(),
                },
            );
        }
        Ok(subtask)
    }

    pub async fn list_by_card(&self, card_id: Id) -> TbResult<Vec<Subtask>> {
        self.store.card(card_id).await?;
        self.store.subtasks_by_card(card_id).await
    }

    pub async fn assign(&self, subtask_id: Id, user_id: Id) -> TbResult<Subtask> {
        let subtask = self.store.update_subtask_assignee(subtask_id, user_id).await?;
        self.publisher.publish(
            RoomKind::Card(subtask.card_id),
            DomainEvent::SubtaskAssigned {
                subtask: subtask.clone(),
            },
        );
        self.publisher.publish(
            RoomKind::User(user_id),
            DomainEvent::SubtaskAssigned {
                subtask: subtask.clone(),
            },
        );
        Ok(subtask)
    }

    /// Decide on a subtask that is in review.
    ///
    /// Approved: subtask → done; when every sibling is now done the card
    /// settles as done with its hours and completed assignments, otherwise
    /// a card sitting in review drops back to in_progress.
    /// Rejected: subtask → in_progress, the card (if in review) follows,
    /// and a `reject` comment with the reason lands on the card; the
    /// assignee is nudged on their user room.
    pub async fn review(
        &self,
        subtask_id: Id,
        decision: ReviewDecision,
        reason: Option<String>,
        ctx: &dyn UserContext,
    ) -> TbResult<Subtask> {
        if !ctx.is_admin() && !ctx.is_team_lead() {
            return Err(TbError::forbidden(
                "Only a lead or admin can review a subtask",
            ));
        }
        let before = self.store.subtask(subtask_id).await?;
        if before.status != SubtaskStatus::Review {
            return Err(TbError::precondition(format!(
                "Subtask must be in review to decide, was {}",
                before.status.as_str()
            )));
        }

        let subtask = self
            .store
            .review_subtask_tx(subtask_id, Some(ctx.user_id()), decision)
            .await?;
        let card = self.store.card(subtask.card_id).await?;
        let card_id = subtask.card_id;
        let now = Utc::now();

        info!(
            subtask_id,
            card_id,
            decision = ?decision,
            "Subtask reviewed"
        );

        self.publisher.publish(
            RoomKind::Card(card_id),
            DomainEvent::SubtaskStatusChanged {
                trigger: StatusTrigger::ReviewUpdate,
                subtask_id,
                card_id,
                status: subtask.status,
                user_id: subtask.assigned_to,
                reviewer_id: Some(ctx.user_id()),
                at: now,
            },
        );

        match decision {
            ReviewDecision::Approved => {
                let all_done = self
                    .store
                    .subtasks_by_card(card_id)
                    .await?
                    .iter()
                    .all(|s| s.status == SubtaskStatus::Done);
                if all_done {
                    let total_actual_hours = settled_hours(self.store.as_ref(), card_id).await?;
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
                    self.publish_card_change(
                        &card,
                        CardStatus::Done,
                        Some(total_actual_hours),
                        now,
                        ctx,
                    );
                } else if card.status == CardStatus::Review {
                    self.store
                        .transact(vec![WriteOp::SetCardStatus {
                            card_id,
                            status: CardStatus::InProgress,
                        }])
                        .await?;
                    self.publish_card_change(&card, CardStatus::InProgress, None, now, ctx);
                }
            }
            ReviewDecision::Rejected => {
                let reason_text = reason
                    .clone()
                    .unwrap_or_else(|| "Subtask was rejected in review".to_string());
                let mut comment = Comment::new(card_id, ctx.user_id(), reason_text.clone());
                comment.subtask_id = Some(subtask_id);
                comment.category = CommentCategory::Reject;

                let mut ops = vec![WriteOp::InsertComment(comment)];
                if card.status == CardStatus::Review {
                    ops.push(WriteOp::SetCardStatus {
                        card_id,
                        status: CardStatus::InProgress,
                    });
                }
                let outcome = self.store.transact(ops).await?;
                let comment = outcome
                    .comment
                    .ok_or_else(|| TbError::Internal("transaction returned no comment".into()))?;

                self.publisher.publish(
                    RoomKind::Card(card_id),
                    DomainEvent::CommentNew {
                        comment: comment.clone(),
                    },
                );
                if card.status == CardStatus::Review {
                    self.publish_card_change(&card, CardStatus::InProgress, None, now, ctx);
                }
                if let Some(assignee) = subtask.assigned_to {
                    self.publisher.publish(
                        RoomKind::User(assignee),
                        DomainEvent::SubtaskRejected {
                            subtask_id,
                            reason: reason_text,
                            comment,
                        },
                    );
                }
            }
        }

        self.store.subtask(subtask_id).await
    }

    fn publish_card_change(
        &self,
        card: &tb_models::Card,
        new_status: CardStatus,
        total_actual_hours: Option<f64>,
        at: chrono::DateTime<Utc>,
        ctx: &dyn UserContext,
    ) {
        if let Some(card_id) = card.id {
            self.publisher.publish(
                RoomKind::Board(card.board_id),
                DomainEvent::CardStatusChanged {
                    trigger: StatusTrigger::ReviewUpdate,
                    card_id,
                    board_id: card.board_id,
                    new_status,
                    user_id: Some(ctx.user_id()),
                    total_actual_hours,
                    at,
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use tb_models::{Assignment, Board, Card, Project};
    use tb_realtime::broadcast::RecordingPublisher;

    struct Lead;
    impl UserContext for Lead {
        fn user_id(&self) -> Id {
            1
        }
        fn is_admin(&self) -> bool {
            false
        }
        fn is_team_lead(&self) -> bool {
            true
        }
    }

    struct Member;
    impl UserContext for Member {
        fn user_id(&self) -> Id {
            7
        }
        fn is_admin(&self) -> bool {
            false
        }
        fn is_team_lead(&self) -> bool {
            false
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        publisher: Arc<RecordingPublisher>,
        flow: SubtaskFlow,
        board_id: Id,
        card_id: Id,
    }

    async fn fixture(card_status: CardStatus) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let project = store.seed_project(Project::new("p", 1)).await;
        let board = store
            .seed_board(Board::new(project.id.unwrap(), "b"))
            .await;
        let board_id = board.id.unwrap();
        let mut card = Card::new(board_id, "c", 1);
        card.status = card_status;
        let card = store.seed_card(card).await;
        let card_id = card.id.unwrap();
        store.seed_assignment(Assignment::new(card_id, 7)).await;
        let flow = SubtaskFlow::new(store.clone(), publisher.clone());
        Fixture {
            store,
            publisher,
            flow,
            board_id,
            card_id,
        }
    }

    async fn seed_review_subtask(f: &Fixture, assignee: Id) -> Id {
        let mut subtask = Subtask::new(f.card_id, "s", 1);
        subtask.status = SubtaskStatus::Review;
        subtask.assigned_to = Some(assignee);
        f.store.seed_subtask(subtask).await.id.unwrap()
    }

    #[tokio::test]
    async fn test_create_refused_on_done_card() {
        let f = fixture(CardStatus::Done).await;
        let err = f
            .flow
            .create(
                f.card_id,
                NewSubtask {
                    title: "late".into(),
                    ..Default::default()
                },
                &Member,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TbError::Precondition { .. }));
    }

    #[tokio::test]
    async fn test_create_requires_card_assignment() {
        let f = fixture(CardStatus::InProgress).await;
        // Lead (user 1) holds no assignment on this card.
        let err = f
            .flow
            .create(
                f.card_id,
                NewSubtask {
                    title: "s".into(),
                    ..Default::default()
                },
                &Lead,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TbError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn test_create_appends_and_broadcasts() {
        let f = fixture(CardStatus::InProgress).await;
        f.store
            .seed_subtask(Subtask::new(f.card_id, "first", 1))
            .await;

        let subtask = f
            .flow
            .create(
                f.card_id,
                NewSubtask {
                    title: "second".into(),
                    assigned_to: Some(9),
                    ..Default::default()
                },
                &Member,
            )
            .await
            .unwrap();
        assert_eq!(subtask.position, 2);
        assert_eq!(
            f.publisher.event_names(),
            vec!["subtask_added", "subtask_assigned"]
        );
        assert_eq!(
            f.publisher.rooms(),
            vec![RoomKind::Card(f.card_id), RoomKind::User(9)]
        );
    }

    #[tokio::test]
    async fn test_approve_last_subtask_settles_card() {
        let f = fixture(CardStatus::Review).await;
        let subtask_id = seed_review_subtask(&f, 7).await;

        let subtask = f
            .flow
            .review(subtask_id, ReviewDecision::Approved, None, &Lead)
            .await
            .unwrap();
        assert_eq!(subtask.status, SubtaskStatus::Done);

        let card = f.store.card(f.card_id).await.unwrap();
        assert_eq!(card.status, CardStatus::Done);

        let assignments = f.store.assignments_by_card(f.card_id).await.unwrap();
        assert_eq!(assignments[0].status, AssignmentStatus::Completed);

        assert_eq!(
            f.publisher.event_names(),
            vec!["subtask_status_changed", "card_status_changed"]
        );
        assert!(f
            .publisher
            .rooms()
            .contains(&RoomKind::Board(f.board_id)));
    }

    #[tokio::test]
    async fn test_approve_with_siblings_open_returns_card_to_in_progress() {
        let f = fixture(CardStatus::Review).await;
        let subtask_id = seed_review_subtask(&f, 7).await;
        f.store
            .seed_subtask(Subtask::new(f.card_id, "open sibling", 1))
            .await;

        f.flow
            .review(subtask_id, ReviewDecision::Approved, None, &Lead)
            .await
            .unwrap();

        let card = f.store.card(f.card_id).await.unwrap();
        assert_eq!(card.status, CardStatus::InProgress);
    }

    #[tokio::test]
    async fn test_reject_creates_comment_and_reverts_card() {
        let f = fixture(CardStatus::Review).await;
        let subtask_id = seed_review_subtask(&f, 7).await;

        let subtask = f
            .flow
            .review(
                subtask_id,
                ReviewDecision::Rejected,
                Some("needs error handling".into()),
                &Lead,
            )
            .await
            .unwrap();
        assert_eq!(subtask.status, SubtaskStatus::InProgress);
        assert_eq!(subtask.review_status, Some(ReviewDecision::Rejected));

        let card = f.store.card(f.card_id).await.unwrap();
        assert_eq!(card.status, CardStatus::InProgress);

        let comments = f.store.comments_by_card(f.card_id).await.unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].category, CommentCategory::Reject);
        assert_eq!(comments[0].text, "needs error handling");
        assert_eq!(comments[0].subtask_id, Some(subtask_id));

        let names = f.publisher.event_names();
        assert!(names.contains(&"comment:new"));
        assert!(names.contains(&"subtask_rejected"));
        assert!(f.publisher.rooms().contains(&RoomKind::User(7)));
    }

    #[tokio::test]
    async fn test_review_requires_subtask_in_review() {
        let f = fixture(CardStatus::InProgress).await;
        let subtask = f
            .store
            .seed_subtask(Subtask::new(f.card_id, "s", 1))
            .await;

        let err = f
            .flow
            .review(subtask.id.unwrap(), ReviewDecision::Approved, None, &Lead)
            .await
            .unwrap_err();
        assert!(matches!(err, TbError::Precondition { .. }));
    }

    #[tokio::test]
    async fn test_review_requires_lead_or_admin() {
        let f = fixture(CardStatus::Review).await;
        let subtask_id = seed_review_subtask(&f, 7).await;
        let err = f
            .flow
            .review(subtask_id, ReviewDecision::Approved, None, &Member)
            .await
            .unwrap_err();
        assert!(matches!(err, TbError::Forbidden { .. }));
    }
}
