//! Time-tracking ledger
//!
//! Start/end of work intervals, enforcing one active task per user:
//! at most one subtask in progress, at most one card assignment in progress,
//! at most one open log per (user, subtask). Starting and ending cascade
//! into subtask, card, assignment, and user status inside one transaction;
//! events go out only after the commit.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use tb_core::error::{TbError, TbResult};
use tb_core::traits::Id;
use tb_models::{AssignmentStatus, CardStatus, SubtaskStatus, TimeLog, UserTaskStatus};
use tb_realtime::broadcast::EventPublisher;
use tb_realtime::event::{DomainEvent, StatusTrigger};
use tb_realtime::room::RoomKind;

use crate::store::{WorkflowStore, WriteOp};

pub struct TimeLedger {
    store: Arc<dyn WorkflowStore>,
    publisher: Arc<dyn EventPublisher>,
}

impl TimeLedger {
    pub fn new(store: Arc<dyn WorkflowStore>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { store, publisher }
    }

    /// Open a time log on a subtask.
    ///
    /// Refused while the actor has a different subtask or a different card
    /// assignment in progress; restarting the same subtask (after a
    /// rejection sent it back) is allowed. Cascades: subtask and card to
    /// in_progress, assignment to in_progress, user to working.
    pub async fn start(&self, user_id: Id, subtask_id: Id) -> TbResult<TimeLog> {
        let subtask = self.store.subtask(subtask_id).await?;
        let card = self.store.card(subtask.card_id).await?;

        if subtask.status == SubtaskStatus::Done {
            return Err(TbError::precondition("Subtask is already done"));
        }

        let busy_subtasks: Vec<Id> = self
            .store
            .active_subtasks_by_user(user_id)
            .await?
            .into_iter()
            .filter_map(|s| s.id)
            .filter(|id| *id != subtask_id)
            .collect();
        if !busy_subtasks.is_empty() {
            return Err(TbError::precondition_with_ids(
                "User already has a subtask in progress",
                busy_subtasks,
            ));
        }

        let busy_cards: Vec<Id> = self
            .store
            .active_assignments_by_user(user_id)
            .await?
            .into_iter()
            .map(|a| a.card_id)
            .filter(|id| *id != subtask.card_id)
            .collect();
        if !busy_cards.is_empty() {
            return Err(TbError::precondition_with_ids(
                "User already has a card in progress",
                busy_cards,
            ));
        }

        if self.store.open_time_log(user_id, subtask_id).await?.is_some() {
            return Err(TbError::precondition(
                "An open time log already exists for this subtask",
            ));
        }

        let now = Utc::now();
        let mut ops = vec![
            WriteOp::InsertTimeLog(TimeLog::open(subtask.card_id, subtask_id, user_id, now)),
            WriteOp::SetSubtaskStatus {
                subtask_id,
                status: SubtaskStatus::InProgress,
                assigned_to: Some(user_id),
                completed_by: None,
                review_status: None,
            },
        ];
        let card_started = card.status == CardStatus::Todo;
        if card_started {
            ops.push(WriteOp::SetCardStatus {
                card_id: subtask.card_id,
                status: CardStatus::InProgress,
            });
        }
        ops.push(WriteOp::SetAssignmentStatus {
            card_id: subtask.card_id,
            user_id: Some(user_id),
            status: AssignmentStatus::InProgress,
            started_at: Some(now),
            completed_at: None,
        });
        ops.push(WriteOp::SetUserTaskStatus {
            user_ids: vec![user_id],
            status: UserTaskStatus::Working,
        });

        let outcome = self.store.transact(ops).await?;
        let log = outcome
            .time_log
            .ok_or_else(|| TbError::Internal("transaction returned no time log".into()))?;

        info!(user_id, subtask_id, log_id = ?log.id, "Time log started");

        self.publisher.publish(
            RoomKind::Card(subtask.card_id),
            DomainEvent::SubtaskStatusChanged {
                trigger: StatusTrigger::Start,
                subtask_id,
                card_id: subtask.card_id,
                status: SubtaskStatus::InProgress,
                user_id: Some(user_id),
                reviewer_id: None,
                at: now,
            },
        );
        if card_started {
            self.publisher.publish(
                RoomKind::Board(card.board_id),
                DomainEvent::CardStatusChanged {
                    trigger: StatusTrigger::Start,
                    card_id: subtask.card_id,
                    board_id: card.board_id,
                    new_status: CardStatus::InProgress,
                    user_id: Some(user_id),
                    total_actual_hours: None,
                    at: now,
                },
            );
        }

        Ok(log)
    }

    /// Close the actor's open time log on a subtask.
    ///
    /// The actor must be the subtask's assignee. The most recent open log
    /// (latest start_time) is closed with a non-negative duration; the
    /// subtask moves to review with its actual_hours refreshed from the
    /// log aggregate, and the card follows to review while in_progress.
    pub async fn end(
        &self,
        user_id: Id,
        subtask_id: Id,
        description: Option<String>,
    ) -> TbResult<TimeLog> {
        let subtask = self.store.subtask(subtask_id).await?;
        if subtask.assigned_to != Some(user_id) {
            return Err(TbError::forbidden(
                "Only the assigned user can end work on a subtask",
            ));
        }

        let open = self
            .store
            .open_time_log(user_id, subtask_id)
            .await?
            .ok_or_else(|| TbError::not_found("TimeLog", "subtask_id", subtask_id))?;
        let log_id = open
            .id
            .ok_or_else(|| TbError::Internal("open time log without id".into()))?;

        let now = Utc::now();
        let duration_seconds = (now - open.start_time).num_seconds().max(0);
        let prior_seconds = self
            .store
            .total_logged_seconds_for_subtask(subtask_id)
            .await?;
        let actual_hours = (prior_seconds + duration_seconds) as f64 / 3600.0;

        let card = self.store.card(subtask.card_id).await?;
        let card_to_review = card.status == CardStatus::InProgress;

        let mut ops = vec![
            WriteOp::CloseTimeLog {
                log_id,
                end_time: now,
                duration_seconds,
                description,
            },
            WriteOp::SetSubtaskStatus {
                subtask_id,
                status: SubtaskStatus::Review,
                assigned_to: None,
                completed_by: Some(user_id),
                review_status: None,
            },
            WriteOp::SetSubtaskActualHours {
                subtask_id,
                hours: actual_hours,
            },
        ];
        if card_to_review {
            ops.push(WriteOp::SetCardStatus {
                card_id: subtask.card_id,
                status: CardStatus::Review,
            });
        }

        let outcome = self.store.transact(ops).await?;
        let log = outcome
            .time_log
            .ok_or_else(|| TbError::Internal("transaction returned no time log".into()))?;

        info!(
            user_id,
            subtask_id, duration_seconds, "Time log closed"
        );

        self.publisher.publish(
            RoomKind::Card(subtask.card_id),
            DomainEvent::SubtaskStatusChanged {
                trigger: StatusTrigger::End,
                subtask_id,
                card_id: subtask.card_id,
                status: SubtaskStatus::Review,
                user_id: Some(user_id),
                reviewer_id: None,
                at: now,
            },
        );
        if card_to_review {
            self.publisher.publish(
                RoomKind::Board(card.board_id),
                DomainEvent::CardStatusChanged {
                    trigger: StatusTrigger::End,
                    card_id: subtask.card_id,
                    board_id: card.board_id,
                    new_status: CardStatus::Review,
                    user_id: Some(user_id),
                    total_actual_hours: None,
                    at: now,
                },
            );
        }

        Ok(log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use tb_models::{Assignment, Board, Card, Project, Subtask};
    use tb_realtime::broadcast::RecordingPublisher;

    struct Fixture {
        store: Arc<MemoryStore>,
        publisher: Arc<RecordingPublisher>,
        ledger: TimeLedger,
        card_id: Id,
        subtask_id: Id,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let project = store.seed_project(Project::new("p", 1)).await;
        let board = store
            .seed_board(Board::new(project.id.unwrap(), "b"))
            .await;
        let card = store.seed_card(Card::new(board.id.unwrap(), "c", 1)).await;
        let card_id = card.id.unwrap();
        store.seed_assignment(Assignment::new(card_id, 7)).await;
        let subtask = store.seed_subtask(Subtask::new(card_id, "s", 1)).await;
        let ledger = TimeLedger::new(store.clone(), publisher.clone());
        Fixture {
            store,
            publisher,
            ledger,
            card_id,
            subtask_id: subtask.id.unwrap(),
        }
    }

    #[tokio::test]
    async fn test_start_cascades_statuses() {
        let f = fixture().await;
        let log = f.ledger.start(7, f.subtask_id).await.unwrap();
        assert!(log.is_open());

        let subtask = f.store.subtask(f.subtask_id).await.unwrap();
        assert_eq!(subtask.status, SubtaskStatus::InProgress);
        assert_eq!(subtask.assigned_to, Some(7));

        let card = f.store.card(f.card_id).await.unwrap();
        assert_eq!(card.status, CardStatus::InProgress);

        let assignments = f.store.assignments_by_card(f.card_id).await.unwrap();
        assert_eq!(assignments[0].status, AssignmentStatus::InProgress);
        assert!(assignments[0].started_at.is_some());

        assert_eq!(f.store.user_task_status(7).await, UserTaskStatus::Working);
        assert_eq!(
            f.publisher.event_names(),
            vec!["subtask_status_changed", "card_status_changed"]
        );
    }

    #[tokio::test]
    async fn test_start_refused_while_other_subtask_in_progress() {
        let f = fixture().await;
        let other = f
            .store
            .seed_subtask(Subtask::new(f.card_id, "other", 1))
            .await;
        f.ledger.start(7, f.subtask_id).await.unwrap();
        f.publisher.clear();

        let err = f.ledger.start(7, other.id.unwrap()).await.unwrap_err();
        match err {
            TbError::Precondition { offending_ids, .. } => {
                assert_eq!(offending_ids, vec![f.subtask_id]);
            }
            other => panic!("expected precondition, got {other:?}"),
        }

        // Refusal leaves the second subtask untouched and emits nothing.
        let untouched = f.store.subtask(other.id.unwrap()).await.unwrap();
        assert_eq!(untouched.status, SubtaskStatus::Todo);
        assert!(f.publisher.events().is_empty());
    }

    #[tokio::test]
    async fn test_same_subtask_restart_after_end() {
        let f = fixture().await;
        f.ledger.start(7, f.subtask_id).await.unwrap();
        f.ledger.end(7, f.subtask_id, None).await.unwrap();

        // Simulate a rejection sending the subtask back to in_progress.
        f.store
            .transact(vec![WriteOp::SetSubtaskStatus {
                subtask_id: f.subtask_id,
                status: SubtaskStatus::InProgress,
                assigned_to: Some(7),
                completed_by: None,
                review_status: None,
            }])
            .await
            .unwrap();

        // Same-subtask restart is allowed.
        let log = f.ledger.start(7, f.subtask_id).await.unwrap();
        assert!(log.is_open());
    }

    #[tokio::test]
    async fn test_start_with_open_log_refused() {
        let f = fixture().await;
        f.ledger.start(7, f.subtask_id).await.unwrap();
        let err = f.ledger.start(7, f.subtask_id).await.unwrap_err();
        assert!(matches!(err, TbError::Precondition { .. }));
    }

    #[tokio::test]
    async fn test_end_closes_log_and_moves_to_review() {
        let f = fixture().await;
        f.ledger.start(7, f.subtask_id).await.unwrap();
        f.publisher.clear();

        let log = f.ledger.end(7, f.subtask_id, Some("done".into())).await.unwrap();
        assert!(!log.is_open());
        assert!(log.duration_seconds.unwrap() >= 0);
        assert_eq!(log.description.as_deref(), Some("done"));

        let subtask = f.store.subtask(f.subtask_id).await.unwrap();
        assert_eq!(subtask.status, SubtaskStatus::Review);
        assert_eq!(subtask.completed_by, Some(7));
        assert!(subtask.actual_hours.is_some());

        let card = f.store.card(f.card_id).await.unwrap();
        assert_eq!(card.status, CardStatus::Review);
        assert_eq!(
            f.publisher.event_names(),
            vec!["subtask_status_changed", "card_status_changed"]
        );
    }

    #[tokio::test]
    async fn test_double_end_is_not_found() {
        let f = fixture().await;
        f.ledger.start(7, f.subtask_id).await.unwrap();
        let first = f.ledger.end(7, f.subtask_id, None).await.unwrap();

        let err = f.ledger.end(7, f.subtask_id, None).await.unwrap_err();
        assert!(matches!(err, TbError::NotFound { .. }));

        // First result intact.
        let stored = f.store.time_log(first.id.unwrap()).await.unwrap();
        assert_eq!(stored.duration_seconds, first.duration_seconds);
    }

    #[tokio::test]
    async fn test_end_requires_assignee() {
        let f = fixture().await;
        f.ledger.start(7, f.subtask_id).await.unwrap();
        let err = f.ledger.end(99, f.subtask_id, None).await.unwrap_err();
        assert!(matches!(err, TbError::Forbidden { .. }));
    }
}
