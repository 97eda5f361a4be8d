//! Blockers
//!
//! Impediments reported against a card or a subtask. The report/solve logic
//! is written once over [`BlockerTarget`]; the only difference between the
//! two targets is the room the events land in: card blockers go to the
//! board room, subtask blockers to the card room.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use tb_core::error::{TbError, TbResult};
use tb_core::traits::{Id, UserContext};
use tb_models::{Blocker, BlockerTarget};
use tb_realtime::broadcast::EventPublisher;
use tb_realtime::event::DomainEvent;
use tb_realtime::room::RoomKind;

use crate::store::{WorkflowStore, WriteOp};

pub struct BlockerFlow {
    store: Arc<dyn WorkflowStore>,
    publisher: Arc<dyn EventPublisher>,
}

/// Where a blocker's events go, and the ids its payload carries
struct BlockerScope {
    room: RoomKind,
    board_id: Option<Id>,
    card_id: Option<Id>,
}

impl BlockerFlow {
    pub fn new(store: Arc<dyn WorkflowStore>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { store, publisher }
    }

    pub async fn report(
        &self,
        target: BlockerTarget,
        reason: String,
        ctx: &dyn UserContext,
    ) -> TbResult<Blocker> {
        if reason.trim().is_empty() {
            return Err(TbError::validation("Blocker reason is required"));
        }
        let scope = self.scope(target).await?;

        let blocker = self
            .store
            .insert_blocker(Blocker::new(target, reason, ctx.user_id()))
            .await?;
        info!(
            target_kind = target.kind(),
            target_id = target.target_id(),
            "Blocker reported"
        );

        self.publisher.publish(
            scope.room,
            DomainEvent::BlockerReported {
                blocker: blocker.clone(),
                board_id: scope.board_id,
                card_id: scope.card_id,
            },
        );
        Ok(blocker)
    }

    /// Resolve a blocker with its solution. A blocker resolves exactly once.
    pub async fn solve(
        &self,
        blocker_id: Id,
        solution: String,
        ctx: &dyn UserContext,
    ) -> TbResult<Blocker> {
        if solution.trim().is_empty() {
            return Err(TbError::validation("Blocker solution is required"));
        }
        let blocker = self.store.blocker(blocker_id).await?;
        if blocker.is_resolved {
            return Err(TbError::precondition("Blocker is already resolved"));
        }
        let scope = self.scope(blocker.target).await?;

        self.store
            .transact(vec![WriteOp::ResolveBlocker {
                blocker_id,
                solution,
                resolved_by: ctx.user_id(),
                resolved_at: Utc::now(),
            }])
            .await?;
        let blocker = self.store.blocker(blocker_id).await?;
        info!(blocker_id, "Blocker solved");

        self.publisher.publish(
            scope.room,
            DomainEvent::BlockerSolved {
                blocker: blocker.clone(),
                board_id: scope.board_id,
                card_id: scope.card_id,
            },
        );
        Ok(blocker)
    }

    pub async fn list_for_card(&self, card_id: Id) -> TbResult<Vec<Blocker>> {
        self.store.card(card_id).await?;
        self.store.blockers_for_card(card_id).await
    }

    pub async fn list_for_subtask(&self, subtask_id: Id) -> TbResult<Vec<Blocker>> {
        self.store.subtask(subtask_id).await?;
        self.store.blockers_for_subtask(subtask_id).await
    }

    async fn scope(&self, target: BlockerTarget) -> TbResult<BlockerScope> {
        match target {
            BlockerTarget::Card(card_id) => {
                let card = self.store.card(card_id).await?;
                Ok(BlockerScope {
                    room: RoomKind::Board(card.board_id),
                    board_id: Some(card.board_id),
                    card_id: Some(card_id),
                })
            }
            BlockerTarget::Subtask(subtask_id) => {
                let subtask = self.store.subtask(subtask_id).await?;
                Ok(BlockerScope {
                    room: RoomKind::Card(subtask.card_id),
                    board_id: None,
                    card_id: Some(subtask.card_id),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use tb_models::{Board, Card, Project, Subtask};
    use tb_realtime::broadcast::RecordingPublisher;

    struct Reporter;
    impl UserContext for Reporter {
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
        flow: BlockerFlow,
        board_id: Id,
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
        let board_id = board.id.unwrap();
        let card = store.seed_card(Card::new(board_id, "c", 1)).await;
        let card_id = card.id.unwrap();
        let subtask = store.seed_subtask(Subtask::new(card_id, "s", 1)).await;
        let flow = BlockerFlow::new(store.clone(), publisher.clone());
        Fixture {
            store,
            publisher,
            flow,
            board_id,
            card_id,
            subtask_id: subtask.id.unwrap(),
        }
    }

    #[tokio::test]
    async fn test_card_blocker_lands_in_board_room() {
        let f = fixture().await;
        f.flow
            .report(BlockerTarget::Card(f.card_id), "waiting on api".into(), &Reporter)
            .await
            .unwrap();
        assert_eq!(f.publisher.event_names(), vec!["blocker_reported"]);
        assert_eq!(f.publisher.rooms(), vec![RoomKind::Board(f.board_id)]);
    }

    #[tokio::test]
    async fn test_subtask_blocker_lands_in_card_room() {
        let f = fixture().await;
        f.flow
            .report(
                BlockerTarget::Subtask(f.subtask_id),
                "missing creds".into(),
                &Reporter,
            )
            .await
            .unwrap();
        assert_eq!(f.publisher.rooms(), vec![RoomKind::Card(f.card_id)]);
    }

    #[tokio::test]
    async fn test_solve_is_once_only() {
        let f = fixture().await;
        let blocker = f
            .flow
            .report(BlockerTarget::Card(f.card_id), "stuck".into(), &Reporter)
            .await
            .unwrap();
        let blocker_id = blocker.id.unwrap();

        let solved = f
            .flow
            .solve(blocker_id, "worked around it".into(), &Reporter)
            .await
            .unwrap();
        assert!(solved.is_resolved);
        assert_eq!(solved.solution.as_deref(), Some("worked around it"));
        assert_eq!(solved.resolved_by, Some(7));

        let err = f
            .flow
            .solve(blocker_id, "again".into(), &Reporter)
            .await
            .unwrap_err();
        assert!(matches!(err, TbError::Precondition { .. }));

        // First solution intact.
        let stored = f.store.blocker(blocker_id).await.unwrap();
        assert_eq!(stored.solution.as_deref(), Some("worked around it"));
    }

    #[tokio::test]
    async fn test_report_against_missing_target() {
        let f = fixture().await;
        let err = f
            .flow
            .report(BlockerTarget::Subtask(9999), "ghost".into(), &Reporter)
            .await
            .unwrap_err();
        assert!(matches!(err, TbError::NotFound { .. }));
    }
}
