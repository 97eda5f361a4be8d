//! Store-backed analytics snapshots
//!
//! The realtime relay only needs a JSON payload to push into the analytics
//! rooms; these snapshots are computed straight from the workflow store.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use tb_core::error::TbResult;
use tb_core::traits::Id;
use tb_workflow::{ReportingClient, WorkflowStore};

pub struct StoreReportingClient {
    store: Arc<dyn WorkflowStore>,
}

impl StoreReportingClient {
    pub fn new(store: Arc<dyn WorkflowStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ReportingClient for StoreReportingClient {
    async fn board_snapshot(&self, board_id: Id) -> TbResult<serde_json::Value> {
        let board = self.store.board(board_id).await?;
        let cards = self.store.cards_by_board(board_id).await?;

        let mut by_status: BTreeMap<&'static str, usize> = BTreeMap::new();
        let mut estimated_hours = 0.0;
        let mut actual_hours = 0.0;
        for card in &cards {
            *by_status.entry(card.status.as_str()).or_insert(0) += 1;
            estimated_hours += card.estimated_hours.unwrap_or(0.0);
            actual_hours += card.actual_hours.unwrap_or(0.0);
        }

        Ok(serde_json::json!({
            "board_id": board_id,
            "board_name": board.name,
            "total_cards": cards.len(),
            "by_status": by_status,
            "estimated_hours": estimated_hours,
            "actual_hours": actual_hours,
        }))
    }

    async fn global_snapshot(&self) -> TbResult<serde_json::Value> {
        let projects = self.store.projects().await?;

        let mut by_status: BTreeMap<&'static str, usize> = BTreeMap::new();
        for project in &projects {
            *by_status.entry(project.status.as_str()).or_insert(0) += 1;
        }

        Ok(serde_json::json!({
            "total_projects": projects.len(),
            "by_status": by_status,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tb_models::{Board, Card, CardStatus, Project};
    use tb_workflow::MemoryStore;

    #[tokio::test]
    async fn test_board_snapshot_counts_statuses() {
        let store = Arc::new(MemoryStore::new());
        let board = store.seed_board(Board::new(0, "Sprint")).await;
        let board_id = board.id.unwrap();
        let mut done = Card::new(board_id, "Finished", 1);
        done.status = CardStatus::Done;
        done.actual_hours = Some(3.5);
        store.seed_card(done).await;
        store.seed_card(Card::new(board_id, "Pending", 1)).await;

        let reporting = StoreReportingClient::new(store);
        let snapshot = reporting.board_snapshot(board_id).await.unwrap();

        assert_eq!(snapshot["total_cards"], 2);
        assert_eq!(snapshot["by_status"]["done"], 1);
        assert_eq!(snapshot["by_status"]["todo"], 1);
        assert_eq!(snapshot["actual_hours"], 3.5);
    }

    #[tokio::test]
    async fn test_global_snapshot_counts_projects() {
        let store = Arc::new(MemoryStore::new());
        store.seed_project(Project::new("One", 1)).await;
        store.seed_project(Project::new("Two", 1)).await;

        let reporting = StoreReportingClient::new(store);
        let snapshot = reporting.global_snapshot().await.unwrap();

        assert_eq!(snapshot["total_projects"], 2);
    }
}
