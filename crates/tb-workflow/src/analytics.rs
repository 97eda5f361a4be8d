//! Analytics relay
//!
//! The workflow layer does not aggregate anything itself; it asks an opaque
//! reporting collaborator for a fresh snapshot and republishes it to the
//! analytics rooms so dashboards refetch.

use std::sync::Arc;

use async_trait::async_trait;

use tb_core::error::TbResult;
use tb_core::traits::Id;
use tb_realtime::broadcast::EventPublisher;
use tb_realtime::event::DomainEvent;
use tb_realtime::room::RoomKind;

/// Opaque reporting backend producing analytics snapshots
#[async_trait]
pub trait ReportingClient: Send + Sync {
    async fn board_snapshot(&self, board_id: Id) -> TbResult<serde_json::Value>;
    async fn global_snapshot(&self) -> TbResult<serde_json::Value>;
}

pub struct AnalyticsRelay {
    client: Arc<dyn ReportingClient>,
    publisher: Arc<dyn EventPublisher>,
}

impl AnalyticsRelay {
    pub fn new(client: Arc<dyn ReportingClient>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { client, publisher }
    }

    pub async fn refresh_board(&self, board_id: Id) -> TbResult<serde_json::Value> {
        let data = self.client.board_snapshot(board_id).await?;
        self.publisher.publish(
            RoomKind::BoardAnalytics(board_id),
            DomainEvent::AnalyticsRefetch {
                board_id,
                data: data.clone(),
            },
        );
        Ok(data)
    }

    pub async fn refresh_global(&self) -> TbResult<serde_json::Value> {
        let data = self.client.global_snapshot().await?;
        self.publisher.publish(
            RoomKind::GlobalAnalytics,
            DomainEvent::AnalyticsRefetchGlobal { data: data.clone() },
        );
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tb_realtime::broadcast::RecordingPublisher;

    struct StubReporting;

    #[async_trait]
    impl ReportingClient for StubReporting {
        async fn board_snapshot(&self, board_id: Id) -> TbResult<serde_json::Value> {
            Ok(json!({ "board_id": board_id, "done": 3 }))
        }

        async fn global_snapshot(&self) -> TbResult<serde_json::Value> {
            Ok(json!({ "projects": 12 }))
        }
    }

    #[tokio::test]
    async fn test_board_refresh_targets_board_analytics_room() {
        let publisher = Arc::new(RecordingPublisher::new());
        let relay = AnalyticsRelay::new(Arc::new(StubReporting), publisher.clone());

        let data = relay.refresh_board(5).await.unwrap();
        assert_eq!(data["done"], 3);
        assert_eq!(publisher.rooms(), vec![RoomKind::BoardAnalytics(5)]);
        assert_eq!(publisher.event_names(), vec!["analytics_refetch"]);
    }

    #[tokio::test]
    async fn test_global_refresh_targets_global_room() {
        let publisher = Arc::new(RecordingPublisher::new());
        let relay = AnalyticsRelay::new(Arc::new(StubReporting), publisher.clone());

        relay.refresh_global().await.unwrap();
        assert_eq!(publisher.rooms(), vec![RoomKind::GlobalAnalytics]);
        assert_eq!(
            publisher.event_names(),
            vec!["analytics_refetch_global"]
        );
    }
}
