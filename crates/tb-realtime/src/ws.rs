//! WebSocket endpoint for the realtime surface
//!
//! Clients connect, then send JSON control messages to join or leave rooms:
//!
//! ```json
//! {"action": "join_card", "card_id": 42}
//! {"action": "leave_board", "board_id": 3}
//! {"action": "join_global_analytics"}
//! ```
//!
//! Domain events arrive on the same socket as `{"event": ..., "data": ...}`
//! envelopes. On disconnect the connection is removed from every room it
//! joined; clients re-join after reconnecting.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use tb_core::traits::Id;

use crate::broadcast::{Broadcaster, EventPublisher};
use crate::event::DomainEvent;
use crate::registry::ConnectionId;
use crate::room::RoomKind;

/// Control messages a client may send
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    JoinBoard { board_id: Id },
    LeaveBoard { board_id: Id },
    JoinCard { card_id: Id },
    LeaveCard { card_id: Id },
    JoinUser { user_id: Id },
    LeaveUser { user_id: Id },
    JoinBoardAnalytics { board_id: Id },
    LeaveBoardAnalytics { board_id: Id },
    JoinGlobalAnalytics,
    LeaveGlobalAnalytics,
    /// Typing indicator, relayed to the card room excluding the sender
    Typing { card_id: Id, user_id: Id },
}

impl ClientMessage {
    fn room(&self) -> Option<RoomKind> {
        match *self {
            ClientMessage::JoinBoard { board_id } | ClientMessage::LeaveBoard { board_id } => {
                Some(RoomKind::Board(board_id))
            }
            ClientMessage::JoinCard { card_id } | ClientMessage::LeaveCard { card_id } => {
                Some(RoomKind::Card(card_id))
            }
            ClientMessage::JoinUser { user_id } | ClientMessage::LeaveUser { user_id } => {
                Some(RoomKind::User(user_id))
            }
            ClientMessage::JoinBoardAnalytics { board_id }
            | ClientMessage::LeaveBoardAnalytics { board_id } => {
                Some(RoomKind::BoardAnalytics(board_id))
            }
            ClientMessage::JoinGlobalAnalytics | ClientMessage::LeaveGlobalAnalytics => {
                Some(RoomKind::GlobalAnalytics)
            }
            ClientMessage::Typing { .. } => None,
        }
    }

    fn is_join(&self) -> bool {
        matches!(
            self,
            ClientMessage::JoinBoard { .. }
                | ClientMessage::JoinCard { .. }
                | ClientMessage::JoinUser { .. }
                | ClientMessage::JoinBoardAnalytics { .. }
                | ClientMessage::JoinGlobalAnalytics
        )
    }
}

/// Drive one WebSocket connection until it closes.
///
/// `send_buffer` bounds the outbound queue; a client that cannot keep up
/// loses events (at-most-once delivery).
pub async fn handle_socket(socket: WebSocket, broadcaster: Arc<Broadcaster>, send_buffer: usize) {
    let connection_id = ConnectionId::new();
    let registry = broadcaster.registry().clone();

    let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(send_buffer);
    registry.register(connection_id, outbound_tx);
    info!(connection_id = %connection_id, "Realtime connection opened");

    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            // Fan-out: events queued for this connection
            queued = outbound_rx.recv() => {
                match queued {
                    Some(payload) => {
                        if sink.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            // Inbound: control messages from the client
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_message(&text, connection_id, &broadcaster);
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sink.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Binary(_))) => {
                        debug!(connection_id = %connection_id, "Ignoring binary frame");
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        warn!(connection_id = %connection_id, error = %e, "WebSocket error");
                        break;
                    }
                }
            }
        }
    }

    registry.remove_connection(connection_id);
    info!(connection_id = %connection_id, "Realtime connection closed");
}

fn handle_client_message(
    text: &str,
    connection_id: ConnectionId,
    broadcaster: &Arc<Broadcaster>,
) {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            debug!(connection_id = %connection_id, error = %e, "Ignoring malformed control message");
            return;
        }
    };

    if let ClientMessage::Typing { card_id, user_id } = message {
        broadcaster.publish_except(
            RoomKind::Card(card_id),
            Some(connection_id),
            DomainEvent::UserTyping { card_id, user_id },
        );
        return;
    }

    let room = message.room().expect("non-typing messages carry a room");
    if message.is_join() {
        if let Err(e) = broadcaster.registry().join(connection_id, room) {
            warn!(connection_id = %connection_id, room = %room, error = %e, "Join refused");
        }
    } else {
        broadcaster.registry().leave(connection_id, room);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_join_card() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"action":"join_card","card_id":42}"#).unwrap();
        assert_eq!(msg, ClientMessage::JoinCard { card_id: 42 });
        assert_eq!(msg.room(), Some(RoomKind::Card(42)));
        assert!(msg.is_join());
    }

    #[test]
    fn test_parse_global_analytics() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"action":"join_global_analytics"}"#).unwrap();
        assert_eq!(msg.room(), Some(RoomKind::GlobalAnalytics));
    }

    #[test]
    fn test_parse_leave_is_not_join() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"action":"leave_board","board_id":3}"#).unwrap();
        assert!(!msg.is_join());
        assert_eq!(msg.room(), Some(RoomKind::Board(3)));
    }

    #[test]
    fn test_typing_has_no_room() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"action":"typing","card_id":1,"user_id":2}"#).unwrap();
        assert_eq!(msg.room(), None);
    }

    #[test]
    fn test_malformed_message_rejected() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"action":"explode"}"#).is_err());
    }
}
