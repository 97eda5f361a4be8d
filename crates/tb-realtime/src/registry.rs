//! Room membership registry
//!
//! Tracks which live connections are subscribed to which rooms. Process-local
//! and in-memory: membership is lost on restart and clients re-join on
//! reconnect. Mutated only by join/leave/disconnect; read only by the
//! broadcaster.

use std::collections::HashSet;

use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::room::RoomKind;

/// Opaque identifier of one realtime connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error)]
pub enum JoinError {
    #[error("too many rooms for this connection")]
    TooManyRooms,
    #[error("connection is not registered")]
    UnknownConnection,
}

/// Registry of room subscriptions with per-connection outbound senders
pub struct RoomRegistry {
    /// room key -> subscriber connection ids
    rooms: DashMap<String, HashSet<ConnectionId>>,
    /// connection id -> room keys it joined
    by_connection: DashMap<ConnectionId, HashSet<String>>,
    /// connection id -> outbound channel of serialized events
    senders: DashMap<ConnectionId, mpsc::Sender<String>>,
    /// Max rooms one connection may join
    max_rooms_per_connection: u32,
}

impl RoomRegistry {
    pub fn new(max_rooms_per_connection: u32) -> Self {
        Self {
            rooms: DashMap::new(),
            by_connection: DashMap::new(),
            senders: DashMap::new(),
            max_rooms_per_connection,
        }
    }

    /// Register a new connection with its outbound sender.
    ///
    /// Must be called before the connection can join rooms.
    pub fn register(&self, connection_id: ConnectionId, sender: mpsc::Sender<String>) {
        self.senders.insert(connection_id, sender);
        self.by_connection.insert(connection_id, HashSet::new());
        debug!(connection_id = %connection_id, "Registered realtime connection");
    }

    /// Subscribe a connection to a room. Idempotent.
    pub fn join(&self, connection_id: ConnectionId, room: RoomKind) -> Result<(), JoinError> {
        let mut joined = self
            .by_connection
            .get_mut(&connection_id)
            .ok_or(JoinError::UnknownConnection)?;

        let key = room.room_key();
        if joined.contains(&key) {
            return Ok(());
        }
        if joined.len() as u32 >= self.max_rooms_per_connection {
            return Err(JoinError::TooManyRooms);
        }

        joined.insert(key.clone());
        self.rooms.entry(key.clone()).or_default().insert(connection_id);

        debug!(connection_id = %connection_id, room = %key, "Joined room");
        Ok(())
    }

    /// Unsubscribe a connection from a room. Unknown memberships are ignored.
    pub fn leave(&self, connection_id: ConnectionId, room: RoomKind) {
        let key = room.room_key();
        if let Some(mut joined) = self.by_connection.get_mut(&connection_id) {
            joined.remove(&key);
        }
        if let Some(mut members) = self.rooms.get_mut(&key) {
            members.remove(&connection_id);
        }
        debug!(connection_id = %connection_id, room = %key, "Left room");
    }

    /// Drop a connection and all its memberships (implicit cleanup on
    /// disconnect; no explicit leave required).
    pub fn remove_connection(&self, connection_id: ConnectionId) {
        self.senders.remove(&connection_id);
        if let Some((_, joined)) = self.by_connection.remove(&connection_id) {
            for key in joined {
                if let Some(mut members) = self.rooms.get_mut(&key) {
                    members.remove(&connection_id);
                }
            }
        }
        debug!(connection_id = %connection_id, "Removed realtime connection");
    }

    /// Subscribers of a room, with their senders
    pub(crate) fn subscribers(&self, room: &RoomKind) -> Vec<(ConnectionId, mpsc::Sender<String>)> {
        let key = room.room_key();
        let Some(members) = self.rooms.get(&key) else {
            return Vec::new();
        };
        members
            .iter()
            .filter_map(|id| self.senders.get(id).map(|s| (*id, s.clone())))
            .collect()
    }

    /// Whether a connection is currently in a room
    pub fn is_member(&self, connection_id: ConnectionId, room: &RoomKind) -> bool {
        self.rooms
            .get(&room.room_key())
            .map(|members| members.contains(&connection_id))
            .unwrap_or(false)
    }

    pub fn room_size(&self, room: &RoomKind) -> usize {
        self.rooms
            .get(&room.room_key())
            .map(|members| members.len())
            .unwrap_or(0)
    }

    pub fn connection_count(&self) -> usize {
        self.by_connection.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registered(registry: &RoomRegistry) -> (ConnectionId, mpsc::Receiver<String>) {
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::channel(8);
        registry.register(id, tx);
        (id, rx)
    }

    #[test]
    fn test_join_is_idempotent() {
        let registry = RoomRegistry::new(16);
        let (conn, _rx) = registered(&registry);

        registry.join(conn, RoomKind::Card(42)).unwrap();
        registry.join(conn, RoomKind::Card(42)).unwrap();

        assert_eq!(registry.room_size(&RoomKind::Card(42)), 1);
    }

    #[test]
    fn test_leave_removes_membership() {
        let registry = RoomRegistry::new(16);
        let (conn, _rx) = registered(&registry);

        registry.join(conn, RoomKind::Board(1)).unwrap();
        assert!(registry.is_member(conn, &RoomKind::Board(1)));

        registry.leave(conn, RoomKind::Board(1));
        assert!(!registry.is_member(conn, &RoomKind::Board(1)));
    }

    #[test]
    fn test_disconnect_cleans_all_rooms() {
        let registry = RoomRegistry::new(16);
        let (conn, _rx) = registered(&registry);

        registry.join(conn, RoomKind::Board(1)).unwrap();
        registry.join(conn, RoomKind::Card(2)).unwrap();
        registry.join(conn, RoomKind::GlobalAnalytics).unwrap();

        registry.remove_connection(conn);

        assert_eq!(registry.room_size(&RoomKind::Board(1)), 0);
        assert_eq!(registry.room_size(&RoomKind::Card(2)), 0);
        assert_eq!(registry.room_size(&RoomKind::GlobalAnalytics), 0);
        assert_eq!(registry.connection_count(), 0);
    }

    #[test]
    fn test_room_limit() {
        let registry = RoomRegistry::new(2);
        let (conn, _rx) = registered(&registry);

        registry.join(conn, RoomKind::Board(1)).unwrap();
        registry.join(conn, RoomKind::Board(2)).unwrap();
        let result = registry.join(conn, RoomKind::Board(3));
        assert!(matches!(result, Err(JoinError::TooManyRooms)));
    }

    #[test]
    fn test_unregistered_connection_cannot_join() {
        let registry = RoomRegistry::new(16);
        let result = registry.join(ConnectionId::new(), RoomKind::Card(1));
        assert!(matches!(result, Err(JoinError::UnknownConnection)));
    }
}
