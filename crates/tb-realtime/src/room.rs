//! Logical room identifiers
//!
//! Rooms are keyed deterministically from entity ids. The enum is the only
//! representation used inside the system; `room_key` is the single place the
//! wire strings exist.

use serde::{Deserialize, Serialize};
use tb_core::traits::Id;

/// A logical broadcast group of realtime connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum RoomKind {
    /// All members viewing a board
    Board(Id),
    /// All members with a card open
    Card(Id),
    /// A single user's private notification room
    User(Id),
    /// Analytics dashboard scoped to one board
    BoardAnalytics(Id),
    /// The global analytics dashboard (super admins)
    GlobalAnalytics,
}

impl RoomKind {
    /// Deterministic wire key for this room
    pub fn room_key(&self) -> String {
        match self {
            RoomKind::Board(id) => format!("board_{id}"),
            RoomKind::Card(id) => format!("card_{id}"),
            RoomKind::User(id) => format!("user_{id}"),
            RoomKind::BoardAnalytics(id) => format!("board_analytics_{id}"),
            RoomKind::GlobalAnalytics => "global_analytics".to_string(),
        }
    }
}

impl std::fmt::Display for RoomKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.room_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_keys() {
        assert_eq!(RoomKind::Board(12).room_key(), "board_12");
        assert_eq!(RoomKind::Card(42).room_key(), "card_42");
        assert_eq!(RoomKind::User(7).room_key(), "user_7");
        assert_eq!(RoomKind::BoardAnalytics(3).room_key(), "board_analytics_3");
        assert_eq!(RoomKind::GlobalAnalytics.room_key(), "global_analytics");
    }

    #[test]
    fn test_distinct_rooms_distinct_keys() {
        assert_ne!(RoomKind::Board(1).room_key(), RoomKind::Card(1).room_key());
        assert_ne!(
            RoomKind::Board(1).room_key(),
            RoomKind::BoardAnalytics(1).room_key()
        );
    }
}
