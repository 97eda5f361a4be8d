//! # tb-realtime
//!
//! Room-scoped publish/subscribe for Taskboard RS.
//!
//! - [`room::RoomKind`] — the closed set of logical rooms, keyed by entity id
//! - [`registry::RoomRegistry`] — which connections are subscribed to which rooms
//! - [`event::DomainEvent`] — the closed set of realtime events
//! - [`broadcast::Broadcaster`] — fan-out of one event to one room's subscribers
//! - [`ws`] — the axum WebSocket endpoint handling `join_*`/`leave_*` control
//!   messages
//!
//! Delivery is at-most-once and fire-and-forget: membership is process-local,
//! a disconnected subscriber misses events, and reconnecting clients re-fetch
//! current state over REST.

pub mod broadcast;
pub mod event;
pub mod registry;
pub mod room;
pub mod ws;

pub use broadcast::{Broadcaster, EventPublisher, RecordingPublisher};
pub use event::DomainEvent;
pub use registry::{ConnectionId, RoomRegistry};
pub use room::RoomKind;
