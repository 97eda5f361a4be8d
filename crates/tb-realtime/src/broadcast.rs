//! Event broadcaster
//!
//! Given a domain event and a target room, deliver the serialized payload to
//! every connection currently subscribed to that room, and only that room.
//! Delivery is at-most-once: a full or closed per-connection channel is
//! logged and skipped, never retried. Within one action, events are delivered
//! in the order the action publishes them; across subscribers of a room no
//! order is defined.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::event::DomainEvent;
use crate::registry::RoomRegistry;
use crate::room::RoomKind;

/// Publishing seam for action handlers.
///
/// Injected everywhere an action needs to emit events, so tests can swap in
/// [`RecordingPublisher`]. Publishing never fails the caller.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, room: RoomKind, event: DomainEvent);

    /// Publish to a room, skipping one connection (e.g. the typing sender)
    fn publish_except(
        &self,
        room: RoomKind,
        except: Option<crate::registry::ConnectionId>,
        event: DomainEvent,
    );
}

/// Fan-out broadcaster over a [`RoomRegistry`]
pub struct Broadcaster {
    registry: Arc<RoomRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }
}

impl EventPublisher for Broadcaster {
    fn publish(&self, room: RoomKind, event: DomainEvent) {
        self.publish_except(room, None, event);
    }

    fn publish_except(
        &self,
        room: RoomKind,
        except: Option<crate::registry::ConnectionId>,
        event: DomainEvent,
    ) {
        let payload = match serde_json::to_string(&event) {
            Ok(json) => json,
            Err(e) => {
                warn!(event = event.name(), error = %e, "Failed to serialize event");
                return;
            }
        };

        let subscribers = self.registry.subscribers(&room);
        let mut delivered = 0usize;
        for (connection_id, sender) in subscribers {
            if Some(connection_id) == except {
                continue;
            }
            // try_send keeps fan-out non-blocking; a lagging subscriber
            // drops the event rather than stalling the action.
            if sender.try_send(payload.clone()).is_err() {
                warn!(
                    connection_id = %connection_id,
                    room = %room,
                    event = event.name(),
                    "Dropped event for lagging or closed connection"
                );
            } else {
                delivered += 1;
            }
        }

        debug!(
            room = %room,
            event = event.name(),
            delivered,
            "Broadcast event"
        );
    }
}

/// Test double that records every publish instead of delivering it
#[derive(Default)]
pub struct RecordingPublisher {
    events: std::sync::Mutex<Vec<(RoomKind, DomainEvent)>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(RoomKind, DomainEvent)> {
        self.events.lock().expect("publisher lock").clone()
    }

    pub fn event_names(&self) -> Vec<&'static str> {
        self.events()
            .iter()
            .map(|(_, event)| event.name())
            .collect()
    }

    pub fn rooms(&self) -> Vec<RoomKind> {
        self.events().iter().map(|(room, _)| *room).collect()
    }

    pub fn clear(&self) {
        self.events.lock().expect("publisher lock").clear();
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, room: RoomKind, event: DomainEvent) {
        self.events
            .lock()
            .expect("publisher lock")
            .push((room, event));
    }

    fn publish_except(
        &self,
        room: RoomKind,
        _except: Option<crate::registry::ConnectionId>,
        event: DomainEvent,
    ) {
        self.publish(room, event);
    }
}
