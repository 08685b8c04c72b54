/// Room registry
///
/// A room is a broadcast scope (per-board or per-project) that
/// connections subscribe to. The registry maps each active room to a
/// `tokio::sync::broadcast` channel, created lazily on first subscribe and
/// pruned once the last subscriber is gone.
///
/// Publications carry the originating connection id; the WebSocket layer
/// drops frames whose origin matches its own connection, so a client never
/// receives its own mutation back.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::realtime::event::BoardEvent;

/// Buffered frames per room before slow subscribers start lagging
const ROOM_CHANNEL_CAPACITY: usize = 256;

/// Broadcast scope a connection subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum RoomId {
    /// Per-board room
    Board(Uuid),

    /// Per-project room
    Project(Uuid),
}

/// A frame published to a room
#[derive(Debug, Clone)]
pub struct Publication {
    /// Connection that caused the mutation; excluded from delivery
    pub origin: Uuid,

    /// Serialized [`BoardEvent`]
    pub payload: Arc<str>,
}

/// Maps active rooms to their broadcast channels
///
/// Cheap to clone; all clones share the same map.
#[derive(Clone, Default)]
pub struct RoomRegistry {
    inner: Arc<RwLock<HashMap<RoomId, broadcast::Sender<Publication>>>>,
}

impl RoomRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to a room, creating its channel if needed
    pub fn subscribe(&self, room: RoomId) -> broadcast::Receiver<Publication> {
        let mut rooms = self.inner.write().expect("room registry lock poisoned");
        rooms
            .entry(room)
            .or_insert_with(|| broadcast::channel(ROOM_CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Publishes an event to a room
    ///
    /// Fire-and-forget: returns the number of subscribers that received the
    /// frame, 0 when the room is idle. Serialization failures are logged and
    /// swallowed; a broadcast must never fail the mutation it describes.
    pub fn publish(&self, room: RoomId, origin: Uuid, event: &BoardEvent) -> usize {
        match serde_json::to_string(event) {
            Ok(json) => self.publish_raw(room, origin, json),
            Err(e) => {
                tracing::error!(event = event.name(), error = %e, "Failed to serialize room event");
                0
            }
        }
    }

    /// Publishes an already-serialized frame (Redis fan-in path)
    pub fn publish_raw(&self, room: RoomId, origin: Uuid, payload: String) -> usize {
        let publication = Publication {
            origin,
            payload: Arc::from(payload),
        };

        let delivered = {
            let rooms = self.inner.read().expect("room registry lock poisoned");
            match rooms.get(&room) {
                Some(sender) => sender.send(publication).unwrap_or(0),
                None => 0,
            }
        };

        if delivered == 0 {
            self.prune(room);
        }
        delivered
    }

    /// Number of active subscribers in a room
    pub fn subscriber_count(&self, room: RoomId) -> usize {
        let rooms = self.inner.read().expect("room registry lock poisoned");
        rooms.get(&room).map_or(0, |s| s.receiver_count())
    }

    /// Drops a room's channel once nobody is subscribed
    fn prune(&self, room: RoomId) {
        let mut rooms = self.inner.write().expect("room registry lock poisoned");
        if let Some(sender) = rooms.get(&room) {
            if sender.receiver_count() == 0 {
                rooms.remove(&room);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event(board_id: Uuid) -> BoardEvent {
        BoardEvent::ColumnsReordered {
            board_id,
            column_order: vec![],
            version: 1,
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let registry = RoomRegistry::new();
        let board_id = Uuid::new_v4();
        let room = RoomId::Board(board_id);

        let mut rx = registry.subscribe(room);
        let origin = Uuid::new_v4();

        let delivered = registry.publish(room, origin, &sample_event(board_id));
        assert_eq!(delivered, 1);

        let publication = rx.recv().await.unwrap();
        assert_eq!(publication.origin, origin);
        assert!(publication.payload.contains("column:reordered"));
    }

    #[tokio::test]
    async fn test_publish_to_idle_room_delivers_nothing() {
        let registry = RoomRegistry::new();
        let room = RoomId::Board(Uuid::new_v4());

        assert_eq!(registry.publish(room, Uuid::nil(), &sample_event(Uuid::nil())), 0);
        assert_eq!(registry.subscriber_count(room), 0);
    }

    #[tokio::test]
    async fn test_rooms_are_isolated() {
        let registry = RoomRegistry::new();
        let room_a = RoomId::Board(Uuid::new_v4());
        let room_b = RoomId::Board(Uuid::new_v4());

        let mut rx_a = registry.subscribe(room_a);
        let _rx_b = registry.subscribe(room_b);

        registry.publish(room_b, Uuid::nil(), &sample_event(Uuid::nil()));

        // Room A saw nothing
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_room_is_pruned_after_last_subscriber_leaves() {
        let registry = RoomRegistry::new();
        let room = RoomId::Project(Uuid::new_v4());

        let rx = registry.subscribe(room);
        assert_eq!(registry.subscriber_count(room), 1);

        drop(rx);
        // Next publish observes zero receivers and prunes the room.
        registry.publish(room, Uuid::nil(), &sample_event(Uuid::nil()));
        let rooms = registry.inner.read().unwrap();
        assert!(!rooms.contains_key(&room));
    }

    #[test]
    fn test_room_id_serde() {
        let room = RoomId::Board(Uuid::nil());
        let json = serde_json::to_value(room).unwrap();
        assert_eq!(json["kind"], "board");
        let back: RoomId = serde_json::from_value(json).unwrap();
        assert_eq!(back, room);
    }
}
