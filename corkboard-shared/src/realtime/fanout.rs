/// Cross-instance room fan-out over Redis pub/sub
///
/// A single server instance broadcasts through its in-process
/// [`RoomRegistry`](crate::realtime::rooms::RoomRegistry). With several
/// instances behind a load balancer, each publish is additionally PUBLISHed
/// on one shared Redis channel; every instance runs a subscriber task that
/// feeds foreign frames back into its local registry.
///
/// Frames carry the publishing instance id so an instance never re-delivers
/// its own frames. Pub/sub gives exactly the relay semantics the rooms
/// promise: at-most-once, unordered across entity types, no persistence of
/// undelivered messages.

use futures::StreamExt;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::realtime::rooms::{RoomId, RoomRegistry};
use crate::redis::client::RedisClient;

/// Channel all instances share
const FANOUT_CHANNEL: &str = "corkboard:rooms";

/// Delay before re-establishing a dropped pub/sub connection
const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(2);

/// Frame exchanged between instances
#[derive(Debug, Serialize, Deserialize)]
struct WireFrame {
    /// Publishing instance
    instance: Uuid,

    /// Target room
    room: RoomId,

    /// Originating connection (for sender exclusion at delivery)
    origin: Uuid,

    /// Serialized BoardEvent
    payload: String,
}

/// Redis-backed room fan-out
#[derive(Clone)]
pub struct RedisFanout {
    client: RedisClient,
    instance_id: Uuid,
}

impl RedisFanout {
    /// Creates a fan-out handle with a fresh instance id
    pub fn new(client: RedisClient) -> Self {
        Self {
            client,
            instance_id: Uuid::new_v4(),
        }
    }

    /// Publishes a frame for other instances
    ///
    /// Fire-and-forget: failures are logged, never surfaced to the request
    /// that triggered the broadcast.
    pub async fn publish(&self, room: RoomId, origin: Uuid, payload: String) {
        let frame = WireFrame {
            instance: self.instance_id,
            room,
            origin,
            payload,
        };

        let json = match serde_json::to_string(&frame) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize fan-out frame");
                return;
            }
        };

        let mut conn = self.client.get_connection();
        if let Err(e) = conn.publish::<_, _, ()>(FANOUT_CHANNEL, json).await {
            tracing::warn!(error = %e, "Redis fan-out publish failed");
        }
    }

    /// Runs the subscriber loop, feeding foreign frames into the registry
    ///
    /// Reconnects with a fixed delay when the pub/sub connection drops.
    /// Intended to be spawned once per instance.
    pub async fn run_subscriber(self, registry: RoomRegistry) {
        loop {
            match self.subscribe_and_relay(&registry).await {
                Ok(()) => {
                    tracing::warn!("Redis pub/sub stream ended, resubscribing");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Redis pub/sub connection failed, resubscribing");
                }
            }
            tokio::time::sleep(RESUBSCRIBE_DELAY).await;
        }
    }

    async fn subscribe_and_relay(&self, registry: &RoomRegistry) -> Result<(), redis::RedisError> {
        let conn = self.client.raw().get_async_connection().await?;
        let mut pubsub = conn.into_pubsub();
        pubsub.subscribe(FANOUT_CHANNEL).await?;

        tracing::info!(instance = %self.instance_id, "Subscribed to room fan-out channel");

        let mut stream = pubsub.on_message();
        while let Some(message) = stream.next().await {
            let raw: String = match message.get_payload() {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!(error = %e, "Unreadable fan-out frame");
                    continue;
                }
            };

            let frame: WireFrame = match serde_json::from_str(&raw) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::warn!(error = %e, "Malformed fan-out frame");
                    continue;
                }
            };

            // Local publishes already went through the registry.
            if frame.instance == self.instance_id {
                continue;
            }

            registry.publish_raw(frame.room, frame.origin, frame.payload);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_frame_round_trip() {
        let frame = WireFrame {
            instance: Uuid::new_v4(),
            room: RoomId::Board(Uuid::new_v4()),
            origin: Uuid::new_v4(),
            payload: "{\"event\":\"task:moved\"}".to_string(),
        };

        let json = serde_json::to_string(&frame).unwrap();
        let back: WireFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(back.instance, frame.instance);
        assert_eq!(back.room, frame.room);
        assert_eq!(back.payload, frame.payload);
    }

    // Live pub/sub tests require a running Redis instance and are covered
    // by the ignored tests in redis::client.
}
