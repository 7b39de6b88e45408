//! Event fan-out: a pub/sub facade plus the room/player topic scheme the
//! engine publishes on. Delivery is at-most-once; sockets that miss
//! events recover through a fresh `game:state` snapshot.

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

use crate::game::room::{PlayerId, RoomId};
use crate::game::{Audience, Outbound};
use crate::protocol::ServerMessage;

/// Pub/sub abstraction. Implementations must deliver payloads unchanged
/// to every subscriber whose pattern matches the topic.
#[async_trait]
pub trait PubSub: Send + Sync {
    /// Fire-and-forget publish; slow or gone subscribers are skipped.
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<()>;
    /// Subscribe to an exact topic or a prefix pattern ending in `*`.
    async fn subscribe(&self, pattern: &str) -> Result<Subscription>;
}

/// Handle to a live subscription; dropping it unsubscribes.
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<(String, Bytes)>,
}

impl Subscription {
    pub async fn recv(&mut self) -> Option<(String, Bytes)> {
        self.receiver.recv().await
    }
}

struct Subscriber {
    pattern: String,
    sender: mpsc::UnboundedSender<(String, Bytes)>,
}

fn pattern_matches(pattern: &str, topic: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => topic.starts_with(prefix),
        None => pattern == topic,
    }
}

/// In-process bus used by the single-node deployment.
#[derive(Default)]
pub struct MemoryPubSub {
    subscribers: RwLock<Vec<Subscriber>>,
}

impl MemoryPubSub {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PubSub for MemoryPubSub {
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<()> {
        let mut subscribers = self.subscribers.write().await;
        subscribers.retain(|s| {
            if !pattern_matches(&s.pattern, topic) {
                return !s.sender.is_closed();
            }
            // A failed send means the receiver is gone; drop the entry.
            s.sender.send((topic.to_string(), payload.clone())).is_ok()
        });
        Ok(())
    }

    async fn subscribe(&self, pattern: &str) -> Result<Subscription> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers.write().await.push(Subscriber {
            pattern: pattern.to_string(),
            sender,
        });
        Ok(Subscription { receiver })
    }
}

/// Topic for events visible to every socket in a room.
pub fn room_topic(room_id: RoomId) -> String {
    format!("room.{room_id}")
}

/// Topic for events private to one player of a room.
pub fn player_topic(room_id: RoomId, player_id: PlayerId) -> String {
    format!("player.{room_id}.{player_id}")
}

/// Engine-facing wrapper that serializes [`ServerMessage`]s onto the
/// right topics. Publish failures are logged, never propagated; clients
/// resynchronize via snapshots.
#[derive(Clone)]
pub struct EventBus {
    pubsub: Arc<dyn PubSub>,
}

impl EventBus {
    pub fn new(pubsub: Arc<dyn PubSub>) -> Self {
        Self { pubsub }
    }

    pub fn pubsub(&self) -> Arc<dyn PubSub> {
        self.pubsub.clone()
    }

    pub async fn publish_room(&self, room_id: RoomId, message: &ServerMessage) {
        self.publish_raw(&room_topic(room_id), message).await;
    }

    pub async fn publish_player(
        &self,
        room_id: RoomId,
        player_id: PlayerId,
        message: &ServerMessage,
    ) {
        self.publish_raw(&player_topic(room_id, player_id), message)
            .await;
    }

    /// Publish a batch produced by the engine in emission order.
    pub async fn publish_batch(&self, room_id: RoomId, batch: &[Outbound]) {
        for outbound in batch {
            match outbound.audience {
                Audience::Room => self.publish_room(room_id, &outbound.message).await,
                Audience::Player(player_id) => {
                    self.publish_player(room_id, player_id, &outbound.message).await;
                }
            }
        }
    }

    async fn publish_raw(&self, topic: &str, message: &ServerMessage) {
        let payload = match serde_json::to_vec(message) {
            Ok(bytes) => Bytes::from(bytes),
            Err(e) => {
                tracing::error!(topic, "Failed to serialize event: {e}");
                return;
            }
        };
        if let Err(e) = self.pubsub.publish(topic, payload).await {
            tracing::warn!(topic, "Event publish failed: {e}");
        }
    }
}
