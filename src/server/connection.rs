//! Connection management: authenticated sockets, the user-to-player
//! session map used for event fan-out, and disconnect grace tracking.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::game::room::{PlayerId, RoomId, UserId};
use crate::protocol::ServerMessage;

/// An authenticated socket's outbound half. Payloads are pre-serialized
/// JSON text frames.
#[derive(Debug, Clone)]
pub struct ClientConnection {
    pub user_id: UserId,
    pub name: String,
    pub sender: mpsc::UnboundedSender<String>,
    pub connected_at: DateTime<Utc>,
}

/// Which seat a user currently occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub room_id: RoomId,
    pub player_id: PlayerId,
}

#[derive(Default)]
pub struct ConnectionManager {
    connections: DashMap<UserId, ClientConnection>,
    sessions: DashMap<UserId, Session>,
    players: DashMap<PlayerId, UserId>,
    disconnected_at: DashMap<UserId, DateTime<Utc>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an authenticated socket. A reconnect replaces the stale
    /// connection; the old socket's sender simply goes dead.
    pub fn register(&self, user_id: UserId, name: String, sender: mpsc::UnboundedSender<String>) {
        self.disconnected_at.remove(&user_id);
        let replaced = self.connections.insert(
            user_id,
            ClientConnection {
                user_id,
                name,
                sender,
                connected_at: Utc::now(),
            },
        );
        if let Some(old) = replaced {
            tracing::debug!(
                user_id = %old.user_id,
                connected_at = %old.connected_at,
                "Replacing stale connection"
            );
        }
    }

    /// A socket dropped; start the grace clock. The session stays so the
    /// user can reconnect into their seat.
    pub fn mark_disconnected(&self, user_id: UserId) {
        self.connections.remove(&user_id);
        self.disconnected_at.insert(user_id, Utc::now());
    }

    pub fn is_connected(&self, user_id: UserId) -> bool {
        self.connections.contains_key(&user_id)
    }

    pub fn display_name(&self, user_id: UserId) -> Option<String> {
        self.connections.get(&user_id).map(|c| c.name.clone())
    }

    pub fn session(&self, user_id: UserId) -> Option<Session> {
        self.sessions.get(&user_id).map(|s| *s)
    }

    pub fn user_for_player(&self, player_id: PlayerId) -> Option<UserId> {
        self.players.get(&player_id).map(|u| *u)
    }

    pub fn set_session(&self, user_id: UserId, session: Session) {
        if let Some(old) = self.sessions.insert(user_id, session) {
            self.players.remove(&old.player_id);
        }
        self.players.insert(session.player_id, user_id);
    }

    pub fn clear_session(&self, user_id: UserId) {
        if let Some((_, session)) = self.sessions.remove(&user_id) {
            self.players.remove(&session.player_id);
        }
    }

    /// Users in a room, for room-topic fan-out.
    pub fn users_in_room(&self, room_id: RoomId) -> Vec<UserId> {
        self.sessions
            .iter()
            .filter(|s| s.room_id == room_id)
            .map(|s| *s.key())
            .collect()
    }

    /// Direct send of one message to one user; silently dropped if the
    /// socket is gone (at-most-once).
    pub fn send_to_user(&self, user_id: UserId, message: &ServerMessage) {
        let Some(connection) = self.connections.get(&user_id) else {
            return;
        };
        match serde_json::to_string(message) {
            Ok(json) => {
                let _ = connection.sender.send(json);
            }
            Err(e) => tracing::error!(%user_id, "Failed to serialize message: {e}"),
        }
    }

    /// Forward a pre-serialized payload to one user.
    pub fn send_raw_to_user(&self, user_id: UserId, payload: &str) {
        if let Some(connection) = self.connections.get(&user_id) {
            let _ = connection.sender.send(payload.to_string());
        }
    }

    /// Users whose disconnect grace expired; clears their grace entry so
    /// each expiry is handled once.
    pub fn collect_expired_disconnects(&self, grace: Duration) -> Vec<UserId> {
        let cutoff = Utc::now() - grace;
        let expired: Vec<UserId> = self
            .disconnected_at
            .iter()
            .filter(|entry| *entry.value() <= cutoff)
            .map(|entry| *entry.key())
            .collect();
        for user_id in &expired {
            self.disconnected_at.remove(user_id);
        }
        expired
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}
