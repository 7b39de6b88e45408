//! Server orchestration: owns the store, bus, timers, registry and
//! connection manager, and drives the per-room engine.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::bus::{EventBus, PubSub};
use crate::config::Config;
use crate::game::room::GamePhase;
use crate::retry::RetryConfig;
use crate::store::GameStore;
use crate::timer::{TimerEntry, TimerService};

mod action_service;
mod connection;
#[cfg(test)]
mod game_flow_tests;
mod maintenance;
mod phase_service;
mod registry;
mod room_service;
mod router;
mod snapshot;
mod vote_service;

pub use connection::{ConnectionManager, Session};
pub use registry::RoomRegistry;
pub use router::dispatch;

/// The engine root. One instance per process; rooms run in parallel under
/// their own critical sections, nothing here takes a global lock.
pub struct GameServer {
    pub(crate) store: Arc<dyn GameStore>,
    pub(crate) bus: EventBus,
    pub(crate) timers: Arc<TimerService>,
    pub(crate) registry: RoomRegistry,
    pub(crate) connections: ConnectionManager,
    pub(crate) server_config: crate::config::ServerConfig,
    pub(crate) game_config: crate::config::GameConfig,
    pub(crate) retry: RetryConfig,
    shutdown: CancellationToken,
}

impl GameServer {
    pub fn new(config: &Config, store: Arc<dyn GameStore>, pubsub: Arc<dyn PubSub>) -> Arc<Self> {
        Arc::new(Self {
            store,
            bus: EventBus::new(pubsub),
            timers: Arc::new(TimerService::new()),
            registry: RoomRegistry::new(),
            connections: ConnectionManager::new(),
            server_config: config.server.clone(),
            game_config: config.game.clone(),
            retry: RetryConfig::with_attempts(config.server.store_retry_attempts),
            shutdown: CancellationToken::new(),
        })
    }

    /// Cancellation context handed to store calls; cancelled on shutdown.
    pub(crate) fn ctx(&self) -> CancellationToken {
        self.shutdown.child_token()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub fn active_room_count(&self) -> usize {
        self.registry.active_count()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.connection_count()
    }

    /// Rebuild timers from persisted room state so phase cycles survive a
    /// process restart; past deadlines drain on the first tick.
    pub async fn recover(&self) -> Result<()> {
        let ctx = self.ctx();
        let now = Utc::now();
        let mut recovered = 0usize;
        for phase in [
            GamePhase::RoleAssignment,
            GamePhase::NightPhase,
            GamePhase::DayDiscussion,
            GamePhase::DayVoting,
        ] {
            let rooms = self.store.list_rooms_in_phase(&ctx, phase).await?;
            recovered += rooms.len();
            self.timers.rebuild(&rooms, now);
            for room in &rooms {
                self.registry.register(room.id, room.code.clone());
            }
        }
        // Lobbies also need their registry entry back.
        let waiting = self
            .store
            .list_rooms_in_phase(&ctx, GamePhase::Lobby)
            .await?;
        for room in &waiting {
            self.registry.register(room.id, room.code.clone());
        }
        if recovered > 0 {
            tracing::info!(recovered, "Re-armed phase timers after restart");
        }
        Ok(())
    }

    /// Spawn the long-running loops: phase-timer dispatcher, bus-to-socket
    /// event pump and the maintenance sweep.
    pub fn spawn_background_tasks(self: &Arc<Self>) {
        let dispatcher = self.clone();
        tokio::spawn(async move { dispatcher.run_timer_dispatcher().await });

        let pump = self.clone();
        tokio::spawn(async move { pump.run_event_pump().await });

        let sweeper = self.clone();
        tokio::spawn(async move { sweeper.run_maintenance().await });
    }

    /// Dispatcher loop: wakes at least once per tick, pops due entries and
    /// drives the room transitions. A failed transition is logged and
    /// retried on the next tick; the room's phase is re-verified under
    /// the room lock so stale entries drop silently.
    async fn run_timer_dispatcher(self: Arc<Self>) {
        let tick = Duration::from_millis(self.server_config.timer_tick_millis);
        loop {
            if self.shutdown.is_cancelled() {
                break;
            }
            for entry in self.timers.pop_expired(Utc::now()) {
                if let Err(e) = self.handle_phase_expiry(entry).await {
                    tracing::error!(
                        room_id = %entry.room_id,
                        phase = ?entry.phase,
                        "Phase transition failed, retrying next tick: {e}"
                    );
                    self.timers.schedule(TimerEntry {
                        deadline: Utc::now() + chrono::Duration::milliseconds(
                            self.server_config.timer_tick_millis as i64,
                        ),
                        ..entry
                    });
                }
            }
            self.timers.wait_tick(tick).await;
        }
        tracing::debug!("Timer dispatcher stopped");
    }

    /// Forward bus traffic to connected sockets. Room topics fan out to
    /// every seated user; player topics reach only the owning user.
    async fn run_event_pump(self: Arc<Self>) {
        let pubsub = self.bus.pubsub();
        let mut room_sub = match pubsub.subscribe("room.*").await {
            Ok(sub) => sub,
            Err(e) => {
                tracing::error!("Failed to subscribe to room events: {e}");
                return;
            }
        };
        let mut player_sub = match pubsub.subscribe("player.*").await {
            Ok(sub) => sub,
            Err(e) => {
                tracing::error!("Failed to subscribe to player events: {e}");
                return;
            }
        };

        loop {
            let received = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                msg = room_sub.recv() => msg,
                msg = player_sub.recv() => msg,
            };
            let Some((topic, payload)) = received else {
                break;
            };
            let Ok(payload) = std::str::from_utf8(&payload) else {
                tracing::warn!(topic, "Dropping non-UTF-8 event payload");
                continue;
            };
            self.fan_out(&topic, payload);
        }
        tracing::debug!("Event pump stopped");
    }

    fn fan_out(&self, topic: &str, payload: &str) {
        let mut parts = topic.split('.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("room"), Some(room_id), None) => {
                let Ok(room_id) = room_id.parse() else { return };
                for user_id in self.connections.users_in_room(room_id) {
                    self.connections.send_raw_to_user(user_id, payload);
                }
            }
            (Some("player"), Some(_room_id), Some(player_id)) => {
                let Ok(player_id) = player_id.parse() else { return };
                if let Some(user_id) = self.connections.user_for_player(player_id) {
                    self.connections.send_raw_to_user(user_id, payload);
                }
            }
            _ => tracing::warn!(topic, "Unroutable event topic"),
        }
    }

    /// Graceful shutdown: stop intake, let loops drain, then release the
    /// remaining room handles. Room state is already persisted through
    /// the store on every mutation, so there is nothing else to flush.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down game server");
        self.shutdown.cancel();
        for handle in self.registry.drain() {
            self.timers.cancel(handle.room_id);
            tracing::debug!(room_id = %handle.room_id, code = %handle.code, "Released room handle");
        }
    }
}
