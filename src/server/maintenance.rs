//! Background maintenance: disconnect-grace expiry and abandoned-room
//! cleanup.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::error::{GameError, GameResult};
use crate::game::room::{EndReason, GamePhase, PlayerState, RoomStatus, UserId};

use super::GameServer;

impl GameServer {
    /// Periodic sweep loop.
    pub(crate) async fn run_maintenance(self: Arc<Self>) {
        let interval = Duration::from_secs(self.server_config.maintenance_interval_secs);
        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = self.shutdown_cancelled() => break,
            }
            self.sweep_expired_disconnects().await;
            self.sweep_abandoned_rooms().await;
        }
        tracing::debug!("Maintenance sweeper stopped");
    }

    async fn shutdown_cancelled(&self) {
        self.ctx().cancelled().await;
    }

    /// Players whose 60-second reconnect window ran out: lobby seats are
    /// freed (with host succession), in-game players keep their seat but
    /// are marked disconnected.
    async fn sweep_expired_disconnects(&self) {
        let grace = chrono::Duration::seconds(self.server_config.disconnect_grace_secs as i64);
        for user_id in self.connections.collect_expired_disconnects(grace) {
            if let Err(e) = self.expire_disconnect(user_id).await {
                tracing::warn!(%user_id, "Disconnect expiry failed: {e}");
            }
        }
    }

    async fn expire_disconnect(&self, user_id: UserId) -> GameResult<()> {
        let Some(session) = self.connections.session(user_id) else {
            return Ok(());
        };
        let _guard = self.store.lock_room(session.room_id).await;
        let ctx = self.ctx();
        let Some(room) = self
            .store
            .find_room_by_id(&ctx, session.room_id)
            .await
            .map_err(GameError::Internal)?
        else {
            self.connections.clear_session(user_id);
            return Ok(());
        };

        if room.status == RoomStatus::Waiting {
            tracing::info!(room_id = %room.id, %user_id, "Removing player after disconnect grace");
            self.remove_waiting_player(room, session.player_id, user_id)
                .await?;
            return Ok(());
        }

        if room.status.is_terminal() {
            self.connections.clear_session(user_id);
            return Ok(());
        }

        // Running game: the seat survives, the player is just marked
        // disconnected. The session stays so a reconnect lands back in it.
        let players = self
            .store
            .list_players(&ctx, room.id)
            .await
            .map_err(GameError::Internal)?;
        if let Some(mut player) = players.into_iter().find(|p| p.id == session.player_id) {
            if player.state == PlayerState::Alive {
                player.state = PlayerState::Disconnected;
                self.store
                    .update_player(&ctx, &player)
                    .await
                    .map_err(GameError::Internal)?;
                tracing::info!(room_id = %room.id, player_id = %player.id, "Player marked disconnected");
            }
        }
        Ok(())
    }

    /// A user re-authenticated: restore their seat if they still have one.
    pub async fn handle_reconnect(&self, user_id: UserId) -> GameResult<()> {
        let Some(session) = self.connections.session(user_id) else {
            return Ok(());
        };
        let _guard = self.store.lock_room(session.room_id).await;
        let ctx = self.ctx();
        let players = self
            .store
            .list_players(&ctx, session.room_id)
            .await
            .map_err(GameError::Internal)?;
        if let Some(mut player) = players.into_iter().find(|p| p.id == session.player_id) {
            if player.state == PlayerState::Disconnected {
                player.state = PlayerState::Alive;
                self.store
                    .update_player(&ctx, &player)
                    .await
                    .map_err(GameError::Internal)?;
                tracing::info!(room_id = %session.room_id, player_id = %player.id, "Player reconnected");
            }
        }
        Ok(())
    }

    /// WAITING rooms idle past the abandonment timeout are cancelled and
    /// their codes released.
    async fn sweep_abandoned_rooms(&self) {
        let timeout =
            chrono::Duration::seconds(self.server_config.abandoned_room_timeout_secs as i64);
        let cutoff = Utc::now() - timeout;

        for room_id in self.registry.active_rooms() {
            let _guard = self.store.lock_room(room_id).await;
            let ctx = self.ctx();
            let Ok(Some(mut room)) = self.store.find_room_by_id(&ctx, room_id).await else {
                continue;
            };
            if room.status != RoomStatus::Waiting || room.last_activity > cutoff {
                continue;
            }

            room.status = RoomStatus::Cancelled;
            room.phase = GamePhase::GameEnd;
            room.end_reason = Some(EndReason::Abandoned);
            room.phase_ends_at = None;
            if let Err(e) = self.store.update_room(&ctx, &room).await {
                tracing::warn!(room_id = %room.id, "Failed to cancel abandoned room: {e}");
                continue;
            }
            self.timers.cancel(room.id);
            self.registry.deregister(room.id);
            if let Ok(players) = self.store.list_players(&ctx, room.id).await {
                for player in players {
                    self.connections.clear_session(player.user_id);
                }
            }
            tracing::info!(room_id = %room.id, "Abandoned room cancelled");
        }
    }
}
