//! Room snapshots: the full-state payload clients use to (re)synchronize
//! instead of replaying missed events.

use crate::error::{GameError, GameResult};
use crate::game::room::{Player, PlayerState, RoomId, RoomStatus, UserId};
use crate::protocol::{PlayerView, RoomSnapshot};

use super::GameServer;

/// Public view of one player. The role travels only to the player
/// themselves or once revealed.
pub(crate) fn player_view(player: &Player, include_role: bool) -> PlayerView {
    PlayerView {
        id: player.id,
        user_id: player.user_id,
        name: player.name.clone(),
        position: player.position,
        state: player.state,
        is_revealed: player.is_revealed,
        role: if include_role || player.is_revealed {
            player.role
        } else {
            None
        },
        died_at: player.died_at,
    }
}

impl GameServer {
    /// Snapshot for the caller's current room.
    pub async fn snapshot_for(&self, user_id: UserId) -> GameResult<RoomSnapshot> {
        let session = self
            .connections
            .session(user_id)
            .ok_or_else(|| GameError::precondition("not in a room", crate::protocol::ErrorCode::NotInRoom))?;
        let _guard = self.store.lock_room(session.room_id).await;
        self.snapshot_locked(session.room_id, user_id).await
    }

    /// Build the snapshot with the room lock held.
    pub(crate) async fn snapshot_locked(
        &self,
        room_id: RoomId,
        requester: UserId,
    ) -> GameResult<RoomSnapshot> {
        let ctx = self.ctx();
        let room = self
            .store
            .find_room_by_id(&ctx, room_id)
            .await
            .map_err(GameError::Internal)?
            .ok_or_else(GameError::room_not_found)?;
        let mut players = self
            .store
            .list_players(&ctx, room_id)
            .await
            .map_err(GameError::Internal)?;
        players.sort_by_key(|p| p.position);

        let me = players.iter().find(|p| p.user_id == requester);
        let my_role = me.and_then(|p| p.role);
        let my_id = me.map(|p| p.id);

        let alive_count = players
            .iter()
            .filter(|p| p.state == PlayerState::Alive)
            .count();
        let dead_players = players
            .iter()
            .filter(|p| p.state == PlayerState::Dead)
            .map(|p| p.id)
            .collect();

        let views = players
            .iter()
            .map(|p| player_view(p, Some(p.id) == my_id))
            .collect();

        Ok(RoomSnapshot {
            id: room.id,
            code: room.code.clone(),
            name: room.name.clone(),
            state: room.status,
            phase: room.phase,
            day_number: room.day_number,
            phase_ends_at: room.phase_ends_at,
            players: views,
            my_role,
            alive_count,
            dead_players,
            min_players: room.min_players,
            max_players: room.max_players,
            can_start: room.status == RoomStatus::Waiting
                && players.len() >= usize::from(room.min_players),
            is_host: room.host_user_id == requester,
        })
    }
}
