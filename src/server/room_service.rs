//! Room lifecycle: creation, joining, leaving, host succession.

use chrono::Utc;
use uuid::Uuid;

use crate::error::{GameError, GameResult};
use crate::game::room::{
    GamePhase, PhaseDurations, Player, PlayerState, Room, RoomId, RoomStatus, UserId,
};
use crate::protocol::room_codes::{generate_room_code, normalize_room_code};
use crate::protocol::{
    validation, ErrorCode, RoomSettings, RoomSnapshot, RoomSummary, ServerMessage,
};
use crate::retry::retry_storage_operation;

use super::{GameServer, Session};

impl GameServer {
    /// Create a room and seat the caller as host.
    pub async fn create_room(
        &self,
        user_id: UserId,
        settings: RoomSettings,
    ) -> GameResult<RoomSnapshot> {
        if self.is_shutting_down() {
            return Err(GameError::precondition(
                "server is shutting down",
                ErrorCode::ServiceUnavailable,
            ));
        }
        if self.connections.session(user_id).is_some() {
            return Err(GameError::conflict(
                "already seated in a room",
                ErrorCode::AlreadyInRoom,
            ));
        }
        validation::validate_room_settings(&settings, &self.game_config)
            .map_err(|reason| GameError::validation(reason, ErrorCode::InvalidInput))?;

        let ctx = self.ctx();
        let now = Utc::now();
        let room = Room {
            id: Uuid::new_v4(),
            code: String::new(),
            name: settings.name.trim().to_string(),
            host_user_id: user_id,
            status: RoomStatus::Waiting,
            phase: GamePhase::Lobby,
            day_number: 0,
            phase_started_at: now,
            phase_ends_at: None,
            durations: PhaseDurations {
                night_secs: settings.night_duration_secs,
                day_secs: settings.day_duration_secs,
                vote_secs: settings.vote_duration_secs,
            },
            min_players: settings.min_players,
            max_players: settings.max_players,
            is_private: settings.is_private,
            password: settings.password.clone(),
            winning_team: None,
            end_reason: None,
            first_death_recorded: false,
            pending_revenge: None,
            little_girl_spying: false,
            created_at: now,
            last_activity: now,
        };

        // Uniform random codes with a bounded number of collision retries
        // before surfacing a failure.
        let mut created = None;
        for _ in 0..crate::protocol::ROOM_CODE_RETRIES {
            let mut candidate = room.clone();
            candidate.code = generate_room_code();
            match self.store.create_room(&ctx, candidate).await {
                Ok(room) => {
                    created = Some(room);
                    break;
                }
                Err(e) if e.to_string().contains("already exists") => continue,
                Err(e) => return Err(GameError::Internal(e)),
            }
        }
        let room = created.ok_or_else(|| {
            GameError::conflict(
                "could not allocate a unique room code",
                ErrorCode::RoomCodeExhausted,
            )
        })?;

        self.registry.register(room.id, room.code.clone());
        tracing::info!(room_id = %room.id, code = %room.code, host = %user_id, "Room created");

        let _guard = self.store.lock_room(room.id).await;
        self.seat_player(room.id, user_id).await?;
        self.snapshot_locked(room.id, user_id).await
    }

    /// Join an open room by id or code, with the optional password for
    /// private rooms.
    pub async fn join_room(
        &self,
        user_id: UserId,
        room_id: Option<RoomId>,
        room_code: Option<String>,
        password: Option<String>,
    ) -> GameResult<RoomSnapshot> {
        if self.connections.session(user_id).is_some() {
            return Err(GameError::conflict(
                "already seated in a room",
                ErrorCode::AlreadyInRoom,
            ));
        }

        let ctx = self.ctx();
        let room = match (room_id, room_code) {
            (Some(id), _) => self
                .store
                .find_room_by_id(&ctx, id)
                .await
                .map_err(GameError::Internal)?
                .filter(|r| !r.status.is_terminal()),
            (None, Some(code)) => {
                let code = normalize_room_code(&code);
                validation::validate_room_code(&code)
                    .map_err(|reason| GameError::validation(reason, ErrorCode::InvalidRoomCode))?;
                self.store
                    .find_room_by_code(&ctx, &code)
                    .await
                    .map_err(GameError::Internal)?
            }
            (None, None) => {
                return Err(GameError::validation(
                    "either room_id or room_code is required",
                    ErrorCode::InvalidInput,
                ));
            }
        };
        let room = room.ok_or_else(GameError::room_not_found)?;

        if room.is_private && room.password.as_deref() != password.as_deref() {
            return Err(GameError::auth(
                "room password mismatch",
                ErrorCode::WrongPassword,
            ));
        }

        let _guard = self.store.lock_room(room.id).await;
        // Re-read under the lock; the room may have started or filled up.
        let room = self
            .store
            .find_room_by_id(&ctx, room.id)
            .await
            .map_err(GameError::Internal)?
            .ok_or_else(GameError::room_not_found)?;
        if room.status != RoomStatus::Waiting {
            return Err(GameError::precondition(
                "the game has already started",
                ErrorCode::GameAlreadyStarted,
            ));
        }

        self.seat_player(room.id, user_id).await?;
        self.snapshot_locked(room.id, user_id).await
    }

    /// Seat the user in the room: smallest free position, session entry,
    /// join broadcast. Call with the room lock held.
    async fn seat_player(&self, room_id: RoomId, user_id: UserId) -> GameResult<()> {
        let ctx = self.ctx();
        let room = self
            .store
            .find_room_by_id(&ctx, room_id)
            .await
            .map_err(GameError::Internal)?
            .ok_or_else(GameError::room_not_found)?;
        let players = self
            .store
            .list_players(&ctx, room_id)
            .await
            .map_err(GameError::Internal)?;

        if players.len() >= usize::from(room.max_players) {
            return Err(GameError::conflict("room is full", ErrorCode::RoomFull));
        }
        if players.iter().any(|p| p.user_id == user_id) {
            return Err(GameError::conflict(
                "user already holds a seat",
                ErrorCode::AlreadyInRoom,
            ));
        }

        let position = (1..=room.max_players)
            .find(|pos| !players.iter().any(|p| p.position == *pos))
            .ok_or_else(|| GameError::conflict("room is full", ErrorCode::RoomFull))?;

        let name = self
            .connections
            .display_name(user_id)
            .unwrap_or_else(|| format!("player-{position}"));
        validation::validate_player_name(&name)
            .map_err(|reason| GameError::validation(reason, ErrorCode::InvalidPlayerName))?;

        let player = Player {
            id: Uuid::new_v4(),
            user_id,
            room_id,
            name,
            position,
            role: None,
            state: PlayerState::Alive,
            died_at: None,
            linked_to: None,
            is_revealed: false,
            joined_at: Utc::now(),
        };

        let retry = self.retry.clone();
        let stored = retry_storage_operation(&retry, "create_player", || {
            let ctx = self.ctx();
            let player = player.clone();
            async move { self.store.create_player(&ctx, player).await }
        })
        .await
        .map_err(GameError::Internal)?;

        self.connections.set_session(
            user_id,
            Session {
                room_id,
                player_id: stored.id,
            },
        );

        let mut room = room;
        room.update_activity();
        self.store
            .update_room(&ctx, &room)
            .await
            .map_err(GameError::Internal)?;

        tracing::info!(room_id = %room_id, player_id = %stored.id, position, "Player joined room");
        self.bus
            .publish_room(
                room_id,
                &ServerMessage::PlayerJoined {
                    player: super::snapshot::player_view(&stored, false),
                },
            )
            .await;
        Ok(())
    }

    /// Leave the current room. In a lobby the seat is freed and the host
    /// may change; in a running game the player keeps their seat and is
    /// only marked disconnected.
    pub async fn leave_room(&self, user_id: UserId) -> GameResult<()> {
        let session = self
            .connections
            .session(user_id)
            .ok_or_else(|| GameError::precondition("not in a room", ErrorCode::NotInRoom))?;

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
            self.remove_waiting_player(room, session.player_id, user_id)
                .await?;
        } else if !room.status.is_terminal() {
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
                }
            }
            self.connections.clear_session(user_id);
        } else {
            self.connections.clear_session(user_id);
        }
        Ok(())
    }

    /// Remove a player from a WAITING room, applying host succession:
    /// lowest remaining position inherits the host seat, an empty room is
    /// cancelled. Call with the room lock held.
    pub(crate) async fn remove_waiting_player(
        &self,
        mut room: Room,
        player_id: crate::game::room::PlayerId,
        user_id: UserId,
    ) -> GameResult<()> {
        let ctx = self.ctx();
        self.store
            .delete_player(&ctx, room.id, player_id)
            .await
            .map_err(GameError::Internal)?;
        self.connections.clear_session(user_id);

        let remaining = self
            .store
            .list_players(&ctx, room.id)
            .await
            .map_err(GameError::Internal)?;

        if remaining.is_empty() {
            room.status = RoomStatus::Cancelled;
            room.phase = GamePhase::GameEnd;
            room.end_reason = Some(crate::game::room::EndReason::HostLeft);
            room.phase_ends_at = None;
            self.store
                .update_room(&ctx, &room)
                .await
                .map_err(GameError::Internal)?;
            self.timers.cancel(room.id);
            self.registry.deregister(room.id);
            tracing::info!(room_id = %room.id, "Empty room cancelled");
            return Ok(());
        }

        let mut new_host = None;
        if room.host_user_id == user_id {
            if let Some(successor) = remaining.iter().min_by_key(|p| p.position) {
                room.host_user_id = successor.user_id;
                new_host = Some(successor.user_id);
                tracing::info!(room_id = %room.id, new_host = %successor.user_id, "Host seat reassigned");
            }
        }
        room.update_activity();
        self.store
            .update_room(&ctx, &room)
            .await
            .map_err(GameError::Internal)?;

        self.bus
            .publish_room(room.id, &ServerMessage::PlayerLeft { player_id, new_host })
            .await;
        Ok(())
    }

    /// Public, non-terminal rooms for the lobby browser.
    pub async fn list_rooms(&self) -> GameResult<Vec<RoomSummary>> {
        let ctx = self.ctx();
        let mut summaries = Vec::new();
        for room_id in self.registry.active_rooms() {
            let Some(room) = self
                .store
                .find_room_by_id(&ctx, room_id)
                .await
                .map_err(GameError::Internal)?
            else {
                continue;
            };
            if room.is_private || room.status.is_terminal() {
                continue;
            }
            let players = self
                .store
                .list_players(&ctx, room_id)
                .await
                .map_err(GameError::Internal)?;
            summaries.push(RoomSummary {
                id: room.id,
                code: room.code,
                name: room.name,
                state: room.status,
                player_count: players.len(),
                max_players: room.max_players,
            });
        }
        summaries.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(summaries)
    }
}
