//! In-memory store backend. All state lives in process; durability across
//! restarts comes from whatever backend replaces this one in production
//! deployments, the interface contract is identical.

use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;

use crate::game::roles::AbilityKind;
use crate::game::room::{
    Ability, GameAction, GameEvent, GamePhase, Player, PlayerId, Room, RoomId, UserId,
};

use super::{ActionFilter, GameStore};

#[derive(Debug, Default, Clone, Copy)]
struct UserStats {
    games_played: u64,
    games_won: u64,
}

/// In-memory implementation of [`GameStore`].
#[derive(Default)]
pub struct MemoryStore {
    rooms: DashMap<RoomId, Room>,
    /// Code index over non-terminal rooms.
    codes: DashMap<String, RoomId>,
    players: DashMap<RoomId, Vec<Player>>,
    actions: DashMap<RoomId, Vec<GameAction>>,
    abilities: DashMap<RoomId, Vec<Ability>>,
    events: DashMap<RoomId, Vec<GameEvent>>,
    stats: DashMap<UserId, UserStats>,
    locks: DashMap<RoomId, Arc<Mutex<()>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check(ctx: &CancellationToken) -> Result<()> {
        if ctx.is_cancelled() {
            bail!("operation cancelled");
        }
        Ok(())
    }
}

#[async_trait]
impl GameStore for MemoryStore {
    async fn find_room_by_id(
        &self,
        ctx: &CancellationToken,
        room_id: RoomId,
    ) -> Result<Option<Room>> {
        Self::check(ctx)?;
        Ok(self.rooms.get(&room_id).map(|r| r.clone()))
    }

    async fn find_room_by_code(&self, ctx: &CancellationToken, code: &str) -> Result<Option<Room>> {
        Self::check(ctx)?;
        let Some(room_id) = self.codes.get(code).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self
            .rooms
            .get(&room_id)
            .map(|r| r.clone())
            .filter(|r| !r.status.is_terminal()))
    }

    async fn create_room(&self, ctx: &CancellationToken, room: Room) -> Result<Room> {
        Self::check(ctx)?;
        // Entry-based insert keeps the code-uniqueness check and the index
        // write one step even under concurrent creates.
        match self.codes.entry(room.code.clone()) {
            dashmap::mapref::entry::Entry::Occupied(occupied) => {
                let holder = *occupied.get();
                let holder_open = self
                    .rooms
                    .get(&holder)
                    .is_some_and(|r| !r.status.is_terminal());
                if holder_open {
                    bail!("room code {} already exists", room.code);
                }
                // Stale index entry from a terminal room; take it over.
                let mut occupied = occupied;
                occupied.insert(room.id);
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(room.id);
            }
        }
        self.rooms.insert(room.id, room.clone());
        self.players.entry(room.id).or_default();
        self.actions.entry(room.id).or_default();
        self.abilities.entry(room.id).or_default();
        self.events.entry(room.id).or_default();
        Ok(room)
    }

    async fn update_room(&self, ctx: &CancellationToken, room: &Room) -> Result<()> {
        Self::check(ctx)?;
        let previous = self
            .rooms
            .insert(room.id, room.clone())
            .ok_or_else(|| anyhow!("room {} does not exist", room.id))?;
        // A room entering a terminal state releases its code for reuse.
        if room.status.is_terminal() && !previous.status.is_terminal() {
            self.codes
                .remove_if(&room.code, |_, holder| *holder == room.id);
        }
        Ok(())
    }

    async fn list_rooms_in_phase(
        &self,
        ctx: &CancellationToken,
        phase: GamePhase,
    ) -> Result<Vec<Room>> {
        Self::check(ctx)?;
        Ok(self
            .rooms
            .iter()
            .filter(|r| r.phase == phase)
            .map(|r| r.clone())
            .collect())
    }

    async fn create_player(&self, ctx: &CancellationToken, player: Player) -> Result<Player> {
        Self::check(ctx)?;
        let mut players = self.players.entry(player.room_id).or_default();
        if players.iter().any(|p| p.user_id == player.user_id) {
            bail!("user {} already seated in room", player.user_id);
        }
        if players.iter().any(|p| p.position == player.position) {
            bail!("position {} already taken", player.position);
        }
        players.push(player.clone());
        Ok(player)
    }

    async fn update_player(&self, ctx: &CancellationToken, player: &Player) -> Result<()> {
        Self::check(ctx)?;
        let mut players = self
            .players
            .get_mut(&player.room_id)
            .ok_or_else(|| anyhow!("room {} does not exist", player.room_id))?;
        let slot = players
            .iter_mut()
            .find(|p| p.id == player.id)
            .ok_or_else(|| anyhow!("player {} does not exist", player.id))?;
        *slot = player.clone();
        Ok(())
    }

    async fn delete_player(
        &self,
        ctx: &CancellationToken,
        room_id: RoomId,
        player_id: PlayerId,
    ) -> Result<()> {
        Self::check(ctx)?;
        if let Some(mut players) = self.players.get_mut(&room_id) {
            players.retain(|p| p.id != player_id);
        }
        if let Some(mut abilities) = self.abilities.get_mut(&room_id) {
            abilities.retain(|a| a.player_id != player_id);
        }
        Ok(())
    }

    async fn list_players(&self, ctx: &CancellationToken, room_id: RoomId) -> Result<Vec<Player>> {
        Self::check(ctx)?;
        Ok(self
            .players
            .get(&room_id)
            .map(|p| p.clone())
            .unwrap_or_default())
    }

    async fn upsert_action(&self, ctx: &CancellationToken, action: GameAction) -> Result<()> {
        Self::check(ctx)?;
        let mut actions = self.actions.entry(action.room_id).or_default();
        let existing = actions.iter_mut().find(|a| {
            a.performer_id == action.performer_id
                && a.kind == action.kind
                && a.day_number == action.day_number
                && a.phase == action.phase
        });
        match existing {
            Some(slot) => *slot = action,
            None => actions.push(action),
        }
        Ok(())
    }

    async fn find_actions(
        &self,
        ctx: &CancellationToken,
        filter: &ActionFilter,
    ) -> Result<Vec<GameAction>> {
        Self::check(ctx)?;
        Ok(self
            .actions
            .get(&filter.room_id)
            .map(|actions| {
                actions
                    .iter()
                    .filter(|a| filter.matches(a))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete_actions(
        &self,
        ctx: &CancellationToken,
        filter: &ActionFilter,
    ) -> Result<usize> {
        Self::check(ctx)?;
        let Some(mut actions) = self.actions.get_mut(&filter.room_id) else {
            return Ok(0);
        };
        let before = actions.len();
        actions.retain(|a| !filter.matches(a));
        Ok(before - actions.len())
    }

    async fn upsert_ability(
        &self,
        ctx: &CancellationToken,
        room_id: RoomId,
        ability: Ability,
    ) -> Result<()> {
        Self::check(ctx)?;
        let mut abilities = self.abilities.entry(room_id).or_default();
        let existing = abilities
            .iter_mut()
            .find(|a| a.player_id == ability.player_id && a.kind == ability.kind);
        match existing {
            Some(slot) => *slot = ability,
            None => abilities.push(ability),
        }
        Ok(())
    }

    async fn find_ability(
        &self,
        ctx: &CancellationToken,
        room_id: RoomId,
        player_id: PlayerId,
        kind: AbilityKind,
    ) -> Result<Option<Ability>> {
        Self::check(ctx)?;
        Ok(self.abilities.get(&room_id).and_then(|abilities| {
            abilities
                .iter()
                .find(|a| a.player_id == player_id && a.kind == kind)
                .cloned()
        }))
    }

    async fn list_abilities(
        &self,
        ctx: &CancellationToken,
        room_id: RoomId,
    ) -> Result<Vec<Ability>> {
        Self::check(ctx)?;
        Ok(self
            .abilities
            .get(&room_id)
            .map(|a| a.clone())
            .unwrap_or_default())
    }

    async fn replace_abilities(
        &self,
        ctx: &CancellationToken,
        room_id: RoomId,
        abilities: Vec<Ability>,
    ) -> Result<()> {
        Self::check(ctx)?;
        self.abilities.insert(room_id, abilities);
        Ok(())
    }

    async fn create_event(&self, ctx: &CancellationToken, event: GameEvent) -> Result<()> {
        Self::check(ctx)?;
        self.events.entry(event.room_id).or_default().push(event);
        Ok(())
    }

    async fn list_events(&self, ctx: &CancellationToken, room_id: RoomId) -> Result<Vec<GameEvent>> {
        Self::check(ctx)?;
        Ok(self
            .events
            .get(&room_id)
            .map(|e| e.clone())
            .unwrap_or_default())
    }

    async fn increment_user_stats(
        &self,
        ctx: &CancellationToken,
        user_id: UserId,
        games_played: u32,
        games_won: u32,
    ) -> Result<()> {
        Self::check(ctx)?;
        let mut stats = self.stats.entry(user_id).or_default();
        stats.games_played += u64::from(games_played);
        stats.games_won += u64::from(games_won);
        Ok(())
    }

    async fn lock_room(&self, room_id: RoomId) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(room_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }
}
