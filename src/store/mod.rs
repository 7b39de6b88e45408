//! Persistence facade. The engine consumes this narrow interface; the
//! in-memory backend is the only one compiled in, but the trait is the
//! seam a SQL-backed store would plug into.

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::OwnedMutexGuard;
use tokio_util::sync::CancellationToken;

use crate::game::room::{
    Ability, ActionType, GameAction, GameEvent, GamePhase, GameWorld, Player, PlayerId, Room,
    RoomId, UserId,
};
use crate::game::roles::AbilityKind;

mod memory;

pub use memory::MemoryStore;

/// Filter for action queries; `None` fields match anything.
#[derive(Debug, Clone, Default)]
pub struct ActionFilter {
    pub room_id: RoomId,
    pub day_number: Option<u32>,
    pub phase: Option<GamePhase>,
    pub kind: Option<ActionType>,
    pub performer_id: Option<PlayerId>,
}

impl ActionFilter {
    pub fn room(room_id: RoomId) -> Self {
        Self {
            room_id,
            ..Self::default()
        }
    }

    pub fn matches(&self, action: &GameAction) -> bool {
        action.room_id == self.room_id
            && self.day_number.is_none_or(|d| action.day_number == d)
            && self.phase.is_none_or(|p| action.phase == p)
            && self.kind.is_none_or(|k| action.kind == k)
            && self.performer_id.is_none_or(|p| action.performer_id == p)
    }
}

/// Storage abstraction for rooms, players, actions, abilities, events and
/// per-user stats. Every operation accepts a cancellation context; all
/// implementations must be safe for concurrent use across rooms.
#[async_trait]
pub trait GameStore: Send + Sync {
    // Rooms
    async fn find_room_by_id(&self, ctx: &CancellationToken, room_id: RoomId)
        -> Result<Option<Room>>;
    /// Lookup by code among non-terminal rooms only; terminal rooms
    /// release their code for reuse.
    async fn find_room_by_code(&self, ctx: &CancellationToken, code: &str) -> Result<Option<Room>>;
    /// Fails on a code collision with another non-terminal room.
    async fn create_room(&self, ctx: &CancellationToken, room: Room) -> Result<Room>;
    async fn update_room(&self, ctx: &CancellationToken, room: &Room) -> Result<()>;
    async fn list_rooms_in_phase(
        &self,
        ctx: &CancellationToken,
        phase: GamePhase,
    ) -> Result<Vec<Room>>;

    // Players
    /// Fails when the user already holds a seat in the room.
    async fn create_player(&self, ctx: &CancellationToken, player: Player) -> Result<Player>;
    async fn update_player(&self, ctx: &CancellationToken, player: &Player) -> Result<()>;
    async fn delete_player(
        &self,
        ctx: &CancellationToken,
        room_id: RoomId,
        player_id: PlayerId,
    ) -> Result<()>;
    async fn list_players(&self, ctx: &CancellationToken, room_id: RoomId) -> Result<Vec<Player>>;

    // Actions
    /// Upsert keyed by `(room, performer, kind, day, phase)`; the most
    /// recent write wins.
    async fn upsert_action(&self, ctx: &CancellationToken, action: GameAction) -> Result<()>;
    async fn find_actions(
        &self,
        ctx: &CancellationToken,
        filter: &ActionFilter,
    ) -> Result<Vec<GameAction>>;
    async fn delete_actions(&self, ctx: &CancellationToken, filter: &ActionFilter)
        -> Result<usize>;

    // Abilities
    async fn upsert_ability(
        &self,
        ctx: &CancellationToken,
        room_id: RoomId,
        ability: Ability,
    ) -> Result<()>;
    async fn find_ability(
        &self,
        ctx: &CancellationToken,
        room_id: RoomId,
        player_id: PlayerId,
        kind: AbilityKind,
    ) -> Result<Option<Ability>>;
    async fn list_abilities(&self, ctx: &CancellationToken, room_id: RoomId)
        -> Result<Vec<Ability>>;
    /// Swap a room's full ability set; used when committing a resolved
    /// working set where decrements and re-initializations must land
    /// together.
    async fn replace_abilities(
        &self,
        ctx: &CancellationToken,
        room_id: RoomId,
        abilities: Vec<Ability>,
    ) -> Result<()>;

    // Events & stats
    async fn create_event(&self, ctx: &CancellationToken, event: GameEvent) -> Result<()>;
    async fn list_events(&self, ctx: &CancellationToken, room_id: RoomId) -> Result<Vec<GameEvent>>;
    async fn increment_user_stats(
        &self,
        ctx: &CancellationToken,
        user_id: UserId,
        games_played: u32,
        games_won: u32,
    ) -> Result<()>;

    /// Serialize a block against the room: the returned guard is the
    /// room's critical section. There is no global lock; rooms proceed
    /// in parallel.
    async fn lock_room(&self, room_id: RoomId) -> OwnedMutexGuard<()>;
}

/// Load a room's full working set. Call with the room lock held.
pub async fn load_world(
    store: &dyn GameStore,
    ctx: &CancellationToken,
    room_id: RoomId,
) -> Result<Option<GameWorld>> {
    let Some(room) = store.find_room_by_id(ctx, room_id).await? else {
        return Ok(None);
    };
    let players = store.list_players(ctx, room_id).await?;
    let abilities = store.list_abilities(ctx, room_id).await?;
    Ok(Some(GameWorld {
        room,
        players,
        abilities,
    }))
}

/// Commit a mutated working set back. Call with the room lock held; the
/// lock is what makes the three writes one atomic step for every other
/// room operation.
pub async fn commit_world(
    store: &dyn GameStore,
    ctx: &CancellationToken,
    world: &GameWorld,
) -> Result<()> {
    store.update_room(ctx, &world.room).await?;
    for player in &world.players {
        store.update_player(ctx, player).await?;
    }
    store
        .replace_abilities(ctx, world.room.id, world.abilities.clone())
        .await?;
    Ok(())
}
