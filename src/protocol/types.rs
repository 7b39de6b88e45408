use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::game::roles::{GameRole, Team};
use crate::game::room::{GamePhase, PlayerId, PlayerState, RoomId, RoomStatus, UserId};

/// Room code length; codes identify non-terminal rooms.
pub const ROOM_CODE_LENGTH: usize = 6;
/// How many collisions the generator tolerates before surfacing a failure.
pub const ROOM_CODE_RETRIES: usize = 10;

pub const MIN_ROOM_NAME_LENGTH: usize = 1;
pub const MAX_ROOM_NAME_LENGTH: usize = 50;

/// One player's public view. `role` is populated only for the requesting
/// player themselves or once the player is revealed (death, game end).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub user_id: UserId,
    pub name: String,
    pub position: u8,
    pub state: PlayerState,
    pub is_revealed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<GameRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub died_at: Option<DateTime<Utc>>,
}

/// Full room snapshot sent on `game:state`. Clients re-request this after
/// a reconnect instead of replaying missed events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub id: RoomId,
    pub code: String,
    pub name: String,
    pub state: RoomStatus,
    pub phase: GamePhase,
    pub day_number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase_ends_at: Option<DateTime<Utc>>,
    pub players: Vec<PlayerView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my_role: Option<GameRole>,
    pub alive_count: usize,
    pub dead_players: Vec<PlayerId>,
    pub min_players: u8,
    pub max_players: u8,
    pub can_start: bool,
    pub is_host: bool,
}

/// Lobby-browser entry for public, non-terminal rooms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSummary {
    pub id: RoomId,
    pub code: String,
    pub name: String,
    pub state: RoomStatus,
    pub player_count: usize,
    pub max_players: u8,
}

/// Per-target count in a vote tally.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteCount {
    pub target_id: PlayerId,
    pub votes: u32,
}

/// Role disclosure at game end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleReveal {
    pub player_id: PlayerId,
    pub name: String,
    pub role: GameRole,
    pub team: Team,
    pub state: PlayerState,
}

/// Room settings chosen at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSettings {
    pub name: String,
    #[serde(default = "default_min_players")]
    pub min_players: u8,
    #[serde(default = "default_max_players")]
    pub max_players: u8,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default = "default_night_secs")]
    pub night_duration_secs: u64,
    #[serde(default = "default_day_secs")]
    pub day_duration_secs: u64,
    #[serde(default = "default_vote_secs")]
    pub vote_duration_secs: u64,
}

pub(crate) fn default_min_players() -> u8 {
    5
}
pub(crate) fn default_max_players() -> u8 {
    15
}
pub(crate) fn default_night_secs() -> u64 {
    90
}
pub(crate) fn default_day_secs() -> u64 {
    180
}
pub(crate) fn default_vote_secs() -> u64 {
    60
}
