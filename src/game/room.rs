//! Room and player data model, phase/state coupling and the in-memory
//! working set the engine mutates inside a room critical section.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::roles::{AbilityKind, GameRole, Team};

/// Unique identifier for rooms
pub type RoomId = Uuid;
/// Unique identifier for players (one per room membership)
pub type PlayerId = Uuid;
/// Unique identifier for user accounts (owned by the external auth layer)
pub type UserId = Uuid;

/// Coarse room state, broadcast to clients.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatus {
    Waiting,
    Starting,
    Night,
    Day,
    Voting,
    Ended,
    Cancelled,
}

impl RoomStatus {
    /// Terminal rooms release their code for reuse and reject all input.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ended | Self::Cancelled)
    }
}

/// Fine-grained phase driving the timer cycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GamePhase {
    Lobby,
    RoleAssignment,
    NightPhase,
    DayDiscussion,
    DayVoting,
    GameEnd,
}

impl GamePhase {
    /// The room status each phase is coupled to. The pair is updated
    /// together in `transition_to`, never independently.
    pub fn status(self) -> RoomStatus {
        match self {
            Self::Lobby => RoomStatus::Waiting,
            Self::RoleAssignment => RoomStatus::Starting,
            Self::NightPhase => RoomStatus::Night,
            Self::DayDiscussion => RoomStatus::Day,
            Self::DayVoting => RoomStatus::Voting,
            Self::GameEnd => RoomStatus::Ended,
        }
    }

    pub fn is_timed(self) -> bool {
        !matches!(self, Self::Lobby | Self::GameEnd)
    }

    /// Successor in the normal cycle. Transitions may still short-circuit
    /// to `GameEnd` whenever the win evaluator settles on a team.
    pub fn next(self) -> GamePhase {
        match self {
            Self::Lobby => Self::RoleAssignment,
            Self::RoleAssignment => Self::NightPhase,
            Self::NightPhase => Self::DayDiscussion,
            Self::DayDiscussion => Self::DayVoting,
            Self::DayVoting => Self::NightPhase,
            Self::GameEnd => Self::GameEnd,
        }
    }
}

/// Player liveness; only Alive players act, vote or count for wins.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerState {
    Alive,
    Dead,
    Disconnected,
}

/// Why a room ended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    WinnerResolved,
    Draw,
    HostLeft,
    Abandoned,
    ServerShutdown,
}

/// Per-room timing knobs chosen at creation (seconds).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PhaseDurations {
    pub night_secs: u64,
    pub day_secs: u64,
    pub vote_secs: u64,
}

/// Hunter revenge window opened when a Hunter dies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingRevenge {
    pub hunter_id: PlayerId,
    pub expires_at: DateTime<Utc>,
}

/// Room record. Unit of concurrency; every mutation happens inside the
/// per-room critical section provided by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub code: String,
    pub name: String,
    pub host_user_id: UserId,
    pub status: RoomStatus,
    pub phase: GamePhase,
    /// 0 while in the lobby; increments only on entry to `NightPhase`.
    pub day_number: u32,
    pub phase_started_at: DateTime<Utc>,
    /// Set whenever a timed phase is entered, cleared on `GameEnd`.
    pub phase_ends_at: Option<DateTime<Utc>>,
    pub durations: PhaseDurations,
    pub min_players: u8,
    pub max_players: u8,
    pub is_private: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub winning_team: Option<Team>,
    pub end_reason: Option<EndReason>,
    /// First death of the game already happened (Plunderer trigger).
    pub first_death_recorded: bool,
    /// Open Hunter revenge window, if any.
    pub pending_revenge: Option<PendingRevenge>,
    /// Little Girl was granted werewolf-channel read access for this night.
    pub little_girl_spying: bool,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Room {
    pub fn update_activity(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Duration of a timed phase, `None` for untimed ones.
    pub fn phase_duration_secs(&self, phase: GamePhase) -> Option<u64> {
        match phase {
            GamePhase::RoleAssignment => Some(super::ROLE_ASSIGNMENT_SECS),
            GamePhase::NightPhase => Some(self.durations.night_secs),
            GamePhase::DayDiscussion => Some(self.durations.day_secs),
            GamePhase::DayVoting => Some(self.durations.vote_secs),
            GamePhase::Lobby | GamePhase::GameEnd => None,
        }
    }
}

/// Player record. Owned by its room; destroyed with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub user_id: UserId,
    pub room_id: RoomId,
    pub name: String,
    /// Seat in `[1..15]`, unique within the room, smallest-available on join.
    pub position: u8,
    /// Unset while the room is still waiting.
    pub role: Option<GameRole>,
    pub state: PlayerState,
    pub died_at: Option<DateTime<Utc>>,
    /// Lover partner set by Cupid; symmetric by construction.
    pub linked_to: Option<PlayerId>,
    pub is_revealed: bool,
    pub joined_at: DateTime<Utc>,
}

impl Player {
    pub fn is_alive(&self) -> bool {
        self.state == PlayerState::Alive
    }
}

/// Per-player consumable. `(player_id, kind)` is the primary key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ability {
    pub player_id: PlayerId,
    pub kind: AbilityKind,
    pub uses_left: u8,
    pub max_uses: u8,
    pub cooldown_days: u8,
    pub last_used_day: Option<u32>,
    /// Cupid link, Heir target, Mercenary target, Guard's previous target.
    pub metadata: serde_json::Value,
}

impl Ability {
    pub fn from_spec(player_id: PlayerId, spec: &super::roles::AbilitySpec) -> Self {
        Self {
            player_id,
            kind: spec.kind,
            uses_left: spec.max_uses,
            max_uses: spec.max_uses,
            cooldown_days: spec.cooldown_days,
            last_used_day: None,
            metadata: serde_json::Value::Null,
        }
    }

    /// Usable right now: a use remains and the cooldown has elapsed.
    pub fn ready(&self, day_number: u32) -> bool {
        if self.uses_left == 0 {
            return false;
        }
        match self.last_used_day {
            Some(last) if self.cooldown_days > 0 => {
                day_number >= last + u32::from(self.cooldown_days)
            }
            _ => true,
        }
    }

    pub fn target_id(&self) -> Option<PlayerId> {
        self.metadata
            .get("target_id")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
    }

    pub fn set_target_id(&mut self, target: PlayerId) {
        self.metadata = serde_json::json!({ "target_id": target.to_string() });
    }
}

/// Action types submitted by clients and resolved by the engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    GuardProtect,
    CupidLink,
    HeirChoose,
    WerewolfVote,
    WhiteWolfDevour,
    BlackWolfConvert,
    WitchHeal,
    WitchPoison,
    SeerInvestigate,
    DayVote,
    HunterShoot,
    DictatorCoup,
}

/// Submitted action. `(room, performer, kind, day, phase)` is the upsert
/// key: the most recent write wins for reversible choices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameAction {
    pub room_id: RoomId,
    pub performer_id: PlayerId,
    pub kind: ActionType,
    pub day_number: u32,
    pub phase: GamePhase,
    pub target_id: Option<PlayerId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Why a player died. Carried on `player_died` events and death records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DeathCause {
    WerewolfAttack,
    WhiteWolfDevour,
    WitchPoison,
    VotedOut,
    HunterRevenge,
    Grief,
    FailedCoup,
    CaughtSpying,
}

/// Append-only audit/announcement record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameEvent {
    pub room_id: RoomId,
    pub kind: String,
    pub day_number: u32,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// The full mutable state of one room, loaded at the start of a critical
/// section and committed back to the store as a single step. Resolver,
/// vote tally and death pipeline all operate on this working set so that
/// a crash mid-computation leaves no partial state behind.
#[derive(Debug, Clone)]
pub struct GameWorld {
    pub room: Room,
    pub players: Vec<Player>,
    pub abilities: Vec<Ability>,
}

impl GameWorld {
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn alive_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.is_alive())
    }

    pub fn alive_count(&self) -> usize {
        self.alive_players().count()
    }

    /// Alive players currently holding `role`.
    pub fn alive_with_role(&self, role: GameRole) -> impl Iterator<Item = &Player> + '_ {
        self.alive_players().filter(move |p| p.role == Some(role))
    }

    pub fn ability(&self, player_id: PlayerId, kind: AbilityKind) -> Option<&Ability> {
        self.abilities
            .iter()
            .find(|a| a.player_id == player_id && a.kind == kind)
    }

    pub fn ability_mut(&mut self, player_id: PlayerId, kind: AbilityKind) -> Option<&mut Ability> {
        self.abilities
            .iter_mut()
            .find(|a| a.player_id == player_id && a.kind == kind)
    }

    /// Replace a player's role and rebuild their ability rows from scratch.
    pub fn reassign_role(&mut self, player_id: PlayerId, role: GameRole) {
        if let Some(player) = self.player_mut(player_id) {
            player.role = Some(role);
        }
        self.abilities.retain(|a| a.player_id != player_id);
        for spec in super::roles::initial_abilities(role) {
            self.abilities.push(Ability::from_spec(player_id, spec));
        }
    }
}
