use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::game::roles::{GameRole, Team};
use crate::game::room::{
    ActionType, DeathCause, GamePhase, PlayerId, RoomId, RoomStatus, UserId,
};

use super::error_codes::ErrorCode;
use super::types::{PlayerView, RoleReveal, RoomSettings, RoomSnapshot, RoomSummary, VoteCount};

/// Message types sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    /// Identify the connection (MUST be first message). Token validation
    /// happens at the gateway in front of this server.
    #[serde(rename = "auth")]
    Authenticate { user_id: UserId, name: String },
    /// Create a new room and take the host seat.
    #[serde(rename = "game:create")]
    CreateRoom { settings: RoomSettings },
    /// Join an open room by id or code.
    #[serde(rename = "game:join")]
    JoinRoom {
        #[serde(skip_serializing_if = "Option::is_none")]
        room_id: Option<RoomId>,
        #[serde(skip_serializing_if = "Option::is_none")]
        room_code: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        password: Option<String>,
    },
    /// Leave the current room.
    #[serde(rename = "game:leave")]
    LeaveRoom,
    /// Host (or any player at quorum) starts the game.
    #[serde(rename = "game:start")]
    StartGame,
    /// Request a full room snapshot.
    #[serde(rename = "game:state")]
    RequestState,
    /// Browse public open rooms.
    #[serde(rename = "room:list")]
    ListRooms,
    /// Cast or change a day vote; `None` is an explicit abstention.
    #[serde(rename = "vote:cast")]
    CastVote { target_id: Option<PlayerId> },
    /// Submit a night action for the current night.
    #[serde(rename = "action:night")]
    NightAction {
        action: ActionType,
        #[serde(skip_serializing_if = "Option::is_none")]
        target_id: Option<PlayerId>,
        #[serde(skip_serializing_if = "Option::is_none")]
        metadata: Option<serde_json::Value>,
    },
    /// Dead hunter's revenge shot inside the grace window.
    #[serde(rename = "hunter:revenge")]
    HunterRevenge { target_id: PlayerId },
    /// Dictator stages a coup against a suspected werewolf.
    #[serde(rename = "dictator:coup")]
    DictatorCoup { target_id: PlayerId },
    /// Cupid links two players on the first night.
    #[serde(rename = "cupid:link")]
    CupidLink {
        player1_id: PlayerId,
        player2_id: PlayerId,
    },
    /// Witch potion shorthand used by older clients.
    #[serde(rename = "witch:potion")]
    WitchPotion {
        #[serde(rename = "type")]
        kind: PotionKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        target_id: Option<PlayerId>,
    },
    /// Heartbeat to maintain the connection.
    #[serde(rename = "ping")]
    Ping,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PotionKind {
    Heal,
    Poison,
}

/// Message types sent from server to client. Delivery is at-most-once;
/// clients that miss events recover through a fresh `game:state`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    #[serde(rename = "authenticated")]
    Authenticated { user_id: UserId },
    /// Full snapshot (boxed to keep the enum small).
    #[serde(rename = "game:state")]
    GameState(Box<RoomSnapshot>),
    #[serde(rename = "room:list")]
    RoomList { rooms: Vec<RoomSummary> },
    #[serde(rename = "player:joined")]
    PlayerJoined { player: PlayerView },
    #[serde(rename = "player:left")]
    PlayerLeft {
        player_id: PlayerId,
        #[serde(skip_serializing_if = "Option::is_none")]
        new_host: Option<UserId>,
    },
    #[serde(rename = "phase_change")]
    PhaseChange {
        phase: GamePhase,
        state: RoomStatus,
        day_number: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        phase_ends_at: Option<DateTime<Utc>>,
    },
    /// Private: the requester's own role after assignment.
    #[serde(rename = "role_assigned")]
    RoleAssigned { role: GameRole },
    /// Private: your role may act tonight.
    #[serde(rename = "night_ability_available")]
    NightAbilityAvailable { action: ActionType },
    /// Private: Cupid/Heir one-shot prompt on night one.
    #[serde(rename = "first_night_action")]
    FirstNightAction { action: ActionType },
    /// Private: the Little Girl may read the werewolf channel tonight.
    #[serde(rename = "werewolf_channel_access")]
    WerewolfChannelAccess { day_number: u32 },
    #[serde(rename = "player_died")]
    PlayerDied {
        player_id: PlayerId,
        role: GameRole,
        cause: DeathCause,
        day_number: u32,
    },
    #[serde(rename = "player_saved")]
    PlayerSaved { player_id: PlayerId },
    /// Private: seer reading.
    #[serde(rename = "investigation_result")]
    InvestigationResult { target_id: PlayerId, role: GameRole },
    /// Public at dawn: the Talkative Seer's reading.
    #[serde(rename = "talkative_seer_result")]
    TalkativeSeerResult { target_id: PlayerId, role: GameRole },
    #[serde(rename = "voting_started")]
    VotingStarted { ends_at: DateTime<Utc> },
    #[serde(rename = "vote:update")]
    VoteUpdate { tally: Vec<VoteCount> },
    #[serde(rename = "vote_results")]
    VoteResults {
        #[serde(skip_serializing_if = "Option::is_none")]
        eliminated: Option<PlayerId>,
        tally: Vec<VoteCount>,
        tie: bool,
    },
    /// The vote's candidate survived through a passive immunity.
    #[serde(rename = "vote_protection")]
    VoteProtection { player_id: PlayerId },
    /// Private to each lover.
    #[serde(rename = "became_lover")]
    BecameLover { partner_id: PlayerId },
    /// Private: your role changed (Black Wolf conversion).
    #[serde(rename = "role_changed")]
    RoleChanged { role: GameRole },
    /// Private: you inherited your testator's role.
    #[serde(rename = "role_inherited")]
    RoleInherited {
        role: GameRole,
        from_player_id: PlayerId,
    },
    /// Private: the Plunderer took the first deceased's role.
    #[serde(rename = "role_stolen")]
    RoleStolen {
        role: GameRole,
        from_player_id: PlayerId,
    },
    /// Private: a passive immunity's condition-role died.
    #[serde(rename = "protection_lost")]
    ProtectionLost { reason: String },
    /// Private: the dead hunter may take one revenge shot.
    #[serde(rename = "hunter:triggered")]
    HunterTriggered { expires_at: DateTime<Utc> },
    #[serde(rename = "hunter_revenge_completed")]
    HunterRevengeCompleted {
        hunter_id: PlayerId,
        target_id: PlayerId,
    },
    #[serde(rename = "dictator_success")]
    DictatorSuccess {
        dictator_id: PlayerId,
        target_id: PlayerId,
    },
    #[serde(rename = "dictator_failed")]
    DictatorFailed { dictator_id: PlayerId },
    #[serde(rename = "mercenary_victory")]
    MercenaryVictory { player_id: PlayerId },
    /// Private: day-1 reminder of the Mercenary's mark.
    #[serde(rename = "mercenary_reminder")]
    MercenaryReminder { target_id: PlayerId },
    #[serde(rename = "game_ended")]
    GameEnded {
        #[serde(skip_serializing_if = "Option::is_none")]
        winning_team: Option<Team>,
        reveal: Vec<RoleReveal>,
    },
    #[serde(rename = "pong")]
    Pong,
    #[serde(rename = "error")]
    Error { reason: String, code: ErrorCode },
}
