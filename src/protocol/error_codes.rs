use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes for structured error handling at the wire boundary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Authentication
    Unauthorized,
    NotHost,
    NotYourPlayer,

    // Validation
    InvalidInput,
    InvalidRoomName,
    InvalidRoomCode,
    InvalidPlayerName,
    InvalidDuration,
    InvalidPlayerLimits,
    SelfTargetForbidden,
    RepeatGuardTarget,

    // Room membership
    RoomNotFound,
    RoomFull,
    AlreadyInRoom,
    NotInRoom,
    WrongPassword,
    RoomCodeExhausted,

    // Game state
    WrongPhase,
    NotEnoughPlayers,
    PlayerNotAlive,
    TargetNotAlive,
    RoleMismatch,
    AbilityExhausted,
    AbilityOnCooldown,
    RevengeWindowClosed,
    GameAlreadyStarted,

    // Server
    InternalError,
    StorageError,
    ServiceUnavailable,
}

impl ErrorCode {
    /// Human-readable description shown to clients alongside the code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Unauthorized => "Authentication is required before any other message.",
            Self::NotHost => "Only the room host can perform this action.",
            Self::NotYourPlayer => "You can only act for your own player.",

            Self::InvalidInput => "The provided input is invalid or malformed.",
            Self::InvalidRoomName => "Room names must be between 1 and 50 characters.",
            Self::InvalidRoomCode => "Room codes are exactly 6 characters of A-Z and 0-9.",
            Self::InvalidPlayerName => "Player names must be non-empty and reasonably short.",
            Self::InvalidDuration => "A phase duration is outside its allowed range.",
            Self::InvalidPlayerLimits => "Player limits must satisfy 5 <= min <= max <= 15.",
            Self::SelfTargetForbidden => "This ability cannot target yourself.",
            Self::RepeatGuardTarget => "The guard cannot protect the same player twice in a row.",

            Self::RoomNotFound => "No open room matches that id or code.",
            Self::RoomFull => "The room has reached its maximum player capacity.",
            Self::AlreadyInRoom => "You already have a seat in this room.",
            Self::NotInRoom => "You are not a player in this room.",
            Self::WrongPassword => "The room password does not match.",
            Self::RoomCodeExhausted => "Could not allocate a unique room code; try again.",

            Self::WrongPhase => "That action is not available in the current phase.",
            Self::NotEnoughPlayers => "The room has not reached its minimum player count.",
            Self::PlayerNotAlive => "Only alive players can act or vote.",
            Self::TargetNotAlive => "The targeted player is not alive.",
            Self::RoleMismatch => "Your role cannot perform that action.",
            Self::AbilityExhausted => "That ability has no uses left.",
            Self::AbilityOnCooldown => "That ability is still on cooldown.",
            Self::RevengeWindowClosed => "The revenge window has expired.",
            Self::GameAlreadyStarted => "The game has already started.",

            Self::InternalError => "An internal server error occurred. Please try again.",
            Self::StorageError => "A storage error occurred while processing the request.",
            Self::ServiceUnavailable => "The server is shutting down or temporarily unavailable.",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}
