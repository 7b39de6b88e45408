//! Typed errors surfaced at the engine boundary.

use thiserror::Error;

use crate::protocol::ErrorCode;

/// Error kinds for every engine operation. Night-action failures are
/// reported to the submitter only; other players never learn of them.
#[derive(Debug, Error)]
pub enum GameError {
    /// Malformed input or a violated submission constraint.
    #[error("validation error: {reason}")]
    Validation { reason: String, code: ErrorCode },

    /// Room, player or ability not found.
    #[error("not found: {reason}")]
    NotFound { reason: String, code: ErrorCode },

    /// Action incompatible with the current phase, role or state.
    #[error("precondition failed: {reason}")]
    Precondition { reason: String, code: ErrorCode },

    /// Room full, code in use, duplicate join.
    #[error("conflict: {reason}")]
    Conflict { reason: String, code: ErrorCode },

    /// Caller is not the host / not the player.
    #[error("not allowed: {reason}")]
    Auth { reason: String, code: ErrorCode },

    /// Store or bus failure.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl GameError {
    pub fn validation(reason: impl Into<String>, code: ErrorCode) -> Self {
        Self::Validation {
            reason: reason.into(),
            code,
        }
    }

    pub fn not_found(reason: impl Into<String>, code: ErrorCode) -> Self {
        Self::NotFound {
            reason: reason.into(),
            code,
        }
    }

    pub fn precondition(reason: impl Into<String>, code: ErrorCode) -> Self {
        Self::Precondition {
            reason: reason.into(),
            code,
        }
    }

    pub fn conflict(reason: impl Into<String>, code: ErrorCode) -> Self {
        Self::Conflict {
            reason: reason.into(),
            code,
        }
    }

    pub fn auth(reason: impl Into<String>, code: ErrorCode) -> Self {
        Self::Auth {
            reason: reason.into(),
            code,
        }
    }

    pub fn room_not_found() -> Self {
        Self::not_found("room not found", ErrorCode::RoomNotFound)
    }

    pub fn player_not_found() -> Self {
        Self::not_found("player not found in this room", ErrorCode::NotInRoom)
    }

    /// Code transmitted with the `error` wire message.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { code, .. }
            | Self::NotFound { code, .. }
            | Self::Precondition { code, .. }
            | Self::Conflict { code, .. }
            | Self::Auth { code, .. } => *code,
            Self::Internal(_) => ErrorCode::InternalError,
        }
    }
}

pub type GameResult<T> = Result<T, GameError>;
