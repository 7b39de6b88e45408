//! Wire protocol: message enums, payload types, room codes and input
//! validation shared by the WebSocket gateway and the engine.

pub mod error_codes;
pub mod messages;
pub mod room_codes;
pub mod types;
pub mod validation;

pub use error_codes::ErrorCode;
pub use messages::{ClientMessage, PotionKind, ServerMessage};
pub use types::{
    PlayerView, RoleReveal, RoomSettings, RoomSnapshot, RoomSummary, VoteCount, ROOM_CODE_LENGTH,
    ROOM_CODE_RETRIES,
};
