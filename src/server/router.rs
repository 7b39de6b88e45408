//! Message router: maps authenticated client messages onto engine calls.
//! Failures become private `error` replies to the submitter only.

use std::sync::Arc;

use crate::error::GameError;
use crate::game::room::{ActionType, UserId};
use crate::protocol::{ClientMessage, PotionKind, ServerMessage};

use super::GameServer;

/// Dispatch one client message. The returned message, if any, is a direct
/// reply for this connection; room-visible effects travel over the bus.
pub async fn dispatch(
    server: &Arc<GameServer>,
    user_id: UserId,
    message: ClientMessage,
) -> Option<ServerMessage> {
    let result = route(server, user_id, message).await;
    match result {
        Ok(reply) => reply,
        Err(error) => {
            tracing::debug!(%user_id, code = ?error.code(), "Request failed: {error}");
            Some(ServerMessage::Error {
                reason: error.to_string(),
                code: error.code(),
            })
        }
    }
}

async fn route(
    server: &Arc<GameServer>,
    user_id: UserId,
    message: ClientMessage,
) -> Result<Option<ServerMessage>, GameError> {
    match message {
        ClientMessage::Authenticate { .. } => Ok(None), // handled at the socket layer
        ClientMessage::CreateRoom { settings } => {
            let snapshot = server.create_room(user_id, settings).await?;
            Ok(Some(ServerMessage::GameState(Box::new(snapshot))))
        }
        ClientMessage::JoinRoom {
            room_id,
            room_code,
            password,
        } => {
            let snapshot = server
                .join_room(user_id, room_id, room_code, password)
                .await?;
            Ok(Some(ServerMessage::GameState(Box::new(snapshot))))
        }
        ClientMessage::LeaveRoom => {
            server.leave_room(user_id).await?;
            Ok(None)
        }
        ClientMessage::StartGame => {
            server.start_game(user_id).await?;
            Ok(None)
        }
        ClientMessage::RequestState => {
            let snapshot = server.snapshot_for(user_id).await?;
            Ok(Some(ServerMessage::GameState(Box::new(snapshot))))
        }
        ClientMessage::ListRooms => {
            let rooms = server.list_rooms().await?;
            Ok(Some(ServerMessage::RoomList { rooms }))
        }
        ClientMessage::CastVote { target_id } => {
            server.cast_vote(user_id, target_id).await?;
            Ok(None)
        }
        ClientMessage::NightAction {
            action,
            target_id,
            metadata,
        } => {
            server
                .submit_night_action(user_id, action, target_id, metadata)
                .await?;
            Ok(None)
        }
        ClientMessage::HunterRevenge { target_id } => {
            server.hunter_shoot(user_id, target_id).await?;
            Ok(None)
        }
        ClientMessage::DictatorCoup { target_id } => {
            server.dictator_coup(user_id, target_id).await?;
            Ok(None)
        }
        ClientMessage::CupidLink {
            player1_id,
            player2_id,
        } => {
            let metadata = serde_json::json!({
                "player1_id": player1_id.to_string(),
                "player2_id": player2_id.to_string(),
            });
            server
                .submit_night_action(user_id, ActionType::CupidLink, None, Some(metadata))
                .await?;
            Ok(None)
        }
        ClientMessage::WitchPotion { kind, target_id } => {
            let action = match kind {
                PotionKind::Heal => ActionType::WitchHeal,
                PotionKind::Poison => ActionType::WitchPoison,
            };
            server
                .submit_night_action(user_id, action, target_id, None)
                .await?;
            Ok(None)
        }
        ClientMessage::Ping => Ok(Some(ServerMessage::Pong)),
    }
}
