//! Day-vote intake: upsert ballots, live tally updates and early phase
//! termination once every alive player has spoken.

use chrono::Utc;

use crate::error::{GameError, GameResult};
use crate::game::room::{ActionType, GameAction, GamePhase, PlayerId, UserId};
use crate::game::vote;
use crate::protocol::{ErrorCode, ServerMessage};
use crate::store::{load_world, ActionFilter};
use crate::timer::TimerEntry;

use super::GameServer;

impl GameServer {
    /// Cast or change a vote. `None` is an explicit abstention; both count
    /// toward the everyone-has-voted early termination.
    pub async fn cast_vote(&self, user_id: UserId, target_id: Option<PlayerId>) -> GameResult<()> {
        let session = self.require_session(user_id)?;
        let _guard = self.store.lock_room(session.room_id).await;
        let ctx = self.ctx();
        let world = load_world(self.store.as_ref(), &ctx, session.room_id)
            .await
            .map_err(GameError::Internal)?
            .ok_or_else(GameError::room_not_found)?;

        if world.room.phase != GamePhase::DayVoting {
            return Err(GameError::precondition(
                "votes are only valid during the voting phase",
                ErrorCode::WrongPhase,
            ));
        }
        let performer = world
            .player(session.player_id)
            .ok_or_else(GameError::player_not_found)?;
        if !performer.is_alive() {
            return Err(GameError::precondition(
                "dead players cannot vote",
                ErrorCode::PlayerNotAlive,
            ));
        }
        if let Some(target) = target_id {
            if !world.player(target).is_some_and(|p| p.is_alive()) {
                return Err(GameError::precondition(
                    "the vote target is not alive",
                    ErrorCode::TargetNotAlive,
                ));
            }
        }

        self.store
            .upsert_action(
                &ctx,
                GameAction {
                    room_id: world.room.id,
                    performer_id: session.player_id,
                    kind: ActionType::DayVote,
                    day_number: world.room.day_number,
                    phase: GamePhase::DayVoting,
                    target_id,
                    metadata: None,
                    result: None,
                    created_at: Utc::now(),
                },
            )
            .await
            .map_err(GameError::Internal)?;

        let filter = ActionFilter {
            room_id: world.room.id,
            day_number: Some(world.room.day_number),
            phase: Some(GamePhase::DayVoting),
            kind: Some(ActionType::DayVote),
            ..ActionFilter::room(world.room.id)
        };
        let ballots = self
            .store
            .find_actions(&ctx, &filter)
            .await
            .map_err(GameError::Internal)?;

        self.bus
            .publish_room(
                world.room.id,
                &ServerMessage::VoteUpdate {
                    tally: vote::current_tally(&world, &ballots),
                },
            )
            .await;

        // Early termination: every alive player has cast a ballot or an
        // explicit abstention. The phase ends through an immediate timer
        // entry, never by a reentrant transition from inside this write.
        let voters = ballots
            .iter()
            .filter(|b| {
                world
                    .player(b.performer_id)
                    .is_some_and(|p| p.is_alive())
            })
            .count();
        if voters >= world.alive_count() {
            tracing::debug!(room_id = %world.room.id, "All votes in, ending phase early");
            self.timers.schedule(TimerEntry {
                room_id: world.room.id,
                phase: GamePhase::DayVoting,
                deadline: Utc::now(),
            });
        }
        Ok(())
    }
}
