//! Client-submitted game actions: night submissions, the Hunter's revenge
//! shot and the Dictator's coup.
//!
//! Failed submissions surface only to the submitter; the rest of the room
//! never learns a secret action was attempted.

use chrono::Utc;

use crate::error::{GameError, GameResult};
use crate::game::death::DeathPipeline;
use crate::game::roles::{AbilityKind, GameRole, Team};
use crate::game::room::{
    ActionType, DeathCause, GameAction, GameEvent, GamePhase, GameWorld, PlayerId, UserId,
};
use crate::game::win::{self, Verdict};
use crate::game::Outbound;
use crate::protocol::{ErrorCode, ServerMessage};
use crate::store::{commit_world, load_world};

use super::{GameServer, Session};

impl GameServer {
    /// Record a night action for the current night. The submission is an
    /// upsert: changing one's mind overwrites the prior choice.
    pub async fn submit_night_action(
        &self,
        user_id: UserId,
        kind: ActionType,
        target_id: Option<PlayerId>,
        metadata: Option<serde_json::Value>,
    ) -> GameResult<()> {
        let session = self.require_session(user_id)?;
        let _guard = self.store.lock_room(session.room_id).await;
        let ctx = self.ctx();
        let world = load_world(self.store.as_ref(), &ctx, session.room_id)
            .await
            .map_err(GameError::Internal)?
            .ok_or_else(GameError::room_not_found)?;

        if world.room.phase != GamePhase::NightPhase {
            return Err(GameError::precondition(
                "night actions are only valid during the night",
                ErrorCode::WrongPhase,
            ));
        }
        let performer = world
            .player(session.player_id)
            .ok_or_else(GameError::player_not_found)?;
        if !performer.is_alive() {
            return Err(GameError::precondition(
                "dead players cannot act",
                ErrorCode::PlayerNotAlive,
            ));
        }
        let role = performer.role.ok_or_else(|| {
            GameError::precondition("roles are not assigned yet", ErrorCode::WrongPhase)
        })?;

        self.validate_night_submission(&world, session.player_id, role, kind, target_id, &metadata)?;

        self.store
            .upsert_action(
                &ctx,
                GameAction {
                    room_id: world.room.id,
                    performer_id: session.player_id,
                    kind,
                    day_number: world.room.day_number,
                    phase: GamePhase::NightPhase,
                    target_id,
                    metadata,
                    result: None,
                    created_at: Utc::now(),
                },
            )
            .await
            .map_err(GameError::Internal)?;
        tracing::debug!(
            room_id = %world.room.id,
            performer = %session.player_id,
            ?kind,
            "Night action recorded"
        );
        Ok(())
    }

    fn validate_night_submission(
        &self,
        world: &GameWorld,
        performer_id: PlayerId,
        role: GameRole,
        kind: ActionType,
        target_id: Option<PlayerId>,
        metadata: &Option<serde_json::Value>,
    ) -> GameResult<()> {
        let day = world.room.day_number;

        let role_ok = match kind {
            ActionType::WerewolfVote => role.joins_wolf_vote(),
            ActionType::GuardProtect => role == GameRole::Guard,
            ActionType::WhiteWolfDevour => role == GameRole::WhiteWolf,
            ActionType::BlackWolfConvert => role == GameRole::BlackWolf,
            ActionType::WitchHeal | ActionType::WitchPoison => role == GameRole::Witch,
            ActionType::SeerInvestigate => {
                matches!(role, GameRole::Seer | GameRole::TalkativeSeer)
            }
            ActionType::CupidLink => role == GameRole::Cupid,
            ActionType::HeirChoose => role == GameRole::Heir,
            ActionType::DayVote | ActionType::HunterShoot | ActionType::DictatorCoup => false,
        };
        if !role_ok {
            return Err(GameError::precondition(
                "your role cannot perform that action",
                ErrorCode::RoleMismatch,
            ));
        }

        if matches!(kind, ActionType::CupidLink | ActionType::HeirChoose) && day != 1 {
            return Err(GameError::precondition(
                "first-night actions are only valid on night one",
                ErrorCode::WrongPhase,
            ));
        }

        // Target checks. Cupid carries its pair in metadata instead.
        if kind == ActionType::CupidLink {
            let pair = metadata.as_ref().and_then(|m| {
                let a: PlayerId = m.get("player1_id")?.as_str()?.parse().ok()?;
                let b: PlayerId = m.get("player2_id")?.as_str()?.parse().ok()?;
                Some((a, b))
            });
            let Some((a, b)) = pair else {
                return Err(GameError::validation(
                    "cupid link requires two player ids",
                    ErrorCode::InvalidInput,
                ));
            };
            if a == b {
                return Err(GameError::validation(
                    "lovers must be two different players",
                    ErrorCode::InvalidInput,
                ));
            }
            for lover in [a, b] {
                if !world.player(lover).is_some_and(|p| p.is_alive()) {
                    return Err(GameError::precondition(
                        "both lovers must be alive",
                        ErrorCode::TargetNotAlive,
                    ));
                }
            }
        } else {
            let target = target_id.ok_or_else(|| {
                GameError::validation("a target is required", ErrorCode::InvalidInput)
            })?;
            if !world.player(target).is_some_and(|p| p.is_alive()) {
                return Err(GameError::precondition(
                    "the targeted player is not alive",
                    ErrorCode::TargetNotAlive,
                ));
            }
        }

        match kind {
            ActionType::GuardProtect => {
                let target = target_id.unwrap_or_default();
                if target == performer_id {
                    return Err(GameError::validation(
                        "the guard cannot protect themselves",
                        ErrorCode::SelfTargetForbidden,
                    ));
                }
                if let Some(ability) = world.ability(performer_id, AbilityKind::GuardProtect) {
                    let guarded_last_night = ability.target_id() == Some(target)
                        && ability.last_used_day == Some(day.saturating_sub(1))
                        && day > 1;
                    if guarded_last_night {
                        return Err(GameError::validation(
                            "cannot protect the same player two nights in a row",
                            ErrorCode::RepeatGuardTarget,
                        ));
                    }
                }
            }
            ActionType::HeirChoose => {
                if target_id == Some(performer_id) {
                    return Err(GameError::validation(
                        "the heir cannot designate themselves",
                        ErrorCode::SelfTargetForbidden,
                    ));
                }
                self.require_uses(world, performer_id, AbilityKind::HeirTarget)?;
            }
            ActionType::WhiteWolfDevour => {
                let ability = world
                    .ability(performer_id, AbilityKind::WhiteWolfDevour)
                    .ok_or_else(|| {
                        GameError::not_found("devour ability missing", ErrorCode::AbilityExhausted)
                    })?;
                if ability.uses_left == 0 {
                    return Err(GameError::precondition(
                        "no devour uses left",
                        ErrorCode::AbilityExhausted,
                    ));
                }
                if !ability.ready(day) {
                    return Err(GameError::precondition(
                        "devour is still on cooldown",
                        ErrorCode::AbilityOnCooldown,
                    ));
                }
            }
            ActionType::BlackWolfConvert => {
                self.require_uses(world, performer_id, AbilityKind::BlackWolfConvert)?;
            }
            ActionType::WitchHeal => {
                self.require_uses(world, performer_id, AbilityKind::WitchHeal)?;
            }
            ActionType::WitchPoison => {
                self.require_uses(world, performer_id, AbilityKind::WitchPoison)?;
            }
            ActionType::CupidLink => {
                self.require_uses(world, performer_id, AbilityKind::CupidLink)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn require_uses(
        &self,
        world: &GameWorld,
        player_id: PlayerId,
        kind: AbilityKind,
    ) -> GameResult<()> {
        let ability = world.ability(player_id, kind).ok_or_else(|| {
            GameError::not_found("ability not found", ErrorCode::AbilityExhausted)
        })?;
        if ability.uses_left == 0 {
            return Err(GameError::precondition(
                "that ability has no uses left",
                ErrorCode::AbilityExhausted,
            ));
        }
        Ok(())
    }

    /// The dead Hunter's one revenge shot, valid only inside the grace
    /// window opened by their death.
    pub async fn hunter_shoot(&self, user_id: UserId, target_id: PlayerId) -> GameResult<()> {
        let session = self.require_session(user_id)?;
        let _guard = self.store.lock_room(session.room_id).await;
        let ctx = self.ctx();
        let mut world = load_world(self.store.as_ref(), &ctx, session.room_id)
            .await
            .map_err(GameError::Internal)?
            .ok_or_else(GameError::room_not_found)?;

        let now = Utc::now();
        let pending = world.room.pending_revenge.ok_or_else(|| {
            GameError::precondition("no revenge window is open", ErrorCode::RevengeWindowClosed)
        })?;
        if pending.hunter_id != session.player_id {
            return Err(GameError::auth(
                "the revenge shot belongs to the dead hunter",
                ErrorCode::NotYourPlayer,
            ));
        }
        if pending.expires_at <= now {
            world.room.pending_revenge = None;
            commit_world(self.store.as_ref(), &ctx, &world)
                .await
                .map_err(GameError::Internal)?;
            return Err(GameError::precondition(
                "the revenge window has expired",
                ErrorCode::RevengeWindowClosed,
            ));
        }
        if !world.player(target_id).is_some_and(|p| p.is_alive()) {
            return Err(GameError::precondition(
                "the targeted player is not alive",
                ErrorCode::TargetNotAlive,
            ));
        }

        let mut out = Vec::new();
        let pipeline = DeathPipeline::new(now, self.game_config.hunter_grace_secs);
        world.room.pending_revenge = None;
        pipeline.kill(&mut world, target_id, DeathCause::HunterRevenge, &mut out);
        out.push(Outbound::room(ServerMessage::HunterRevengeCompleted {
            hunter_id: session.player_id,
            target_id,
        }));

        let mut records = vec![GameEvent {
            room_id: world.room.id,
            kind: "hunter_revenge".to_string(),
            day_number: world.room.day_number,
            data: serde_json::json!({
                "hunter_id": session.player_id.to_string(),
                "target_id": target_id.to_string(),
            }),
            created_at: now,
        }];
        self.settle_after_kill(&mut world, &mut out, &mut records)
            .await?;

        commit_world(self.store.as_ref(), &ctx, &world)
            .await
            .map_err(GameError::Internal)?;
        for record in records {
            self.store
                .create_event(&ctx, record)
                .await
                .map_err(GameError::Internal)?;
        }
        self.bus.publish_batch(world.room.id, &out).await;
        Ok(())
    }

    /// Dictator coup: naming a werewolf executes them on the spot and
    /// makes the Dictator mayor; naming anyone else costs the Dictator
    /// their life.
    pub async fn dictator_coup(&self, user_id: UserId, target_id: PlayerId) -> GameResult<()> {
        let session = self.require_session(user_id)?;
        let _guard = self.store.lock_room(session.room_id).await;
        let ctx = self.ctx();
        let mut world = load_world(self.store.as_ref(), &ctx, session.room_id)
            .await
            .map_err(GameError::Internal)?
            .ok_or_else(GameError::room_not_found)?;

        if !matches!(
            world.room.phase,
            GamePhase::DayDiscussion | GamePhase::DayVoting
        ) {
            return Err(GameError::precondition(
                "a coup can only be staged in daylight",
                ErrorCode::WrongPhase,
            ));
        }
        let performer = world
            .player(session.player_id)
            .ok_or_else(GameError::player_not_found)?;
        if !performer.is_alive() {
            return Err(GameError::precondition(
                "dead players cannot stage a coup",
                ErrorCode::PlayerNotAlive,
            ));
        }
        if performer.role != Some(GameRole::Dictator) {
            return Err(GameError::precondition(
                "only the dictator can stage a coup",
                ErrorCode::RoleMismatch,
            ));
        }
        let target = world
            .player(target_id)
            .filter(|p| p.is_alive())
            .ok_or_else(|| {
                GameError::precondition("the targeted player is not alive", ErrorCode::TargetNotAlive)
            })?;

        let now = Utc::now();
        let pipeline = DeathPipeline::new(now, self.game_config.hunter_grace_secs);
        let mut out = Vec::new();
        let succeeded = target.role.map(GameRole::team) == Some(Team::Werewolves);

        if succeeded {
            pipeline.kill(&mut world, target_id, DeathCause::VotedOut, &mut out);
            world.abilities.push(crate::game::room::Ability {
                player_id: session.player_id,
                kind: AbilityKind::MayorVote,
                uses_left: 0,
                max_uses: 0,
                cooldown_days: 0,
                last_used_day: None,
                metadata: serde_json::Value::Null,
            });
            out.push(Outbound::room(ServerMessage::DictatorSuccess {
                dictator_id: session.player_id,
                target_id,
            }));
        } else {
            pipeline.kill(
                &mut world,
                session.player_id,
                DeathCause::FailedCoup,
                &mut out,
            );
            out.push(Outbound::room(ServerMessage::DictatorFailed {
                dictator_id: session.player_id,
            }));
        }

        let mut records = vec![GameEvent {
            room_id: world.room.id,
            kind: "dictator_coup".to_string(),
            day_number: world.room.day_number,
            data: serde_json::json!({
                "dictator_id": session.player_id.to_string(),
                "target_id": target_id.to_string(),
                "succeeded": succeeded,
            }),
            created_at: now,
        }];
        self.settle_after_kill(&mut world, &mut out, &mut records)
            .await?;

        commit_world(self.store.as_ref(), &ctx, &world)
            .await
            .map_err(GameError::Internal)?;
        for record in records {
            self.store
                .create_event(&ctx, record)
                .await
                .map_err(GameError::Internal)?;
        }
        self.bus.publish_batch(world.room.id, &out).await;
        Ok(())
    }

    /// Out-of-hook kills (revenge, coup) still settle win conditions
    /// immediately.
    async fn settle_after_kill(
        &self,
        world: &mut GameWorld,
        out: &mut Vec<Outbound>,
        records: &mut Vec<GameEvent>,
    ) -> GameResult<()> {
        match win::evaluate(world) {
            Verdict::Ongoing => Ok(()),
            Verdict::Draw => self.end_game(world, None, None, out, records).await,
            Verdict::Won(team) => self.end_game(world, Some(team), None, out, records).await,
        }
    }

    pub(crate) fn require_session(&self, user_id: UserId) -> GameResult<Session> {
        self.connections
            .session(user_id)
            .ok_or_else(|| GameError::precondition("not in a room", ErrorCode::NotInRoom))
    }
}
