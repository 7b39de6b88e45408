//! Phase machine driver: `start_game`, the atomic `transition_to` with
//! its phase-end and phase-start hooks, and game-end settlement.

use anyhow::Result;
use chrono::{Duration, Utc};

use crate::error::{GameError, GameResult};
use crate::game::death::DeathPipeline;
use crate::game::night::{self, NightResolution};
use crate::game::roles::{AbilityKind, GameRole, Team};
use crate::game::room::{
    ActionType, DeathCause, GameEvent, GamePhase, GameWorld, RoomId, RoomStatus, UserId,
};
use crate::game::win::{self, Verdict};
use crate::game::{assign_roles, vote, Outbound};
use crate::protocol::{ErrorCode, RoleReveal, ServerMessage};
use crate::store::{commit_world, load_world, ActionFilter};
use crate::timer::TimerEntry;

use super::GameServer;

impl GameServer {
    /// Start the game: host-only, quorum required, room still waiting.
    /// Assigns roles and enters ROLE_ASSIGNMENT.
    pub async fn start_game(&self, user_id: UserId) -> GameResult<()> {
        let session = self
            .connections
            .session(user_id)
            .ok_or_else(|| GameError::precondition("not in a room", ErrorCode::NotInRoom))?;

        let _guard = self.store.lock_room(session.room_id).await;
        let ctx = self.ctx();
        let mut world = load_world(self.store.as_ref(), &ctx, session.room_id)
            .await
            .map_err(GameError::Internal)?
            .ok_or_else(GameError::room_not_found)?;

        if world.room.status != RoomStatus::Waiting {
            return Err(GameError::precondition(
                "the game has already started",
                ErrorCode::GameAlreadyStarted,
            ));
        }
        if world.room.host_user_id != user_id {
            return Err(GameError::auth(
                "only the host can start the game",
                ErrorCode::NotHost,
            ));
        }
        if world.players.len() < usize::from(world.room.min_players) {
            return Err(GameError::precondition(
                format!(
                    "{} of {} players seated",
                    world.players.len(),
                    world.room.min_players
                ),
                ErrorCode::NotEnoughPlayers,
            ));
        }

        let mut rng = fastrand::Rng::new();
        let out = assign_roles(&mut world, &mut rng);
        commit_world(self.store.as_ref(), &ctx, &world)
            .await
            .map_err(GameError::Internal)?;
        self.bus.publish_batch(world.room.id, &out).await;
        tracing::info!(room_id = %world.room.id, players = world.players.len(), "Game starting");

        self.transition_locked(session.room_id, GamePhase::RoleAssignment)
            .await
    }

    /// Timer dispatcher entry point: re-verify the phase under the room
    /// lock, then run the transition. Stale entries are dropped silently.
    pub(crate) async fn handle_phase_expiry(&self, entry: TimerEntry) -> Result<()> {
        let _guard = self.store.lock_room(entry.room_id).await;
        let ctx = self.ctx();
        let Some(room) = self.store.find_room_by_id(&ctx, entry.room_id).await? else {
            return Ok(());
        };
        if room.phase != entry.phase || room.status.is_terminal() {
            tracing::debug!(room_id = %entry.room_id, "Dropping stale timer entry");
            return Ok(());
        }
        self.transition_locked(entry.room_id, room.phase.next())
            .await
            .map_err(|e| anyhow::anyhow!(e.to_string()))
    }

    /// The atomic phase transition. Call with the room lock held.
    ///
    /// Order per the contract: clear the timer, run the outgoing phase's
    /// end hook, evaluate win conditions (short-circuiting to GAME_END),
    /// update the room fields, run the incoming phase's start hook, then
    /// re-arm the timer and emit `phase_change`.
    pub(crate) async fn transition_locked(
        &self,
        room_id: RoomId,
        next_phase: GamePhase,
    ) -> GameResult<()> {
        self.timers.cancel(room_id);

        let ctx = self.ctx();
        let mut world = load_world(self.store.as_ref(), &ctx, room_id)
            .await
            .map_err(GameError::Internal)?
            .ok_or_else(GameError::room_not_found)?;
        if world.room.status.is_terminal() {
            return Ok(());
        }

        let now = Utc::now();
        let mut out: Vec<Outbound> = Vec::new();
        let mut records: Vec<GameEvent> = Vec::new();
        let pipeline = DeathPipeline::new(now, self.game_config.hunter_grace_secs);

        // Phase-end hook for the outgoing phase.
        let mut resolution = NightResolution::default();
        let mut mercenary_victor = None;
        match world.room.phase {
            GamePhase::NightPhase => {
                resolution = self
                    .resolve_night(&mut world, &pipeline, &mut out, &mut records)
                    .await?;
            }
            GamePhase::DayVoting => {
                mercenary_victor = self
                    .finalize_vote(&mut world, &pipeline, &mut out, &mut records)
                    .await?;
            }
            _ => {}
        }

        // An unanswered revenge window lapses once its deadline passed.
        if world
            .room
            .pending_revenge
            .is_some_and(|p| p.expires_at <= now)
        {
            world.room.pending_revenge = None;
        }

        // Win evaluation; a settled Mercenary contract ends the game Solo.
        let verdict = if mercenary_victor.is_some() {
            Verdict::Won(Team::Solo)
        } else {
            win::evaluate(&world)
        };

        match verdict {
            Verdict::Ongoing => {
                self.enter_phase(&mut world, next_phase, &resolution, &mut out, &mut records)
                    .await?;
            }
            Verdict::Draw => {
                self.end_game(&mut world, None, mercenary_victor, &mut out, &mut records)
                    .await?;
            }
            Verdict::Won(team) => {
                self.end_game(&mut world, Some(team), mercenary_victor, &mut out, &mut records)
                    .await?;
            }
        }

        commit_world(self.store.as_ref(), &ctx, &world)
            .await
            .map_err(GameError::Internal)?;
        for record in records {
            self.store
                .create_event(&ctx, record)
                .await
                .map_err(GameError::Internal)?;
        }
        self.bus.publish_batch(room_id, &out).await;
        Ok(())
    }

    /// NIGHT_PHASE end hook: run the resolver over the night's committed
    /// actions and persist each seer reading into its action record.
    async fn resolve_night(
        &self,
        world: &mut GameWorld,
        pipeline: &DeathPipeline,
        out: &mut Vec<Outbound>,
        records: &mut Vec<GameEvent>,
    ) -> GameResult<NightResolution> {
        let ctx = self.ctx();
        let filter = ActionFilter {
            room_id: world.room.id,
            day_number: Some(world.room.day_number),
            phase: Some(GamePhase::NightPhase),
            ..ActionFilter::room(world.room.id)
        };
        let actions = self
            .store
            .find_actions(&ctx, &filter)
            .await
            .map_err(GameError::Internal)?;

        let resolution = night::resolve(world, &actions, pipeline, out);

        for investigation in &resolution.investigations {
            if let Some(mut action) = actions
                .iter()
                .find(|a| {
                    a.performer_id == investigation.seer_id && a.kind == ActionType::SeerInvestigate
                })
                .cloned()
            {
                action.result = Some(serde_json::json!({
                    "target_id": investigation.target_id.to_string(),
                    "role": investigation.role,
                }));
                self.store
                    .upsert_action(&ctx, action)
                    .await
                    .map_err(GameError::Internal)?;
            }
        }

        for death in &resolution.deaths {
            records.push(event_record(
                world,
                "night_death",
                serde_json::json!({
                    "player_id": death.player_id.to_string(),
                    "role": death.role,
                    "cause": death.cause,
                }),
            ));
        }
        world.room.little_girl_spying = false;
        Ok(resolution)
    }

    /// DAY_VOTING end hook.
    async fn finalize_vote(
        &self,
        world: &mut GameWorld,
        pipeline: &DeathPipeline,
        out: &mut Vec<Outbound>,
        records: &mut Vec<GameEvent>,
    ) -> GameResult<Option<crate::game::room::PlayerId>> {
        let ctx = self.ctx();
        let filter = ActionFilter {
            room_id: world.room.id,
            day_number: Some(world.room.day_number),
            phase: Some(GamePhase::DayVoting),
            kind: Some(ActionType::DayVote),
            ..ActionFilter::room(world.room.id)
        };
        let actions = self
            .store
            .find_actions(&ctx, &filter)
            .await
            .map_err(GameError::Internal)?;

        let mut rng = fastrand::Rng::new();
        let outcome = vote::finalize(world, &actions, pipeline, &mut rng, out);

        records.push(event_record(
            world,
            "vote_results",
            serde_json::json!({
                "candidate": outcome.candidate.map(|id| id.to_string()),
                "tie": outcome.tie,
                "protected": outcome.protected,
                "tally": outcome.tally,
            }),
        ));
        Ok(outcome.mercenary_victor)
    }

    /// Update room fields for the incoming phase and run its start hook.
    async fn enter_phase(
        &self,
        world: &mut GameWorld,
        phase: GamePhase,
        resolution: &NightResolution,
        out: &mut Vec<Outbound>,
        records: &mut Vec<GameEvent>,
    ) -> GameResult<()> {
        let now = Utc::now();
        world.room.phase = phase;
        world.room.status = phase.status();
        world.room.phase_started_at = now;
        if phase == GamePhase::NightPhase {
            world.room.day_number += 1;
        }
        world.room.phase_ends_at = world
            .room
            .phase_duration_secs(phase)
            .map(|secs| now + Duration::seconds(secs as i64));
        world.room.update_activity();

        match phase {
            GamePhase::NightPhase => self.start_night(world, out).await?,
            GamePhase::DayDiscussion => start_day(resolution, out),
            GamePhase::DayVoting => self.start_voting(world, out).await?,
            _ => {}
        }

        // The game may have ended inside the start hook (Little Girl roll).
        if world.room.status.is_terminal() {
            return Ok(());
        }

        if let Some(ends_at) = world.room.phase_ends_at {
            self.timers.schedule(TimerEntry {
                room_id: world.room.id,
                phase,
                deadline: ends_at,
            });
        }

        tracing::info!(
            room_id = %world.room.id,
            ?phase,
            day_number = world.room.day_number,
            "Phase change"
        );
        out.push(Outbound::room(ServerMessage::PhaseChange {
            phase,
            state: world.room.status,
            day_number: world.room.day_number,
            phase_ends_at: world.room.phase_ends_at,
        }));
        records.push(event_record(
            world,
            "phase_change",
            serde_json::json!({ "phase": phase, "state": world.room.status }),
        ));
        Ok(())
    }

    /// NIGHT_PHASE start hook: purge leftover submissions for this night
    /// (re-entry idempotence), prompt night-capable roles, roll the
    /// Little Girl's spying check.
    async fn start_night(&self, world: &mut GameWorld, out: &mut Vec<Outbound>) -> GameResult<()> {
        let ctx = self.ctx();
        let filter = ActionFilter {
            room_id: world.room.id,
            day_number: Some(world.room.day_number),
            phase: Some(GamePhase::NightPhase),
            ..ActionFilter::room(world.room.id)
        };
        self.store
            .delete_actions(&ctx, &filter)
            .await
            .map_err(GameError::Internal)?;

        let day = world.room.day_number;
        for player in world.players.clone() {
            if !player.is_alive() {
                continue;
            }
            let Some(role) = player.role else { continue };
            if !role.has_night_action(day) {
                continue;
            }
            if matches!(role, GameRole::Cupid | GameRole::Heir) {
                let action = if role == GameRole::Cupid {
                    ActionType::CupidLink
                } else {
                    ActionType::HeirChoose
                };
                out.push(Outbound::player(
                    player.id,
                    ServerMessage::FirstNightAction { action },
                ));
                continue;
            }
            for action in night_actions_for(role) {
                out.push(Outbound::player(
                    player.id,
                    ServerMessage::NightAbilityAvailable { action },
                ));
            }
        }

        self.roll_little_girl(world, out).await?;
        Ok(())
    }

    /// The Little Girl spies on the werewolves: a configured chance of
    /// being caught and killed, otherwise read access to their channel
    /// for this night.
    async fn roll_little_girl(
        &self,
        world: &mut GameWorld,
        out: &mut Vec<Outbound>,
    ) -> GameResult<()> {
        let girls: Vec<_> = world
            .alive_with_role(GameRole::LittleGirl)
            .map(|p| p.id)
            .collect();
        if girls.is_empty() {
            return Ok(());
        }

        let now = Utc::now();
        let pipeline = DeathPipeline::new(now, self.game_config.hunter_grace_secs);
        let mut rng = fastrand::Rng::new();
        for girl in girls {
            if rng.f64() < self.game_config.little_girl_catch_chance {
                tracing::info!(room_id = %world.room.id, player_id = %girl, "Little Girl caught spying");
                pipeline.kill(world, girl, DeathCause::CaughtSpying, out);
            } else {
                world.room.little_girl_spying = true;
                out.push(Outbound::player(
                    girl,
                    ServerMessage::WerewolfChannelAccess {
                        day_number: world.room.day_number,
                    },
                ));
            }
        }

        // The catch may have been the last state change the game needed.
        match win::evaluate(world) {
            Verdict::Ongoing => Ok(()),
            Verdict::Draw => {
                let mut records = Vec::new();
                self.end_game(world, None, None, out, &mut records).await?;
                self.flush_records(records).await
            }
            Verdict::Won(team) => {
                let mut records = Vec::new();
                self.end_game(world, Some(team), None, out, &mut records)
                    .await?;
                self.flush_records(records).await
            }
        }
    }

    async fn flush_records(&self, records: Vec<GameEvent>) -> GameResult<()> {
        let ctx = self.ctx();
        for record in records {
            self.store
                .create_event(&ctx, record)
                .await
                .map_err(GameError::Internal)?;
        }
        Ok(())
    }

    /// DAY_VOTING start hook: purge stale ballots, remind the Mercenary
    /// on day one, open the vote.
    async fn start_voting(&self, world: &mut GameWorld, out: &mut Vec<Outbound>) -> GameResult<()> {
        let ctx = self.ctx();
        let filter = ActionFilter {
            room_id: world.room.id,
            day_number: Some(world.room.day_number),
            phase: Some(GamePhase::DayVoting),
            kind: Some(ActionType::DayVote),
            ..ActionFilter::room(world.room.id)
        };
        self.store
            .delete_actions(&ctx, &filter)
            .await
            .map_err(GameError::Internal)?;

        if world.room.day_number == 1 {
            let reminders: Vec<_> = world
                .alive_with_role(GameRole::Mercenary)
                .filter_map(|p| {
                    world
                        .ability(p.id, AbilityKind::MercenaryTarget)
                        .and_then(|a| a.target_id())
                        .map(|target| (p.id, target))
                })
                .collect();
            for (mercenary, target) in reminders {
                out.push(Outbound::player(
                    mercenary,
                    ServerMessage::MercenaryReminder { target_id: target },
                ));
            }
        }

        if let Some(ends_at) = world.room.phase_ends_at {
            out.push(Outbound::room(ServerMessage::VotingStarted { ends_at }));
        }
        Ok(())
    }

    /// Game-end settlement: final room fields, full role reveal, stats.
    pub(crate) async fn end_game(
        &self,
        world: &mut GameWorld,
        winning_team: Option<Team>,
        mercenary_victor: Option<crate::game::room::PlayerId>,
        out: &mut Vec<Outbound>,
        records: &mut Vec<GameEvent>,
    ) -> GameResult<()> {
        let ctx = self.ctx();
        world.room.phase = GamePhase::GameEnd;
        world.room.status = RoomStatus::Ended;
        world.room.phase_started_at = Utc::now();
        world.room.phase_ends_at = None;
        world.room.winning_team = winning_team;
        world.room.end_reason = Some(if winning_team.is_some() {
            crate::game::room::EndReason::WinnerResolved
        } else {
            crate::game::room::EndReason::Draw
        });
        world.room.pending_revenge = None;

        let mut reveal = Vec::with_capacity(world.players.len());
        for player in &mut world.players {
            player.is_revealed = true;
            if let Some(role) = player.role {
                reveal.push(RoleReveal {
                    player_id: player.id,
                    name: player.name.clone(),
                    role,
                    team: role.team(),
                    state: player.state,
                });
            }
        }

        for player in &world.players {
            let won = match (winning_team, player.role) {
                _ if mercenary_victor == Some(player.id) => true,
                (Some(team), Some(role)) => role.team() == team,
                _ => false,
            };
            if let Err(e) = self
                .store
                .increment_user_stats(&ctx, player.user_id, 1, u32::from(won))
                .await
            {
                tracing::warn!(user_id = %player.user_id, "Failed to update user stats: {e}");
            }
        }

        tracing::info!(
            room_id = %world.room.id,
            winning_team = ?winning_team,
            "Game ended"
        );
        out.push(Outbound::room(ServerMessage::GameEnded {
            winning_team,
            reveal,
        }));
        records.push(event_record(
            world,
            "game_ended",
            serde_json::json!({ "winning_team": winning_team }),
        ));

        self.timers.cancel(world.room.id);
        self.registry.deregister(world.room.id);
        Ok(())
    }
}

/// DAY_DISCUSSION start hook: broadcast the Talkative Seer's readings.
/// Night deaths travel in the same batch, directly from the resolver.
fn start_day(resolution: &NightResolution, out: &mut Vec<Outbound>) {
    for investigation in &resolution.investigations {
        if investigation.talkative {
            out.push(Outbound::room(ServerMessage::TalkativeSeerResult {
                target_id: investigation.target_id,
                role: investigation.role,
            }));
        }
    }
}

/// Actions a night-capable role may submit tonight.
fn night_actions_for(role: GameRole) -> Vec<ActionType> {
    match role {
        GameRole::Werewolf | GameRole::WolfRidingHood => vec![ActionType::WerewolfVote],
        GameRole::WhiteWolf => vec![ActionType::WerewolfVote, ActionType::WhiteWolfDevour],
        GameRole::BlackWolf => vec![ActionType::WerewolfVote, ActionType::BlackWolfConvert],
        GameRole::Seer | GameRole::TalkativeSeer => vec![ActionType::SeerInvestigate],
        GameRole::Witch => vec![ActionType::WitchHeal, ActionType::WitchPoison],
        GameRole::Guard => vec![ActionType::GuardProtect],
        _ => Vec::new(),
    }
}

fn event_record(world: &GameWorld, kind: &str, data: serde_json::Value) -> GameEvent {
    GameEvent {
        room_id: world.room.id,
        kind: kind.to_string(),
        day_number: world.room.day_number,
        data,
        created_at: Utc::now(),
    }
}
