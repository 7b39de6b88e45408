//! Night-action resolution: priority-ordered aggregation of the secret
//! submissions of one night into deaths, protections, conversions and
//! disclosures.
//!
//! The resolver is deterministic over its inputs (ties broken by submit
//! time, pack-vote ties by seat position) and mutates only the working
//! set, so re-running it after a crash with the same committed actions
//! and ability state reproduces the same outcome.

use std::collections::{HashMap, HashSet};

use crate::protocol::ServerMessage;

use super::death::{passive_immune, DeathPipeline, DeathRecord};
use super::roles::{AbilityKind, GameRole};
use super::room::{ActionType, DeathCause, GameAction, GameWorld, PlayerId};
use super::Outbound;

/// One seer reading, persisted into the action's `result` by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Investigation {
    pub seer_id: PlayerId,
    pub target_id: PlayerId,
    pub role: GameRole,
    /// Talkative Seer readings are additionally broadcast at dawn.
    pub talkative: bool,
}

/// Summary of a resolved night.
#[derive(Debug, Clone, Default)]
pub struct NightResolution {
    pub deaths: Vec<DeathRecord>,
    pub saved: Vec<(PlayerId, DeathCause)>,
    pub converted: Vec<PlayerId>,
    pub lovers: Option<(PlayerId, PlayerId)>,
    pub investigations: Vec<Investigation>,
}

#[derive(Debug, Clone, Copy)]
struct PendingDeath {
    target: PlayerId,
    cause: DeathCause,
}

/// Resolve the night's committed actions. Ability decrements happen on
/// the working set and are committed atomically with the deaths by the
/// caller.
pub fn resolve(
    world: &mut GameWorld,
    actions: &[GameAction],
    pipeline: &DeathPipeline,
    out: &mut Vec<Outbound>,
) -> NightResolution {
    let mut ordered: Vec<&GameAction> = actions.iter().collect();
    ordered.sort_by_key(|a| a.created_at);

    let mut resolution = NightResolution::default();
    let mut protected: HashSet<PlayerId> = HashSet::new();
    let mut pending: Vec<PendingDeath> = Vec::new();

    apply_guards(world, &ordered, &mut protected);
    resolution.lovers = apply_cupid(world, &ordered, out);
    apply_heir_choices(world, &ordered);
    apply_werewolf_vote(world, &ordered, &mut pending);
    apply_white_wolf(world, &ordered, &mut pending);
    resolution.converted = apply_black_wolf(world, &ordered, &mut pending, out);
    apply_witch(world, &ordered, &mut protected, &mut pending);
    resolution.investigations = apply_seers(world, &ordered, out);

    // Commit phase: anything neither protected nor passively immune dies.
    for death in pending {
        if protected.contains(&death.target) || passive_immune(world, death.target, death.cause) {
            resolution.saved.push((death.target, death.cause));
            out.push(Outbound::room(ServerMessage::PlayerSaved {
                player_id: death.target,
            }));
            continue;
        }
        resolution
            .deaths
            .extend(pipeline.kill(world, death.target, death.cause, out));
    }

    resolution
}

fn alive_performer_role(world: &GameWorld, action: &GameAction) -> Option<GameRole> {
    let performer = world.player(action.performer_id)?;
    if !performer.is_alive() {
        return None;
    }
    performer.role
}

fn alive_target(world: &GameWorld, action: &GameAction) -> Option<PlayerId> {
    let target = action.target_id?;
    world.player(target).filter(|p| p.is_alive()).map(|p| p.id)
}

fn apply_guards(world: &mut GameWorld, ordered: &[&GameAction], protected: &mut HashSet<PlayerId>) {
    let mut guarded: Vec<(PlayerId, PlayerId)> = Vec::new();
    for action in ordered {
        if action.kind != ActionType::GuardProtect {
            continue;
        }
        if alive_performer_role(world, action) != Some(GameRole::Guard) {
            continue;
        }
        let Some(target) = alive_target(world, action) else {
            continue;
        };
        // Self-protection and repeat targets are rejected at submit time;
        // re-checked here so a replay cannot smuggle one through.
        if target == action.performer_id {
            continue;
        }
        protected.insert(target);
        guarded.push((action.performer_id, target));
    }
    for (guard_id, target) in guarded {
        let day = world.room.day_number;
        if let Some(ability) = world.ability_mut(guard_id, AbilityKind::GuardProtect) {
            ability.set_target_id(target);
            ability.last_used_day = Some(day);
        }
    }
}

fn apply_cupid(
    world: &mut GameWorld,
    ordered: &[&GameAction],
    out: &mut Vec<Outbound>,
) -> Option<(PlayerId, PlayerId)> {
    if world.room.day_number != 1 {
        return None;
    }
    let mut lovers = None;
    for action in ordered {
        if action.kind != ActionType::CupidLink {
            continue;
        }
        if alive_performer_role(world, action) != Some(GameRole::Cupid) {
            continue;
        }
        let Some(ability) = world.ability(action.performer_id, AbilityKind::CupidLink) else {
            continue;
        };
        if ability.uses_left == 0 {
            continue;
        }
        let pair = action.metadata.as_ref().and_then(|m| {
            let first: PlayerId = m.get("player1_id")?.as_str()?.parse().ok()?;
            let second: PlayerId = m.get("player2_id")?.as_str()?.parse().ok()?;
            Some((first, second))
        });
        let Some((first, second)) = pair else {
            continue;
        };
        if first == second
            || !world.player(first).is_some_and(|p| p.is_alive())
            || !world.player(second).is_some_and(|p| p.is_alive())
        {
            continue;
        }

        if let Some(p) = world.player_mut(first) {
            p.linked_to = Some(second);
        }
        if let Some(p) = world.player_mut(second) {
            p.linked_to = Some(first);
        }
        let day = world.room.day_number;
        if let Some(ability) = world.ability_mut(action.performer_id, AbilityKind::CupidLink) {
            ability.uses_left -= 1;
            ability.last_used_day = Some(day);
        }
        out.push(Outbound::player(
            first,
            ServerMessage::BecameLover { partner_id: second },
        ));
        out.push(Outbound::player(
            second,
            ServerMessage::BecameLover { partner_id: first },
        ));
        lovers = Some((first, second));
    }
    lovers
}

fn apply_heir_choices(world: &mut GameWorld, ordered: &[&GameAction]) {
    if world.room.day_number != 1 {
        return;
    }
    for action in ordered {
        if action.kind != ActionType::HeirChoose {
            continue;
        }
        if alive_performer_role(world, action) != Some(GameRole::Heir) {
            continue;
        }
        let Some(target) = alive_target(world, action) else {
            continue;
        };
        if target == action.performer_id {
            continue;
        }
        let day = world.room.day_number;
        if let Some(ability) = world.ability_mut(action.performer_id, AbilityKind::HeirTarget) {
            if ability.uses_left > 0 {
                ability.uses_left -= 1;
                ability.last_used_day = Some(day);
                ability.set_target_id(target);
            }
        }
    }
}

/// Tally the pack's ballots; most votes wins, ties go to the lowest seat.
fn apply_werewolf_vote(world: &GameWorld, ordered: &[&GameAction], pending: &mut Vec<PendingDeath>) {
    let mut ballots: HashMap<PlayerId, u32> = HashMap::new();
    for action in ordered {
        if action.kind != ActionType::WerewolfVote {
            continue;
        }
        let Some(role) = alive_performer_role(world, action) else {
            continue;
        };
        if !role.joins_wolf_vote() {
            continue;
        }
        let Some(target) = alive_target(world, action) else {
            continue;
        };
        *ballots.entry(target).or_insert(0) += 1;
    }

    let choice = ballots.into_iter().max_by_key(|(target, votes)| {
        let position = world.player(*target).map_or(0, |p| p.position);
        // Highest votes first; on equal votes prefer the lowest position.
        (*votes, std::cmp::Reverse(position))
    });

    if let Some((target, _)) = choice {
        pending.push(PendingDeath {
            target,
            cause: DeathCause::WerewolfAttack,
        });
    }
}

fn apply_white_wolf(
    world: &mut GameWorld,
    ordered: &[&GameAction],
    pending: &mut Vec<PendingDeath>,
) {
    for action in ordered {
        if action.kind != ActionType::WhiteWolfDevour {
            continue;
        }
        if alive_performer_role(world, action) != Some(GameRole::WhiteWolf) {
            continue;
        }
        let Some(target) = alive_target(world, action) else {
            continue;
        };
        let day = world.room.day_number;
        let Some(ability) = world.ability_mut(action.performer_id, AbilityKind::WhiteWolfDevour)
        else {
            continue;
        };
        if !ability.ready(day) {
            continue;
        }
        ability.uses_left -= 1;
        ability.last_used_day = Some(day);
        pending.push(PendingDeath {
            target,
            cause: DeathCause::WhiteWolfDevour,
        });
    }
}

/// The Black Wolf rescues the pack's victim by turning them. Only fires
/// when the conversion target matches the pending pack kill; otherwise
/// the potion stays corked and no use is spent.
fn apply_black_wolf(
    world: &mut GameWorld,
    ordered: &[&GameAction],
    pending: &mut Vec<PendingDeath>,
    out: &mut Vec<Outbound>,
) -> Vec<PlayerId> {
    let mut converted = Vec::new();
    for action in ordered {
        if action.kind != ActionType::BlackWolfConvert {
            continue;
        }
        if alive_performer_role(world, action) != Some(GameRole::BlackWolf) {
            continue;
        }
        let Some(target) = alive_target(world, action) else {
            continue;
        };
        let matches_attack = pending
            .iter()
            .any(|d| d.cause == DeathCause::WerewolfAttack && d.target == target);
        if !matches_attack {
            continue;
        }
        let day = world.room.day_number;
        let Some(ability) = world.ability_mut(action.performer_id, AbilityKind::BlackWolfConvert)
        else {
            continue;
        };
        if ability.uses_left == 0 {
            continue;
        }
        ability.uses_left -= 1;
        ability.last_used_day = Some(day);

        pending.retain(|d| !(d.cause == DeathCause::WerewolfAttack && d.target == target));
        world.reassign_role(target, GameRole::Werewolf);
        out.push(Outbound::player(
            target,
            ServerMessage::RoleChanged {
                role: GameRole::Werewolf,
            },
        ));
        converted.push(target);
    }
    converted
}

fn apply_witch(
    world: &mut GameWorld,
    ordered: &[&GameAction],
    protected: &mut HashSet<PlayerId>,
    pending: &mut Vec<PendingDeath>,
) {
    for action in ordered {
        let Some(role) = alive_performer_role(world, action) else {
            continue;
        };
        if role != GameRole::Witch {
            continue;
        }
        match action.kind {
            ActionType::WitchHeal => {
                let Some(target) = action.target_id else {
                    continue;
                };
                let matches_attack = pending
                    .iter()
                    .any(|d| d.cause == DeathCause::WerewolfAttack && d.target == target);
                if !matches_attack {
                    continue;
                }
                let day = world.room.day_number;
                if let Some(ability) = world.ability_mut(action.performer_id, AbilityKind::WitchHeal)
                {
                    if ability.uses_left > 0 {
                        ability.uses_left -= 1;
                        ability.last_used_day = Some(day);
                        protected.insert(target);
                    }
                }
            }
            ActionType::WitchPoison => {
                let Some(target) = alive_target(world, action) else {
                    continue;
                };
                let day = world.room.day_number;
                if let Some(ability) =
                    world.ability_mut(action.performer_id, AbilityKind::WitchPoison)
                {
                    if ability.uses_left > 0 {
                        ability.uses_left -= 1;
                        ability.last_used_day = Some(day);
                        pending.push(PendingDeath {
                            target,
                            cause: DeathCause::WitchPoison,
                        });
                    }
                }
            }
            _ => {}
        }
    }
}

fn apply_seers(
    world: &GameWorld,
    ordered: &[&GameAction],
    out: &mut Vec<Outbound>,
) -> Vec<Investigation> {
    let mut investigations = Vec::new();
    for action in ordered {
        if action.kind != ActionType::SeerInvestigate {
            continue;
        }
        let Some(performer_role) = alive_performer_role(world, action) else {
            continue;
        };
        let talkative = match performer_role {
            GameRole::Seer => false,
            GameRole::TalkativeSeer => true,
            _ => continue,
        };
        let Some(target) = action.target_id else {
            continue;
        };
        let Some(role) = world.player(target).and_then(|p| p.role) else {
            continue;
        };
        out.push(Outbound::player(
            action.performer_id,
            ServerMessage::InvestigationResult {
                target_id: target,
                role,
            },
        ));
        investigations.push(Investigation {
            seer_id: action.performer_id,
            target_id: target,
            role,
            talkative,
        });
    }
    investigations
}

#[cfg(test)]
mod tests {
    use super::super::room::tests::{test_player, test_room};
    use super::super::room::{GamePhase, PlayerState};
    use super::*;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn pipeline() -> DeathPipeline {
        DeathPipeline::new(Utc::now(), 30)
    }

    struct Fixture {
        world: GameWorld,
        actions: Vec<GameAction>,
        sequence: i64,
    }

    impl Fixture {
        fn new(roles: &[GameRole]) -> Self {
            let room_id = Uuid::new_v4();
            let mut world = GameWorld {
                room: test_room(room_id),
                players: roles
                    .iter()
                    .enumerate()
                    .map(|(i, role)| test_player(Uuid::new_v4(), room_id, (i + 1) as u8, *role))
                    .collect(),
                abilities: Vec::new(),
            };
            let ids: Vec<PlayerId> = world.players.iter().map(|p| p.id).collect();
            for (id, role) in ids.into_iter().zip(roles) {
                world.reassign_role(id, *role);
            }
            Self {
                world,
                actions: Vec::new(),
                sequence: 0,
            }
        }

        fn player(&self, index: usize) -> PlayerId {
            self.world.players[index].id
        }

        fn submit(&mut self, performer: PlayerId, kind: ActionType, target: Option<PlayerId>) {
            self.submit_with(performer, kind, target, None);
        }

        fn submit_with(
            &mut self,
            performer: PlayerId,
            kind: ActionType,
            target: Option<PlayerId>,
            metadata: Option<serde_json::Value>,
        ) {
            self.sequence += 1;
            self.actions.push(GameAction {
                room_id: self.world.room.id,
                performer_id: performer,
                kind,
                day_number: self.world.room.day_number,
                phase: GamePhase::NightPhase,
                target_id: target,
                metadata,
                result: None,
                created_at: Utc::now() + Duration::milliseconds(self.sequence),
            });
        }

        fn resolve(&mut self) -> (NightResolution, Vec<Outbound>) {
            let mut out = Vec::new();
            let resolution = resolve(&mut self.world, &self.actions, &pipeline(), &mut out);
            (resolution, out)
        }
    }

    #[test]
    fn unprotected_pack_target_dies() {
        let mut fx = Fixture::new(&[
            GameRole::Werewolf,
            GameRole::Seer,
            GameRole::Villager,
            GameRole::Villager,
            GameRole::Villager,
        ]);
        let victim = fx.player(2);
        fx.submit(fx.player(0), ActionType::WerewolfVote, Some(victim));

        let (resolution, _) = fx.resolve();

        assert_eq!(resolution.deaths.len(), 1);
        assert_eq!(resolution.deaths[0].player_id, victim);
        assert_eq!(resolution.deaths[0].cause, DeathCause::WerewolfAttack);
    }

    #[test]
    fn guard_cancels_the_pack_kill() {
        let mut fx = Fixture::new(&[
            GameRole::Werewolf,
            GameRole::Guard,
            GameRole::Villager,
            GameRole::Villager,
        ]);
        let victim = fx.player(2);
        fx.submit(fx.player(0), ActionType::WerewolfVote, Some(victim));
        fx.submit(fx.player(1), ActionType::GuardProtect, Some(victim));

        let (resolution, out) = fx.resolve();

        assert!(resolution.deaths.is_empty());
        assert_eq!(resolution.saved, vec![(victim, DeathCause::WerewolfAttack)]);
        assert!(out
            .iter()
            .any(|o| matches!(o.message, ServerMessage::PlayerSaved { player_id } if player_id == victim)));
    }

    #[test]
    fn pack_vote_tie_goes_to_the_lowest_seat() {
        let mut fx = Fixture::new(&[
            GameRole::Werewolf,
            GameRole::Werewolf,
            GameRole::Villager,
            GameRole::Villager,
        ]);
        let (low_seat, high_seat) = (fx.player(2), fx.player(3));
        fx.submit(fx.player(0), ActionType::WerewolfVote, Some(high_seat));
        fx.submit(fx.player(1), ActionType::WerewolfVote, Some(low_seat));

        let (resolution, _) = fx.resolve();

        assert_eq!(resolution.deaths.len(), 1);
        assert_eq!(resolution.deaths[0].player_id, low_seat);
    }

    #[test]
    fn witch_heal_saves_the_pack_victim_and_spends_the_potion() {
        let mut fx = Fixture::new(&[GameRole::Werewolf, GameRole::Witch, GameRole::Villager]);
        let (witch, victim) = (fx.player(1), fx.player(2));
        fx.submit(fx.player(0), ActionType::WerewolfVote, Some(victim));
        fx.submit(witch, ActionType::WitchHeal, Some(victim));

        let (resolution, _) = fx.resolve();

        assert!(resolution.deaths.is_empty());
        assert_eq!(
            fx.world
                .ability(witch, AbilityKind::WitchHeal)
                .unwrap()
                .uses_left,
            0
        );
    }

    #[test]
    fn mismatched_heal_has_no_effect_and_keeps_the_potion() {
        let mut fx = Fixture::new(&[
            GameRole::Werewolf,
            GameRole::Witch,
            GameRole::Villager,
            GameRole::Villager,
        ]);
        let (witch, victim, other) = (fx.player(1), fx.player(2), fx.player(3));
        fx.submit(fx.player(0), ActionType::WerewolfVote, Some(victim));
        fx.submit(witch, ActionType::WitchHeal, Some(other));

        let (resolution, _) = fx.resolve();

        assert_eq!(resolution.deaths.len(), 1);
        assert_eq!(resolution.deaths[0].player_id, victim);
        assert_eq!(
            fx.world
                .ability(witch, AbilityKind::WitchHeal)
                .unwrap()
                .uses_left,
            1
        );
    }

    #[test]
    fn witch_poison_kills_independently() {
        let mut fx = Fixture::new(&[GameRole::Werewolf, GameRole::Witch, GameRole::Villager]);
        let (witch, poisoned) = (fx.player(1), fx.player(0));
        fx.submit(witch, ActionType::WitchPoison, Some(poisoned));

        let (resolution, _) = fx.resolve();

        assert_eq!(resolution.deaths.len(), 1);
        assert_eq!(resolution.deaths[0].cause, DeathCause::WitchPoison);
    }

    #[test]
    fn black_wolf_converts_the_pack_victim_instead_of_killing() {
        let mut fx = Fixture::new(&[
            GameRole::Werewolf,
            GameRole::BlackWolf,
            GameRole::Villager,
            GameRole::Villager,
        ]);
        let (black_wolf, victim) = (fx.player(1), fx.player(2));
        fx.submit(fx.player(0), ActionType::WerewolfVote, Some(victim));
        fx.submit(black_wolf, ActionType::BlackWolfConvert, Some(victim));

        let (resolution, out) = fx.resolve();

        assert!(resolution.deaths.is_empty());
        assert_eq!(resolution.converted, vec![victim]);
        assert_eq!(
            fx.world.player(victim).unwrap().role,
            Some(GameRole::Werewolf)
        );
        assert!(fx.world.player(victim).unwrap().is_alive());
        assert!(out
            .iter()
            .any(|o| matches!(o.message, ServerMessage::RoleChanged { .. })));
        assert_eq!(
            fx.world
                .ability(black_wolf, AbilityKind::BlackWolfConvert)
                .unwrap()
                .uses_left,
            0
        );
    }

    #[test]
    fn convert_without_matching_attack_is_free() {
        let mut fx = Fixture::new(&[
            GameRole::Werewolf,
            GameRole::BlackWolf,
            GameRole::Villager,
            GameRole::Villager,
        ]);
        let (black_wolf, victim, other) = (fx.player(1), fx.player(2), fx.player(3));
        fx.submit(fx.player(0), ActionType::WerewolfVote, Some(victim));
        fx.submit(black_wolf, ActionType::BlackWolfConvert, Some(other));

        let (resolution, _) = fx.resolve();

        assert_eq!(resolution.deaths.len(), 1);
        assert!(resolution.converted.is_empty());
        assert_eq!(
            fx.world
                .ability(black_wolf, AbilityKind::BlackWolfConvert)
                .unwrap()
                .uses_left,
            1
        );
    }

    #[test]
    fn white_wolf_devour_respects_the_cooldown() {
        let mut fx = Fixture::new(&[GameRole::WhiteWolf, GameRole::Werewolf, GameRole::Villager]);
        let (white, wolf) = (fx.player(0), fx.player(1));
        fx.world.room.day_number = 3;
        fx.world
            .ability_mut(white, AbilityKind::WhiteWolfDevour)
            .unwrap()
            .last_used_day = Some(2);
        fx.submit(white, ActionType::WhiteWolfDevour, Some(wolf));

        let (resolution, _) = fx.resolve();
        assert!(resolution.deaths.is_empty(), "cooldown not yet elapsed");

        fx.world.room.day_number = 4;
        for action in &mut fx.actions {
            action.day_number = 4;
        }
        let mut out = Vec::new();
        let resolution = resolve(&mut fx.world, &fx.actions, &pipeline(), &mut out);
        assert_eq!(resolution.deaths.len(), 1);
        assert_eq!(resolution.deaths[0].cause, DeathCause::WhiteWolfDevour);
    }

    #[test]
    fn cupid_links_are_symmetric_and_single_use() {
        let mut fx = Fixture::new(&[
            GameRole::Cupid,
            GameRole::Villager,
            GameRole::Villager,
            GameRole::Werewolf,
        ]);
        let (cupid, a, b) = (fx.player(0), fx.player(1), fx.player(2));
        fx.submit_with(
            cupid,
            ActionType::CupidLink,
            None,
            Some(serde_json::json!({
                "player1_id": a.to_string(),
                "player2_id": b.to_string(),
            })),
        );

        let (resolution, out) = fx.resolve();

        assert_eq!(resolution.lovers, Some((a, b)));
        assert_eq!(fx.world.player(a).unwrap().linked_to, Some(b));
        assert_eq!(fx.world.player(b).unwrap().linked_to, Some(a));
        assert_eq!(
            fx.world
                .ability(cupid, AbilityKind::CupidLink)
                .unwrap()
                .uses_left,
            0
        );
        let lover_notices = out
            .iter()
            .filter(|o| matches!(o.message, ServerMessage::BecameLover { .. }))
            .count();
        assert_eq!(lover_notices, 2);
    }

    #[test]
    fn seer_reading_stays_private_while_talkative_is_flagged() {
        let mut fx = Fixture::new(&[
            GameRole::Seer,
            GameRole::TalkativeSeer,
            GameRole::Werewolf,
            GameRole::Villager,
        ]);
        let (seer, talkative, wolf) = (fx.player(0), fx.player(1), fx.player(2));
        fx.submit(seer, ActionType::SeerInvestigate, Some(wolf));
        fx.submit(talkative, ActionType::SeerInvestigate, Some(wolf));

        let (resolution, out) = fx.resolve();

        assert_eq!(resolution.investigations.len(), 2);
        assert!(!resolution.investigations[0].talkative);
        assert!(resolution.investigations[1].talkative);
        assert!(resolution
            .investigations
            .iter()
            .all(|i| i.role == GameRole::Werewolf));
        // Both readings go out privately; the dawn broadcast happens later.
        let private = out
            .iter()
            .filter(|o| matches!(o.message, ServerMessage::InvestigationResult { .. }))
            .count();
        assert_eq!(private, 2);
    }

    #[test]
    fn rerunning_the_resolver_is_idempotent_over_the_same_inputs() {
        let mut fx = Fixture::new(&[
            GameRole::Werewolf,
            GameRole::Witch,
            GameRole::Guard,
            GameRole::Villager,
            GameRole::Villager,
        ]);
        let victim = fx.player(3);
        fx.submit(fx.player(0), ActionType::WerewolfVote, Some(victim));
        fx.submit(fx.player(1), ActionType::WitchPoison, Some(fx.player(4)));
        fx.submit(fx.player(2), ActionType::GuardProtect, Some(victim));

        let mut replay = fx.world.clone();
        let (first, _) = fx.resolve();

        let mut out = Vec::new();
        let second = resolve(&mut replay, &fx.actions, &pipeline(), &mut out);

        assert_eq!(first.deaths, second.deaths);
        assert_eq!(first.saved, second.saved);
        for (a, b) in fx.world.abilities.iter().zip(&replay.abilities) {
            assert_eq!(a.uses_left, b.uses_left);
        }
    }

    #[test]
    fn dead_performer_submissions_are_ignored() {
        let mut fx = Fixture::new(&[GameRole::Werewolf, GameRole::Witch, GameRole::Villager]);
        let (wolf, victim) = (fx.player(0), fx.player(2));
        fx.submit(wolf, ActionType::WerewolfVote, Some(victim));
        fx.world.player_mut(wolf).unwrap().state = PlayerState::Dead;

        let (resolution, _) = fx.resolve();
        assert!(resolution.deaths.is_empty());
    }
}
