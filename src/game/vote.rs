//! Day-vote aggregation: tallying, mayor double-vote, tie policy and the
//! hand-off of the eliminated candidate to the death pipeline.

use std::collections::HashMap;

use crate::protocol::{ServerMessage, VoteCount};

use super::death::{passive_immune, DeathPipeline, DeathRecord};
use super::roles::{AbilityKind, GameRole};
use super::room::{ActionType, DeathCause, GameAction, GameWorld, PlayerId};
use super::Outbound;

/// Result of finalizing a voting phase.
#[derive(Debug, Clone)]
pub struct VoteOutcome {
    pub tally: Vec<VoteCount>,
    /// Candidate selected for elimination, before immunity filtering.
    pub candidate: Option<PlayerId>,
    pub tie: bool,
    /// Candidate survived through a passive immunity.
    pub protected: bool,
    pub deaths: Vec<DeathRecord>,
    /// Mercenary whose day-1 mark was eliminated; the game ends Solo.
    pub mercenary_victor: Option<PlayerId>,
}

/// Raw per-target counts from the committed DAY_VOTE actions of this
/// `(room, day)`, most-voted first. Used for live `vote:update` pushes.
pub fn current_tally(world: &GameWorld, actions: &[GameAction]) -> Vec<VoteCount> {
    let mut counts: HashMap<PlayerId, u32> = HashMap::new();
    for action in actions {
        if action.kind != ActionType::DayVote {
            continue;
        }
        if !world
            .player(action.performer_id)
            .is_some_and(|p| p.is_alive())
        {
            continue;
        }
        if let Some(target) = action.target_id {
            *counts.entry(target).or_insert(0) += 1;
        }
    }
    sorted_tally(world, counts)
}

fn sorted_tally(world: &GameWorld, counts: HashMap<PlayerId, u32>) -> Vec<VoteCount> {
    let mut tally: Vec<VoteCount> = counts
        .into_iter()
        .map(|(target_id, votes)| VoteCount { target_id, votes })
        .collect();
    tally.sort_by_key(|c| {
        let position = world.player(c.target_id).map_or(u8::MAX, |p| p.position);
        (std::cmp::Reverse(c.votes), position)
    });
    tally
}

/// Phase-end hook for DAY_VOTING. Applies the mayor's double vote, picks
/// the candidate (tie policy: the mayor's pick is implemented as a random
/// fallback among the tied), runs immunity checks and feeds the loser to
/// the death pipeline. Also settles the Mercenary's day-1 contract.
pub fn finalize(
    world: &mut GameWorld,
    actions: &[GameAction],
    pipeline: &DeathPipeline,
    rng: &mut fastrand::Rng,
    out: &mut Vec<Outbound>,
) -> VoteOutcome {
    let mut counts: HashMap<PlayerId, u32> = HashMap::new();
    for action in actions {
        if action.kind != ActionType::DayVote {
            continue;
        }
        let Some(performer) = world.player(action.performer_id) else {
            continue;
        };
        if !performer.is_alive() {
            continue;
        }
        let Some(target) = action.target_id else {
            continue;
        };
        *counts.entry(target).or_insert(0) += 1;

        // Mayor's ballot counts twice.
        if world
            .ability(action.performer_id, AbilityKind::MayorVote)
            .is_some()
        {
            *counts.entry(target).or_insert(0) += 1;
        }
    }

    let top_votes = counts.values().copied().max().unwrap_or(0);
    let candidates: Vec<PlayerId> = counts
        .iter()
        .filter(|(_, votes)| **votes == top_votes && top_votes > 0)
        .map(|(target, _)| *target)
        .collect();

    let tie = candidates.len() > 1;
    let candidate = match candidates.len() {
        0 => None,
        1 => Some(candidates[0]),
        _ => {
            let mayor_alive = world
                .alive_players()
                .any(|p| world.ability(p.id, AbilityKind::MayorVote).is_some());
            if mayor_alive {
                Some(candidates[rng.usize(0..candidates.len())])
            } else {
                None
            }
        }
    };

    let tally = sorted_tally(world, counts);
    let mut protected = false;
    let mut deaths = Vec::new();

    if let Some(candidate_id) = candidate {
        if passive_immune(world, candidate_id, DeathCause::VotedOut) {
            protected = true;
            out.push(Outbound::room(ServerMessage::VoteProtection {
                player_id: candidate_id,
            }));
        } else {
            deaths = pipeline.kill(world, candidate_id, DeathCause::VotedOut, out);
        }
    }

    out.push(Outbound::room(ServerMessage::VoteResults {
        eliminated: if protected { None } else { candidate },
        tally: tally.clone(),
        tie,
    }));

    let mercenary_victor = settle_mercenary_contract(world, candidate, out);

    VoteOutcome {
        tally,
        candidate,
        tie,
        protected,
        deaths,
        mercenary_victor,
    }
}

/// Day-1 only: a Mercenary whose mark was just eliminated wins Solo.
/// Either way, every Mercenary still in play becomes a plain Villager
/// once the first vote settles.
fn settle_mercenary_contract(
    world: &mut GameWorld,
    candidate: Option<PlayerId>,
    out: &mut Vec<Outbound>,
) -> Option<PlayerId> {
    if world.room.day_number != 1 {
        return None;
    }

    let mercenaries: Vec<PlayerId> = world
        .players
        .iter()
        .filter(|p| p.role == Some(GameRole::Mercenary))
        .map(|p| p.id)
        .collect();

    let mut victor = None;
    for mercenary_id in mercenaries {
        let mark = world
            .ability(mercenary_id, AbilityKind::MercenaryTarget)
            .and_then(|a| a.target_id());
        let alive = world.player(mercenary_id).is_some_and(|p| p.is_alive());

        if alive && candidate.is_some() && mark == candidate {
            victor = Some(mercenary_id);
            out.push(Outbound::room(ServerMessage::MercenaryVictory {
                player_id: mercenary_id,
            }));
        }

        // Only the living convert; a Mercenary who died before the vote
        // settled keeps their revealed role.
        if alive {
            world.reassign_role(mercenary_id, GameRole::Villager);
        }
    }
    victor
}

#[cfg(test)]
mod tests {
    use super::super::room::tests::{test_player, test_room};
    use super::super::room::{Ability, GamePhase, PlayerState};
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn pipeline() -> DeathPipeline {
        DeathPipeline::new(Utc::now(), 30)
    }

    fn world_with(roles: &[GameRole]) -> GameWorld {
        let room_id = Uuid::new_v4();
        GameWorld {
            room: test_room(room_id),
            players: roles
                .iter()
                .enumerate()
                .map(|(i, role)| test_player(Uuid::new_v4(), room_id, (i + 1) as u8, *role))
                .collect(),
            abilities: Vec::new(),
        }
    }

    fn day_vote(world: &GameWorld, voter: PlayerId, target: Option<PlayerId>) -> GameAction {
        GameAction {
            room_id: world.room.id,
            performer_id: voter,
            kind: ActionType::DayVote,
            day_number: world.room.day_number,
            phase: GamePhase::DayVoting,
            target_id: target,
            metadata: None,
            result: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn majority_candidate_is_eliminated() {
        let mut world = world_with(&[
            GameRole::Werewolf,
            GameRole::Seer,
            GameRole::Villager,
            GameRole::Villager,
        ]);
        world.room.day_number = 2;
        let wolf = world.players[0].id;
        let actions: Vec<_> = world
            .players
            .iter()
            .skip(1)
            .map(|p| day_vote(&world, p.id, Some(wolf)))
            .collect();

        let mut out = Vec::new();
        let outcome = finalize(
            &mut world,
            &actions,
            &pipeline(),
            &mut fastrand::Rng::with_seed(1),
            &mut out,
        );

        assert_eq!(outcome.candidate, Some(wolf));
        assert!(!outcome.tie);
        assert_eq!(outcome.deaths.len(), 1);
        assert_eq!(world.player(wolf).unwrap().state, PlayerState::Dead);
    }

    #[test]
    fn no_votes_means_no_elimination() {
        let mut world = world_with(&[GameRole::Werewolf, GameRole::Villager, GameRole::Villager]);
        world.room.day_number = 2;
        let voters: Vec<_> = world.players.iter().map(|p| p.id).collect();
        let actions: Vec<_> = voters
            .iter()
            .map(|id| day_vote(&world, *id, None))
            .collect();

        let mut out = Vec::new();
        let outcome = finalize(
            &mut world,
            &actions,
            &pipeline(),
            &mut fastrand::Rng::with_seed(1),
            &mut out,
        );

        assert_eq!(outcome.candidate, None);
        assert!(outcome.deaths.is_empty());
    }

    #[test]
    fn tie_without_mayor_spares_everyone() {
        let mut world = world_with(&[
            GameRole::Werewolf,
            GameRole::Seer,
            GameRole::Villager,
            GameRole::Villager,
        ]);
        world.room.day_number = 2;
        let (a, b) = (world.players[0].id, world.players[1].id);
        let actions = vec![
            day_vote(&world, world.players[2].id, Some(a)),
            day_vote(&world, world.players[3].id, Some(b)),
        ];

        let mut out = Vec::new();
        let outcome = finalize(
            &mut world,
            &actions,
            &pipeline(),
            &mut fastrand::Rng::with_seed(1),
            &mut out,
        );

        assert!(outcome.tie);
        assert_eq!(outcome.candidate, None);
        assert!(outcome.deaths.is_empty());
    }

    #[test]
    fn mayor_breaks_ties_among_candidates() {
        let mut world = world_with(&[
            GameRole::Werewolf,
            GameRole::Seer,
            GameRole::Villager,
            GameRole::Villager,
        ]);
        world.room.day_number = 2;
        let (a, b, mayor) = (
            world.players[0].id,
            world.players[1].id,
            world.players[2].id,
        );
        world.abilities.push(Ability {
            player_id: mayor,
            kind: AbilityKind::MayorVote,
            uses_left: 0,
            max_uses: 0,
            cooldown_days: 0,
            last_used_day: None,
            metadata: serde_json::Value::Null,
        });
        // Mayor abstains so the double vote does not skew the tie itself.
        let actions = vec![
            day_vote(&world, a, Some(b)),
            day_vote(&world, b, Some(a)),
            day_vote(&world, mayor, None),
        ];

        let mut out = Vec::new();
        let outcome = finalize(
            &mut world,
            &actions,
            &pipeline(),
            &mut fastrand::Rng::with_seed(9),
            &mut out,
        );

        let chosen = outcome.candidate.expect("mayor picks among the tied");
        assert!(chosen == a || chosen == b);
        assert_eq!(outcome.deaths.len(), 1);
    }

    #[test]
    fn mayors_own_ballot_counts_twice() {
        let mut world = world_with(&[GameRole::Werewolf, GameRole::Seer, GameRole::Villager]);
        world.room.day_number = 2;
        let (wolf, seer, mayor) = (
            world.players[0].id,
            world.players[1].id,
            world.players[2].id,
        );
        world.abilities.push(Ability {
            player_id: mayor,
            kind: AbilityKind::MayorVote,
            uses_left: 0,
            max_uses: 0,
            cooldown_days: 0,
            last_used_day: None,
            metadata: serde_json::Value::Null,
        });
        // 2 (mayor) vs 1 (wolf's vote against the seer).
        let actions = vec![
            day_vote(&world, mayor, Some(wolf)),
            day_vote(&world, wolf, Some(seer)),
        ];

        let mut out = Vec::new();
        let outcome = finalize(
            &mut world,
            &actions,
            &pipeline(),
            &mut fastrand::Rng::with_seed(1),
            &mut out,
        );

        assert_eq!(outcome.candidate, Some(wolf));
    }

    #[test]
    fn wolf_riding_hood_survives_the_vote_while_black_wolf_lives() {
        let mut world = world_with(&[
            GameRole::WolfRidingHood,
            GameRole::BlackWolf,
            GameRole::Villager,
            GameRole::Villager,
        ]);
        world.room.day_number = 2;
        let hood = world.players[0].id;
        let actions: Vec<_> = world
            .players
            .iter()
            .skip(1)
            .map(|p| day_vote(&world, p.id, Some(hood)))
            .collect();

        let mut out = Vec::new();
        let outcome = finalize(
            &mut world,
            &actions,
            &pipeline(),
            &mut fastrand::Rng::with_seed(1),
            &mut out,
        );

        assert!(outcome.protected);
        assert!(outcome.deaths.is_empty());
        assert!(world.player(hood).unwrap().is_alive());
        assert!(out
            .iter()
            .any(|o| matches!(o.message, ServerMessage::VoteProtection { .. })));
    }

    #[test]
    fn mercenary_wins_when_its_mark_falls_on_day_one() {
        let mut world = world_with(&[
            GameRole::Mercenary,
            GameRole::Werewolf,
            GameRole::Villager,
            GameRole::Villager,
        ]);
        world.room.day_number = 1;
        let (mercenary, mark) = (world.players[0].id, world.players[1].id);
        let mut ability = Ability {
            player_id: mercenary,
            kind: AbilityKind::MercenaryTarget,
            uses_left: 0,
            max_uses: 0,
            cooldown_days: 0,
            last_used_day: None,
            metadata: serde_json::Value::Null,
        };
        ability.set_target_id(mark);
        world.abilities.push(ability);

        let actions: Vec<_> = world
            .players
            .iter()
            .filter(|p| p.id != mark)
            .map(|p| day_vote(&world, p.id, Some(mark)))
            .collect();

        let mut out = Vec::new();
        let outcome = finalize(
            &mut world,
            &actions,
            &pipeline(),
            &mut fastrand::Rng::with_seed(1),
            &mut out,
        );

        assert_eq!(outcome.mercenary_victor, Some(mercenary));
    }

    #[test]
    fn dead_mercenary_keeps_its_revealed_role() {
        let mut world = world_with(&[
            GameRole::Mercenary,
            GameRole::Werewolf,
            GameRole::Villager,
            GameRole::Villager,
            GameRole::Villager,
        ]);
        world.room.day_number = 1;
        let mercenary = world.players[0].id;
        world.players[0].state = PlayerState::Dead;

        let mut out = Vec::new();
        let outcome = finalize(
            &mut world,
            &[],
            &pipeline(),
            &mut fastrand::Rng::with_seed(1),
            &mut out,
        );

        assert_eq!(outcome.mercenary_victor, None);
        assert_eq!(
            world.player(mercenary).unwrap().role,
            Some(GameRole::Mercenary)
        );
    }

    #[test]
    fn mercenary_becomes_villager_after_day_one_either_way() {
        let mut world = world_with(&[
            GameRole::Mercenary,
            GameRole::Werewolf,
            GameRole::Villager,
            GameRole::Villager,
            GameRole::Villager,
        ]);
        world.room.day_number = 1;
        let mercenary = world.players[0].id;

        let mut out = Vec::new();
        let outcome = finalize(
            &mut world,
            &[],
            &pipeline(),
            &mut fastrand::Rng::with_seed(1),
            &mut out,
        );

        assert_eq!(outcome.mercenary_victor, None);
        assert_eq!(
            world.player(mercenary).unwrap().role,
            Some(GameRole::Villager)
        );
    }
}
