//! Win-condition evaluation over the alive-players set.

use super::roles::{GameRole, Team};
use super::room::GameWorld;

/// Outcome of a win check; evaluated after every state-changing event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Ongoing,
    /// Nobody left alive; the room ends with no winner.
    Draw,
    Won(Team),
}

/// First matching rule wins; rule order is part of the contract.
pub fn evaluate(world: &GameWorld) -> Verdict {
    let alive: Vec<_> = world.alive_players().collect();

    if alive.is_empty() {
        return Verdict::Draw;
    }

    // Two lovers standing alone count as a villager victory regardless of
    // their printed teams.
    if alive.len() == 2 {
        let (a, b) = (alive[0], alive[1]);
        if a.linked_to == Some(b.id) && b.linked_to == Some(a.id) {
            return Verdict::Won(Team::Villagers);
        }
    }

    if alive.len() == 1 && alive[0].role == Some(GameRole::WhiteWolf) {
        return Verdict::Won(Team::Solo);
    }

    let werewolves = alive
        .iter()
        .filter(|p| p.role.map(GameRole::team) == Some(Team::Werewolves))
        .count();
    let solos = alive
        .iter()
        .filter(|p| p.role.map(GameRole::team) == Some(Team::Solo))
        .count();
    let villagers = alive.len() - werewolves - solos;

    if werewolves >= villagers && werewolves > 0 && solos == 0 {
        return Verdict::Won(Team::Werewolves);
    }

    let hostile_solo = alive
        .iter()
        .any(|p| p.role == Some(GameRole::WhiteWolf));
    if werewolves == 0 && !hostile_solo {
        return Verdict::Won(Team::Villagers);
    }

    Verdict::Ongoing
}
