//! Game engine core: data model, night resolution, voting, death cascade
//! and win evaluation. Everything in this module is synchronous and
//! side-effect free. Components compute over a [`room::GameWorld`] working
//! set and emit [`Outbound`] messages; the server layer owns persistence
//! and fan-out.

pub mod death;
pub mod night;
pub mod roles;
pub mod room;
pub mod vote;
pub mod win;

use crate::protocol::ServerMessage;

use roles::{AbilityKind, GameRole};
use room::{Ability, GameWorld, PlayerId};

/// Fixed length of the role-assignment phase (seconds).
pub const ROLE_ASSIGNMENT_SECS: u64 = 5;

/// Who a message produced by the engine is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Every connected socket that joined the room.
    Room,
    /// Only sockets authenticated as this player.
    Player(PlayerId),
}

/// One message produced while mutating a world, published after commit.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub audience: Audience,
    pub message: ServerMessage,
}

impl Outbound {
    pub fn room(message: ServerMessage) -> Self {
        Self {
            audience: Audience::Room,
            message,
        }
    }

    pub fn player(player_id: PlayerId, message: ServerMessage) -> Self {
        Self {
            audience: Audience::Player(player_id),
            message,
        }
    }
}

/// Shuffle the role pool for the current player count and deal by seat
/// position. Also initializes role abilities and picks the Mercenary's
/// target when one is in play.
///
/// Returns the private `role_assigned` messages to deliver.
pub fn assign_roles(world: &mut GameWorld, rng: &mut fastrand::Rng) -> Vec<Outbound> {
    let mut pool = roles::role_pool(world.players.len());
    rng.shuffle(&mut pool);

    let mut seats: Vec<PlayerId> = world.players.iter().map(|p| p.id).collect();
    seats.sort_by_key(|id| world.player(*id).map_or(u8::MAX, |p| p.position));

    let mut outbound = Vec::with_capacity(seats.len());
    for (player_id, role) in seats.iter().copied().zip(pool) {
        world.reassign_role(player_id, role);
        outbound.push(Outbound::player(
            player_id,
            ServerMessage::RoleAssigned { role },
        ));
    }

    assign_mercenary_target(world, rng);
    outbound
}

/// Pick a uniformly-random non-Mercenary player as the Mercenary's mark.
/// With no eligible candidate the Mercenary simply has no target and is
/// converted to Villager at the end of day 1 like any other.
fn assign_mercenary_target(world: &mut GameWorld, rng: &mut fastrand::Rng) {
    let mercenaries: Vec<PlayerId> = world
        .players
        .iter()
        .filter(|p| p.role == Some(GameRole::Mercenary))
        .map(|p| p.id)
        .collect();

    for mercenary_id in mercenaries {
        let candidates: Vec<PlayerId> = world
            .players
            .iter()
            .filter(|p| p.role != Some(GameRole::Mercenary))
            .map(|p| p.id)
            .collect();
        if candidates.is_empty() {
            continue;
        }
        let target = candidates[rng.usize(0..candidates.len())];
        let mut ability = Ability {
            player_id: mercenary_id,
            kind: AbilityKind::MercenaryTarget,
            uses_left: 0,
            max_uses: 0,
            cooldown_days: 0,
            last_used_day: None,
            metadata: serde_json::Value::Null,
        };
        ability.set_target_id(target);
        world.abilities.push(ability);
    }
}

#[cfg(test)]
mod tests {
    use super::room::tests::{test_player, test_room};
    use super::*;
    use uuid::Uuid;

    fn world_of(n: usize) -> GameWorld {
        let room_id = Uuid::new_v4();
        GameWorld {
            room: test_room(room_id),
            players: (1..=n)
                .map(|i| test_player(Uuid::new_v4(), room_id, i as u8, GameRole::Villager))
                .collect(),
            abilities: Vec::new(),
        }
    }

    #[test]
    fn assign_roles_covers_every_player() {
        let mut world = world_of(8);
        let mut rng = fastrand::Rng::with_seed(7);
        let outbound = assign_roles(&mut world, &mut rng);
        assert_eq!(outbound.len(), 8);
        assert!(world.players.iter().all(|p| p.role.is_some()));
    }

    #[test]
    fn assignment_is_deterministic_for_a_seed() {
        let mut a = world_of(10);
        let mut b = a.clone();
        assign_roles(&mut a, &mut fastrand::Rng::with_seed(42));
        assign_roles(&mut b, &mut fastrand::Rng::with_seed(42));
        for (pa, pb) in a.players.iter().zip(&b.players) {
            assert_eq!(pa.role, pb.role);
        }
    }

    #[test]
    fn mercenary_target_is_never_a_mercenary() {
        let room_id = Uuid::new_v4();
        let mut world = GameWorld {
            room: test_room(room_id),
            players: (1..=15)
                .map(|i| test_player(Uuid::new_v4(), room_id, i, GameRole::Villager))
                .collect(),
            abilities: Vec::new(),
        };
        // 15-player pool includes the Mercenary.
        let mut rng = fastrand::Rng::with_seed(3);
        assign_roles(&mut world, &mut rng);

        let mercenary = world
            .players
            .iter()
            .find(|p| p.role == Some(GameRole::Mercenary))
            .expect("15-player distribution includes a mercenary");
        let ability = world
            .ability(mercenary.id, AbilityKind::MercenaryTarget)
            .expect("mercenary target assigned");
        let target = ability.target_id().expect("target recorded");
        assert_ne!(
            world.player(target).unwrap().role,
            Some(GameRole::Mercenary)
        );
    }
}
