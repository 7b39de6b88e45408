//! Death pipeline: the single entry point for all player deaths, running
//! cascade triggers (Hunter revenge, lovers' grief, inheritance, lapsed
//! immunities) to a fixpoint.

use chrono::{DateTime, Duration, Utc};

use crate::protocol::ServerMessage;

use super::roles::{AbilityKind, GameRole};
use super::room::{DeathCause, GameWorld, PendingRevenge, PlayerId, PlayerState};
use super::Outbound;

/// One committed death, recorded in the audit log by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeathRecord {
    pub player_id: PlayerId,
    pub role: GameRole,
    pub cause: DeathCause,
}

/// Conditional rules that keep a player alive while their condition-role
/// still breathes. Checked before any kill is handed to the pipeline.
pub fn passive_immune(world: &GameWorld, player_id: PlayerId, cause: DeathCause) -> bool {
    let Some(player) = world.player(player_id) else {
        return false;
    };
    match (player.role, cause) {
        (Some(GameRole::RedRidingHood), DeathCause::WerewolfAttack) => {
            world.alive_with_role(GameRole::Hunter).next().is_some()
        }
        (Some(GameRole::BlueRidingHood), DeathCause::WerewolfAttack) => {
            world.alive_with_role(GameRole::Villager).next().is_some()
        }
        (Some(GameRole::WolfRidingHood), DeathCause::VotedOut) => {
            world.alive_with_role(GameRole::BlackWolf).next().is_some()
        }
        _ => false,
    }
}

/// Executes kills and their cascade. Bounded: each player dies at most
/// once, so the worklist drains in at most `players.len()` rounds.
pub struct DeathPipeline {
    now: DateTime<Utc>,
    hunter_grace_secs: u64,
}

impl DeathPipeline {
    pub fn new(now: DateTime<Utc>, hunter_grace_secs: u64) -> Self {
        Self {
            now,
            hunter_grace_secs,
        }
    }

    /// Kill `player_id` with `cause` and run every trigger to fixpoint.
    /// A kill of a non-Alive player is a no-op, which is what terminates
    /// lover cycles.
    pub fn kill(
        &self,
        world: &mut GameWorld,
        player_id: PlayerId,
        cause: DeathCause,
        out: &mut Vec<Outbound>,
    ) -> Vec<DeathRecord> {
        let mut committed = Vec::new();
        let mut worklist = vec![(player_id, cause)];

        while let Some((victim_id, cause)) = worklist.pop() {
            let Some(victim) = world.player_mut(victim_id) else {
                continue;
            };
            if victim.state != PlayerState::Alive {
                continue;
            }
            let Some(role) = victim.role else {
                continue;
            };

            victim.state = PlayerState::Dead;
            victim.died_at = Some(self.now);
            victim.is_revealed = true;
            let linked_to = victim.linked_to;

            tracing::info!(
                player_id = %victim_id,
                ?role,
                ?cause,
                "Player died"
            );
            out.push(Outbound::room(ServerMessage::PlayerDied {
                player_id: victim_id,
                role,
                cause,
                day_number: world.room.day_number,
            }));
            committed.push(DeathRecord {
                player_id: victim_id,
                role,
                cause,
            });

            self.run_triggers(world, victim_id, role, linked_to, &mut worklist, out);
        }

        committed
    }

    fn run_triggers(
        &self,
        world: &mut GameWorld,
        victim_id: PlayerId,
        role: GameRole,
        linked_to: Option<PlayerId>,
        worklist: &mut Vec<(PlayerId, DeathCause)>,
        out: &mut Vec<Outbound>,
    ) {
        // Hunter: open the revenge window; the shot arrives as a separate
        // HunterShoot submission and is executed by the action service.
        if role == GameRole::Hunter {
            let expires_at = self.now + Duration::seconds(self.hunter_grace_secs as i64);
            world.room.pending_revenge = Some(PendingRevenge {
                hunter_id: victim_id,
                expires_at,
            });
            out.push(Outbound::player(
                victim_id,
                ServerMessage::HunterTriggered { expires_at },
            ));
        }

        // Lovers die of grief, in both link directions.
        if let Some(partner_id) = linked_to {
            if world.player(partner_id).is_some_and(|p| p.is_alive()) {
                worklist.push((partner_id, DeathCause::Grief));
            }
        }
        let grieving: Vec<PlayerId> = world
            .alive_players()
            .filter(|p| p.linked_to == Some(victim_id))
            .map(|p| p.id)
            .collect();
        for partner_id in grieving {
            worklist.push((partner_id, DeathCause::Grief));
        }

        // Heir inherits the testator's role with fresh abilities.
        let heirs: Vec<PlayerId> = world
            .alive_with_role(GameRole::Heir)
            .filter(|heir| {
                world
                    .ability(heir.id, AbilityKind::HeirTarget)
                    .and_then(|a| a.target_id())
                    == Some(victim_id)
            })
            .map(|p| p.id)
            .collect();
        for heir_id in heirs {
            world.reassign_role(heir_id, role);
            out.push(Outbound::player(
                heir_id,
                ServerMessage::RoleInherited {
                    role,
                    from_player_id: victim_id,
                },
            ));
        }

        // Plunderer takes over the very first deceased's role.
        if !world.room.first_death_recorded {
            world.room.first_death_recorded = true;
            let plunderers: Vec<PlayerId> = world
                .alive_with_role(GameRole::Plunderer)
                .map(|p| p.id)
                .collect();
            for plunderer_id in plunderers {
                world.reassign_role(plunderer_id, role);
                out.push(Outbound::player(
                    plunderer_id,
                    ServerMessage::RoleStolen {
                        role,
                        from_player_id: victim_id,
                    },
                ));
            }
        }

        self.notify_lapsed_immunities(world, role, out);
    }

    /// A passive immunity whose condition-role just died no longer holds;
    /// tell the previously protected players.
    fn notify_lapsed_immunities(
        &self,
        world: &GameWorld,
        deceased_role: GameRole,
        out: &mut Vec<Outbound>,
    ) {
        let lapsed: Vec<(PlayerId, &str)> = match deceased_role {
            GameRole::BlackWolf => world
                .alive_with_role(GameRole::WolfRidingHood)
                .map(|p| (p.id, "the Black Wolf is dead"))
                .collect(),
            GameRole::Hunter if world.alive_with_role(GameRole::Hunter).next().is_none() => world
                .alive_with_role(GameRole::RedRidingHood)
                .map(|p| (p.id, "the Hunter is dead"))
                .collect(),
            GameRole::Villager if world.alive_with_role(GameRole::Villager).next().is_none() => {
                world
                    .alive_with_role(GameRole::BlueRidingHood)
                    .map(|p| (p.id, "the last villager is dead"))
                    .collect()
            }
            _ => Vec::new(),
        };

        for (player_id, reason) in lapsed {
            out.push(Outbound::player(
                player_id,
                ServerMessage::ProtectionLost {
                    reason: reason.to_string(),
                },
            ));
        }
    }
}
