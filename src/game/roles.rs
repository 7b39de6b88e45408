//! Role catalogue, team membership and ability initialization.

use serde::{Deserialize, Serialize};

/// Winning sides checked by the win evaluator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    Villagers,
    Werewolves,
    Solo,
}

/// Closed set of roles a player can hold.
///
/// New roles extend this enum, the ability table in [`initial_abilities`]
/// and the matching branch of the night resolver; roles are data, not types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GameRole {
    Villager,
    Werewolf,
    Seer,
    TalkativeSeer,
    Witch,
    Hunter,
    Guard,
    Cupid,
    LittleGirl,
    WhiteWolf,
    BlackWolf,
    WolfRidingHood,
    RedRidingHood,
    BlueRidingHood,
    Heir,
    Plunderer,
    Mercenary,
    Dictator,
}

impl GameRole {
    /// Team the role counts for in win evaluation.
    ///
    /// The Mercenary is hostile solo only until its day-1 resolution; the
    /// conversion to Villager is handled by the vote finalizer, so by the
    /// time later win checks run the role itself has changed.
    pub fn team(self) -> Team {
        match self {
            Self::Werewolf | Self::BlackWolf | Self::WolfRidingHood => Team::Werewolves,
            Self::WhiteWolf | Self::Mercenary => Team::Solo,
            _ => Team::Villagers,
        }
    }

    /// Whether the role takes part in the werewolf night vote.
    pub fn joins_wolf_vote(self) -> bool {
        matches!(
            self,
            Self::Werewolf | Self::BlackWolf | Self::WhiteWolf | Self::WolfRidingHood
        )
    }

    /// Whether the role contributes a submission during a night phase.
    ///
    /// Cupid and the Heir only act on the first night; both are prompted
    /// with a dedicated first-night message instead of the generic one.
    pub fn has_night_action(self, day_number: u32) -> bool {
        match self {
            Self::Werewolf | Self::BlackWolf | Self::WhiteWolf | Self::WolfRidingHood => true,
            Self::Seer | Self::TalkativeSeer | Self::Witch | Self::Guard => true,
            Self::Cupid | Self::Heir => day_number == 1,
            _ => false,
        }
    }

    /// Roles whose identity is revealed to everyone on death.
    pub fn reveal_on_death(self) -> bool {
        true
    }
}

/// Per-player consumable granted by a role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AbilityKind {
    GuardProtect,
    WitchHeal,
    WitchPoison,
    WhiteWolfDevour,
    BlackWolfConvert,
    CupidLink,
    HeirTarget,
    MercenaryTarget,
    MayorVote,
}

/// Blueprint for one ability row created when a role is (re)assigned.
#[derive(Debug, Clone, Copy)]
pub struct AbilitySpec {
    pub kind: AbilityKind,
    pub max_uses: u8,
    pub cooldown_days: u8,
}

/// Abilities a freshly assigned role starts with.
///
/// Re-initialization from scratch is what the Heir and the Plunderer rely
/// on when they inherit a role: the previous holder's spent uses do not
/// carry over.
pub fn initial_abilities(role: GameRole) -> &'static [AbilitySpec] {
    match role {
        GameRole::Guard => &[AbilitySpec {
            kind: AbilityKind::GuardProtect,
            max_uses: u8::MAX,
            cooldown_days: 0,
        }],
        GameRole::Witch => &[
            AbilitySpec {
                kind: AbilityKind::WitchHeal,
                max_uses: 1,
                cooldown_days: 0,
            },
            AbilitySpec {
                kind: AbilityKind::WitchPoison,
                max_uses: 1,
                cooldown_days: 0,
            },
        ],
        GameRole::WhiteWolf => &[AbilitySpec {
            kind: AbilityKind::WhiteWolfDevour,
            max_uses: u8::MAX,
            cooldown_days: 2,
        }],
        GameRole::BlackWolf => &[AbilitySpec {
            kind: AbilityKind::BlackWolfConvert,
            max_uses: 1,
            cooldown_days: 0,
        }],
        GameRole::Cupid => &[AbilitySpec {
            kind: AbilityKind::CupidLink,
            max_uses: 1,
            cooldown_days: 0,
        }],
        GameRole::Heir => &[AbilitySpec {
            kind: AbilityKind::HeirTarget,
            max_uses: 1,
            cooldown_days: 0,
        }],
        _ => &[],
    }
}

/// Role pool for a given player count.
///
/// Curated distributions for common sizes; any other count falls back to
/// the formulaic build below. The pool is shuffled (Fisher-Yates) before
/// assignment, so ordering here carries no meaning.
pub fn role_pool(player_count: usize) -> Vec<GameRole> {
    use GameRole::*;

    let listed: Option<&[GameRole]> = match player_count {
        5 => Some(&[Werewolf, Seer, Villager, Villager, Villager]),
        6 => Some(&[Werewolf, Seer, Hunter, Villager, Villager, Villager]),
        8 => Some(&[
            Werewolf, Werewolf, Seer, Witch, Hunter, Cupid, Villager, Villager,
        ]),
        10 => Some(&[
            Werewolf, Werewolf, BlackWolf, Seer, Witch, Hunter, Guard, LittleGirl, Villager,
            Villager,
        ]),
        12 => Some(&[
            Werewolf, Werewolf, BlackWolf, WhiteWolf, Seer, Witch, Hunter, Guard, Cupid, Heir,
            Villager, Villager,
        ]),
        15 => Some(&[
            Werewolf,
            Werewolf,
            Werewolf,
            BlackWolf,
            WhiteWolf,
            TalkativeSeer,
            Witch,
            Hunter,
            Guard,
            Cupid,
            LittleGirl,
            Heir,
            Plunderer,
            Mercenary,
            Dictator,
        ]),
        _ => None,
    };

    if let Some(roles) = listed {
        return roles.to_vec();
    }

    // Fallback for unlisted counts.
    let mut pool = Vec::with_capacity(player_count);
    let werewolves = std::cmp::max(1, player_count / 4);
    pool.extend(std::iter::repeat(Werewolf).take(werewolves));
    if player_count >= 5 {
        pool.push(Seer);
    }
    if player_count >= 7 {
        pool.push(Witch);
    }
    if player_count >= 9 {
        pool.push(Hunter);
    }
    if player_count >= 11 {
        pool.push(Guard);
    }
    if player_count >= 13 {
        pool.push(Cupid);
    }
    while pool.len() < player_count {
        pool.push(Villager);
    }
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_size_matches_player_count() {
        for n in 5..=15 {
            assert_eq!(role_pool(n).len(), n, "pool size mismatch for {n} players");
        }
    }

    #[test]
    fn every_pool_has_a_werewolf_and_a_seer() {
        for n in 5..=15 {
            let pool = role_pool(n);
            assert!(
                pool.iter().any(|r| r.team() == Team::Werewolves),
                "no werewolf-team role for {n} players"
            );
            assert!(
                pool.iter()
                    .any(|r| matches!(r, GameRole::Seer | GameRole::TalkativeSeer)),
                "no seer variant for {n} players"
            );
        }
    }

    #[test]
    fn fallback_werewolf_count_is_quarter_of_players() {
        let pool = role_pool(13);
        let wolves = pool.iter().filter(|r| **r == GameRole::Werewolf).count();
        assert_eq!(wolves, 3);
    }

    #[test]
    fn witch_starts_with_one_heal_and_one_poison() {
        let specs = initial_abilities(GameRole::Witch);
        assert_eq!(specs.len(), 2);
        assert!(specs
            .iter()
            .all(|s| s.max_uses == 1 && s.cooldown_days == 0));
    }

    #[test]
    fn white_wolf_devour_has_two_day_cooldown() {
        let specs = initial_abilities(GameRole::WhiteWolf);
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].cooldown_days, 2);
    }

    #[test]
    fn cupid_and_heir_only_act_on_the_first_night() {
        assert!(GameRole::Cupid.has_night_action(1));
        assert!(!GameRole::Cupid.has_night_action(2));
        assert!(GameRole::Heir.has_night_action(1));
        assert!(!GameRole::Heir.has_night_action(3));
    }
}
