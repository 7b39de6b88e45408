//! Game-rule configuration: allowed room settings ranges and the knobs
//! the rules expose.

use serde::{Deserialize, Serialize};

use super::defaults::{
    default_day_duration_range, default_hunter_grace_secs, default_little_girl_catch_chance,
    default_max_players_ceiling, default_min_players_floor, default_night_duration_range,
    default_vote_duration_range,
};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GameConfig {
    /// Lowest `min_players` a room may configure
    #[serde(default = "default_min_players_floor")]
    pub min_players_floor: u8,
    /// Highest `max_players` a room may configure
    #[serde(default = "default_max_players_ceiling")]
    pub max_players_ceiling: u8,
    /// Allowed night duration (seconds, inclusive)
    #[serde(default = "default_night_duration_range")]
    pub night_duration_range: (u64, u64),
    /// Allowed day-discussion duration (seconds, inclusive)
    #[serde(default = "default_day_duration_range")]
    pub day_duration_range: (u64, u64),
    /// Allowed voting duration (seconds, inclusive)
    #[serde(default = "default_vote_duration_range")]
    pub vote_duration_range: (u64, u64),
    /// Chance the Little Girl is caught spying on any given night
    #[serde(default = "default_little_girl_catch_chance")]
    pub little_girl_catch_chance: f64,
    /// How long a dead Hunter may still take the revenge shot (seconds)
    #[serde(default = "default_hunter_grace_secs")]
    pub hunter_grace_secs: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            min_players_floor: default_min_players_floor(),
            max_players_ceiling: default_max_players_ceiling(),
            night_duration_range: default_night_duration_range(),
            day_duration_range: default_day_duration_range(),
            vote_duration_range: default_vote_duration_range(),
            little_girl_catch_chance: default_little_girl_catch_chance(),
            hunter_grace_secs: default_hunter_grace_secs(),
        }
    }
}
