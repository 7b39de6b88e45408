//! Hard configuration validation, run at startup and by `--validate-config`.

use super::Config;

/// Validate the loaded configuration. Returns a multi-line error listing
/// every violated constraint rather than just the first.
pub fn validate(config: &Config) -> Result<(), String> {
    let mut problems = Vec::new();

    if config.port == 0 {
        problems.push("port must be non-zero".to_string());
    }

    let game = &config.game;
    if game.min_players_floor < 5 {
        problems.push("game.min_players_floor must be at least 5".to_string());
    }
    if game.max_players_ceiling > 15 {
        problems.push("game.max_players_ceiling must be at most 15".to_string());
    }
    if game.min_players_floor > game.max_players_ceiling {
        problems.push("game player floor exceeds ceiling".to_string());
    }
    for (label, (lo, hi)) in [
        ("night_duration_range", game.night_duration_range),
        ("day_duration_range", game.day_duration_range),
        ("vote_duration_range", game.vote_duration_range),
    ] {
        if lo == 0 || lo > hi {
            problems.push(format!("game.{label} is not a valid range"));
        }
    }
    if !(0.0..=1.0).contains(&game.little_girl_catch_chance) {
        problems.push("game.little_girl_catch_chance must be within [0, 1]".to_string());
    }
    if game.hunter_grace_secs == 0 {
        problems.push("game.hunter_grace_secs must be non-zero".to_string());
    }

    if config.server.timer_tick_millis == 0 {
        problems.push("server.timer_tick_millis must be non-zero".to_string());
    }
    if config.server.store_retry_attempts == 0 {
        problems.push("server.store_retry_attempts must be non-zero".to_string());
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn all_violations_are_reported_together() {
        let mut config = Config::default();
        config.port = 0;
        config.game.little_girl_catch_chance = 2.0;
        config.server.timer_tick_millis = 0;

        let err = validate(&config).unwrap_err();
        assert!(err.contains("port"));
        assert!(err.contains("little_girl_catch_chance"));
        assert!(err.contains("timer_tick_millis"));
    }
}
