//! Input validation for room settings and join requests.

use crate::config::GameConfig;

use super::types::{RoomSettings, MAX_ROOM_NAME_LENGTH, MIN_ROOM_NAME_LENGTH, ROOM_CODE_LENGTH};

pub fn validate_room_name(name: &str) -> Result<(), String> {
    let trimmed = name.trim();
    if trimmed.len() < MIN_ROOM_NAME_LENGTH {
        return Err("Room name cannot be empty".to_string());
    }
    if name.len() > MAX_ROOM_NAME_LENGTH {
        return Err(format!(
            "Room name too long (max {MAX_ROOM_NAME_LENGTH} characters)"
        ));
    }
    Ok(())
}

pub fn validate_room_code(code: &str) -> Result<(), String> {
    if code.len() != ROOM_CODE_LENGTH {
        return Err(format!(
            "Room code must be exactly {ROOM_CODE_LENGTH} characters"
        ));
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return Err("Room code must be A-Z and 0-9".to_string());
    }
    Ok(())
}

pub fn validate_player_name(name: &str) -> Result<(), String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Player name cannot be blank".to_string());
    }
    if name.len() > 32 {
        return Err("Player name too long (max 32 characters)".to_string());
    }
    Ok(())
}

/// Validate room settings against the configured ranges.
pub fn validate_room_settings(settings: &RoomSettings, config: &GameConfig) -> Result<(), String> {
    validate_room_name(&settings.name)?;

    let (min, max) = (settings.min_players, settings.max_players);
    if min < config.min_players_floor || max > config.max_players_ceiling || min > max {
        return Err(format!(
            "Player limits must satisfy {} <= min <= max <= {}",
            config.min_players_floor, config.max_players_ceiling
        ));
    }

    check_range(
        "night duration",
        settings.night_duration_secs,
        config.night_duration_range,
    )?;
    check_range(
        "day duration",
        settings.day_duration_secs,
        config.day_duration_range,
    )?;
    check_range(
        "vote duration",
        settings.vote_duration_secs,
        config.vote_duration_range,
    )?;
    Ok(())
}

fn check_range(label: &str, value: u64, (lo, hi): (u64, u64)) -> Result<(), String> {
    if value < lo || value > hi {
        return Err(format!("{label} must be within [{lo}..{hi}] seconds"));
    }
    Ok(())
}
