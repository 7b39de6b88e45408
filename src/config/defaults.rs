//! Default value functions for configuration fields, used by serde's
//! `#[serde(default = ...)]` attributes.

use super::logging::LogFormat;

// =============================================================================
// Port & Root Config
// =============================================================================

pub const fn default_port() -> u16 {
    3560
}

pub fn default_database_url() -> String {
    "memory://".to_string()
}

pub fn default_bus_url() -> String {
    "memory://".to_string()
}

pub fn default_cors_origins() -> String {
    "*".to_string()
}

// =============================================================================
// Server Defaults
// =============================================================================

/// Grace period before a disconnected player loses their lobby seat.
pub const fn default_disconnect_grace_secs() -> u64 {
    60
}

/// Rooms stuck in WAITING longer than this are cancelled.
pub const fn default_abandoned_room_timeout_secs() -> u64 {
    3600
}

pub const fn default_maintenance_interval_secs() -> u64 {
    30
}

/// The timer dispatcher wakes at least this often.
pub const fn default_timer_tick_millis() -> u64 {
    1000
}

pub const fn default_store_retry_attempts() -> u32 {
    5
}

// =============================================================================
// Game Defaults
// =============================================================================

pub const fn default_min_players_floor() -> u8 {
    5
}

pub const fn default_max_players_ceiling() -> u8 {
    15
}

pub const fn default_night_duration_range() -> (u64, u64) {
    (30, 180)
}

pub const fn default_day_duration_range() -> (u64, u64) {
    (60, 300)
}

pub const fn default_vote_duration_range() -> (u64, u64) {
    (30, 120)
}

/// Chance the Little Girl is caught spying on any given night.
pub const fn default_little_girl_catch_chance() -> f64 {
    0.1
}

/// How long a dead Hunter may still take the revenge shot.
pub const fn default_hunter_grace_secs() -> u64 {
    30
}

// =============================================================================
// Logging Defaults
// =============================================================================

pub fn default_log_dir() -> String {
    "logs".to_string()
}

pub fn default_log_filename() -> String {
    "werewolf-server.log".to_string()
}

pub fn default_rotation() -> String {
    "daily".to_string()
}

pub const fn default_enable_file_logging() -> bool {
    false
}

pub const fn default_log_format() -> LogFormat {
    LogFormat::Text
}
