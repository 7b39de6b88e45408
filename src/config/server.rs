//! Server behavior configuration types.

use serde::{Deserialize, Serialize};

use super::defaults::{
    default_abandoned_room_timeout_secs, default_disconnect_grace_secs,
    default_maintenance_interval_secs, default_store_retry_attempts, default_timer_tick_millis,
};

/// Server configuration for room and player lifecycle management.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Grace period before a disconnected player loses their lobby seat
    /// (seconds). Players in running games keep their seat and are only
    /// marked disconnected.
    #[serde(default = "default_disconnect_grace_secs")]
    pub disconnect_grace_secs: u64,
    /// Time after which a WAITING room with no activity is cancelled (seconds)
    #[serde(default = "default_abandoned_room_timeout_secs")]
    pub abandoned_room_timeout_secs: u64,
    /// Interval for the maintenance sweep task (seconds)
    #[serde(default = "default_maintenance_interval_secs")]
    pub maintenance_interval_secs: u64,
    /// Wake interval for the phase-timer dispatcher (milliseconds)
    #[serde(default = "default_timer_tick_millis")]
    pub timer_tick_millis: u64,
    /// Retry attempts for store operations inside a room transaction
    #[serde(default = "default_store_retry_attempts")]
    pub store_retry_attempts: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            disconnect_grace_secs: default_disconnect_grace_secs(),
            abandoned_room_timeout_secs: default_abandoned_room_timeout_secs(),
            maintenance_interval_secs: default_maintenance_interval_secs(),
            timer_tick_millis: default_timer_tick_millis(),
            store_retry_attempts: default_store_retry_attempts(),
        }
    }
}
