//! Root configuration types.

use serde::{Deserialize, Serialize};

use super::defaults::{
    default_bus_url, default_cors_origins, default_database_url, default_port,
};
use super::game::GameConfig;
use super::logging::LoggingConfig;
use super::server::ServerConfig;

/// Root configuration struct for the werewolf server.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Persistence backend URL; `memory://` selects the in-process store.
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// Pub/sub backend URL; `memory://` selects the in-process bus.
    #[serde(default = "default_bus_url")]
    pub bus_url: String,
    /// Comma-separated allowed CORS origins, or `*`.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
    /// Signing key consumed by the authentication gateway in front of
    /// this server; carried here so one config file serves both.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt_secret: Option<String>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            database_url: default_database_url(),
            bus_url: default_bus_url(),
            cors_origins: default_cors_origins(),
            jwt_secret: None,
            server: ServerConfig::default(),
            game: GameConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
