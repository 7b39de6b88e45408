//! Configuration module.
//!
//! Supports a JSON configuration file with sensible compiled-in defaults:
//!
//! - [`types`]: root `Config` struct
//! - [`server`]: lifecycle timeouts and sweep intervals
//! - [`game`]: game-rule ranges and knobs
//! - [`logging`]: logging configuration
//! - [`loader`]: configuration loading
//! - [`validation`]: startup validation
//! - [`defaults`]: default value functions

pub mod defaults;
pub mod game;
pub mod loader;
pub mod logging;
pub mod server;
pub mod types;
pub mod validation;

pub use game::GameConfig;
pub use loader::load;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use server::ServerConfig;
pub use types::Config;
pub use validation::validate;
