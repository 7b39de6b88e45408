#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::too_many_arguments,
    clippy::too_many_lines
)]

//! # Werewolf Server
//!
//! Authoritative real-time engine for Werewolf/Mafia games: many rooms
//! progress concurrently through a timed phase cycle, night actions are
//! resolved deterministically, and events fan out to connected sockets.

/// Event fan-out: pub/sub facade and topics
pub mod bus;

/// Server configuration
pub mod config;

/// Typed engine errors
pub mod error;

/// Game engine core: rules, resolution, deaths, wins
pub mod game;

/// Structured logging configuration
pub mod logging;

/// WebSocket message protocol definitions
pub mod protocol;

/// Retry logic utilities
pub mod retry;

/// Orchestration: registry, services, connections
pub mod server;

/// Persistence facade and in-memory backend
pub mod store;

/// Durable phase-expiry timers
pub mod timer;

/// WebSocket connection handling
pub mod websocket;
