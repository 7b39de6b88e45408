//! WebSocket gateway: axum routes and the per-connection socket loop.

mod handler;
mod routes;

pub use routes::create_router;
