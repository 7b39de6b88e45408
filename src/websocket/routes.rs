use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::Json;

use crate::server::GameServer;

use super::handler::websocket_handler;

/// Create the axum router with WebSocket support.
pub fn create_router(cors_origins: &str) -> axum::Router<Arc<GameServer>> {
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    let cors = if cors_origins == "*" {
        CorsLayer::permissive()
    } else {
        let origins: Vec<_> = cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
            .collect();

        if origins.is_empty() {
            tracing::warn!("No valid CORS origins configured, using permissive CORS");
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    };

    axum::Router::new()
        .route("/ws", get(websocket_handler))
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Health check endpoint with a couple of liveness counters.
async fn health_check(State(server): State<Arc<GameServer>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": if server.is_shutting_down() { "draining" } else { "ok" },
        "active_rooms": server.active_room_count(),
        "connections": server.connection_count(),
    }))
}
