#![cfg_attr(not(test), deny(clippy::panic))]

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use werewolf_server::bus::MemoryPubSub;
use werewolf_server::config;
use werewolf_server::logging;
use werewolf_server::server::GameServer;
use werewolf_server::store::MemoryStore;
use werewolf_server::websocket;

/// Werewolf server -- authoritative realtime engine for social deduction games
#[derive(Parser, Debug)]
#[command(name = "werewolf-server")]
#[command(about = "Authoritative realtime server for Werewolf/Mafia games")]
#[command(version)]
struct Cli {
    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines and pre-deployment checks.
    #[arg(long, short = 'c', conflicts_with = "print_config")]
    validate_config: bool,

    /// Print the loaded configuration to stdout (as JSON) and exit.
    #[arg(long, conflicts_with = "validate_config")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration from config.json if present; otherwise defaults.
    let cfg = Arc::new(config::load());

    if cli.print_config {
        let json = serde_json::to_string_pretty(&*cfg)
            .map_err(|e| anyhow::anyhow!("Failed to serialize config: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    let validation_result = config::validate(&cfg);
    if cli.validate_config {
        match validation_result {
            Ok(()) => {
                println!("Configuration validation passed");
                println!();
                println!("Configuration summary:");
                println!("  Port: {}", cfg.port);
                println!("  Storage backend: {}", cfg.database_url);
                println!("  Bus backend: {}", cfg.bus_url);
                println!("  Player limits: {}..{}", cfg.game.min_players_floor, cfg.game.max_players_ceiling);
                println!("  Hunter grace: {}s", cfg.game.hunter_grace_secs);
                return Ok(());
            }
            Err(e) => {
                eprintln!("Configuration validation failed:\n{e}");
                std::process::exit(1);
            }
        }
    }
    validation_result.map_err(|e| anyhow::anyhow!("invalid configuration:\n{e}"))?;

    logging::init_with_config(&cfg.logging);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!(%addr, "Starting werewolf server");

    // memory:// is the only compiled-in backend for both facades.
    let store = Arc::new(MemoryStore::new());
    let pubsub = Arc::new(MemoryPubSub::new());

    let game_server = GameServer::new(&cfg, store, pubsub);
    game_server.recover().await?;
    game_server.spawn_background_tasks();

    let router = websocket::create_router(&cfg.cors_origins).with_state(game_server.clone());
    let make_service = router.into_make_service_with_connect_info::<SocketAddr>();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        cors_origins = %cfg.cors_origins,
        "Server started - WebSocket protocol: /ws, health: /health"
    );

    let shutdown_server = game_server.clone();
    axum::serve(listener, make_service)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            shutdown_server.shutdown().await;
        })
        .await?;

    Ok(())
}
