//! Concurrency behavior: racing joins against room capacity, parallel
//! room creation with unique codes, and cross-room independence.

use std::sync::Arc;

use uuid::Uuid;
use werewolf_server::bus::MemoryPubSub;
use werewolf_server::config::Config;
use werewolf_server::protocol::RoomSettings;
use werewolf_server::server::GameServer;
use werewolf_server::store::MemoryStore;

fn test_server() -> Arc<GameServer> {
    GameServer::new(
        &Config::default(),
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryPubSub::new()),
    )
}

fn settings(name: &str, max_players: u8) -> RoomSettings {
    RoomSettings {
        name: name.to_string(),
        min_players: 5,
        max_players,
        is_private: false,
        password: None,
        night_duration_secs: 90,
        day_duration_secs: 180,
        vote_duration_secs: 60,
    }
}

#[tokio::test]
async fn racing_joins_never_overfill_a_room() {
    let server = test_server();
    let host = Uuid::new_v4();
    let snapshot = server
        .create_room(host, settings("crowded", 6))
        .await
        .unwrap();

    let attempts = 20usize;
    let handles: Vec<_> = (0..attempts)
        .map(|_| {
            let server = server.clone();
            let room_id = snapshot.id;
            tokio::spawn(
                async move { server.join_room(Uuid::new_v4(), Some(room_id), None, None).await },
            )
        })
        .collect();

    let mut joined = 1; // the host
    for handle in futures::future::join_all(handles).await {
        if handle.unwrap().is_ok() {
            joined += 1;
        }
    }
    assert_eq!(joined, 6, "exactly max_players seats were filled");

    let view = server.snapshot_for(host).await.unwrap();
    assert_eq!(view.players.len(), 6);
    // Positions are unique and within bounds.
    let mut positions: Vec<u8> = view.players.iter().map(|p| p.position).collect();
    positions.sort_unstable();
    positions.dedup();
    assert_eq!(positions.len(), 6);
    assert!(positions.iter().all(|p| (1..=6).contains(p)));
}

#[tokio::test]
async fn parallel_room_creation_yields_unique_codes() {
    let server = test_server();
    let handles: Vec<_> = (0..16)
        .map(|i| {
            let server = server.clone();
            tokio::spawn(async move {
                server
                    .create_room(Uuid::new_v4(), settings(&format!("room-{i}"), 8))
                    .await
            })
        })
        .collect();

    let mut codes = Vec::new();
    for handle in futures::future::join_all(handles).await {
        codes.push(handle.unwrap().unwrap().code);
    }
    codes.sort();
    let total = codes.len();
    codes.dedup();
    assert_eq!(codes.len(), total, "all room codes are distinct");
    assert_eq!(server.active_room_count(), 16);
}

#[tokio::test]
async fn rooms_progress_independently() {
    let server = test_server();

    let mut hosts = Vec::new();
    for i in 0..4 {
        let host = Uuid::new_v4();
        let snapshot = server
            .create_room(host, settings(&format!("table-{i}"), 8))
            .await
            .unwrap();
        for _ in 0..4 {
            server
                .join_room(Uuid::new_v4(), Some(snapshot.id), None, None)
                .await
                .unwrap();
        }
        hosts.push(host);
    }

    // Start all four games concurrently; each room's critical section is
    // independent, so none of these serialize against each other.
    let handles: Vec<_> = hosts
        .iter()
        .map(|host| {
            let server = server.clone();
            let host = *host;
            tokio::spawn(async move { server.start_game(host).await })
        })
        .collect();
    for handle in futures::future::join_all(handles).await {
        handle.unwrap().unwrap();
    }

    for host in hosts {
        let view = server.snapshot_for(host).await.unwrap();
        assert!(view.my_role.is_some());
    }
}
