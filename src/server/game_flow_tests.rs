//! End-to-end engine flows driven through the service layer: seating,
//! forced role layouts, night resolution, votes, cascades and endings.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::bus::{MemoryPubSub, PubSub, Subscription};
use crate::config::Config;
use crate::game::roles::{GameRole, Team};
use crate::game::room::{
    ActionType, DeathCause, GamePhase, PlayerId, PlayerState, RoomId, RoomStatus, UserId,
};
use crate::protocol::{RoomSettings, ServerMessage};
use crate::store::{load_world, MemoryStore};
use crate::timer::TimerEntry;

use super::GameServer;

struct Harness {
    server: Arc<GameServer>,
    pubsub: Arc<MemoryPubSub>,
}

fn harness() -> Harness {
    harness_with(Config::default())
}

fn harness_with(config: Config) -> Harness {
    let pubsub = Arc::new(MemoryPubSub::new());
    let server = GameServer::new(&config, Arc::new(MemoryStore::new()), pubsub.clone());
    Harness { server, pubsub }
}

fn settings(max_players: u8) -> RoomSettings {
    RoomSettings {
        name: "scenario".to_string(),
        min_players: 5,
        max_players,
        is_private: false,
        password: None,
        night_duration_secs: 90,
        day_duration_secs: 180,
        vote_duration_secs: 60,
    }
}

impl Harness {
    /// Seat `roles.len()` users, hand out the given roles by position, and
    /// park the room in `phase` at `day`.
    async fn game_with_roles(
        &self,
        roles: &[GameRole],
        phase: GamePhase,
        day: u32,
    ) -> (RoomId, Vec<UserId>, Vec<PlayerId>) {
        let users: Vec<UserId> = (0..roles.len()).map(|_| Uuid::new_v4()).collect();
        let snapshot = self
            .server
            .create_room(users[0], settings(roles.len() as u8))
            .await
            .expect("room created");
        for user in &users[1..] {
            self.server
                .join_room(*user, Some(snapshot.id), None, None)
                .await
                .expect("player joined");
        }

        let ctx = self.server.ctx();
        let mut world = load_world(self.server.store.as_ref(), &ctx, snapshot.id)
            .await
            .unwrap()
            .unwrap();
        world.players.sort_by_key(|p| p.position);
        let player_ids: Vec<PlayerId> = world.players.iter().map(|p| p.id).collect();
        for (player_id, role) in player_ids.iter().zip(roles) {
            world.reassign_role(*player_id, *role);
        }
        world.room.phase = phase;
        world.room.status = phase.status();
        world.room.day_number = day;
        world.room.phase_started_at = Utc::now();
        world.room.phase_ends_at = Some(Utc::now() + chrono::Duration::seconds(90));
        crate::store::commit_world(self.server.store.as_ref(), &ctx, &world)
            .await
            .unwrap();

        (snapshot.id, users, player_ids)
    }

    /// End the room's current phase as the timer dispatcher would.
    async fn expire_phase(&self, room_id: RoomId) {
        let ctx = self.server.ctx();
        let room = self
            .server
            .store
            .find_room_by_id(&ctx, room_id)
            .await
            .unwrap()
            .unwrap();
        self.server
            .handle_phase_expiry(TimerEntry {
                room_id,
                phase: room.phase,
                deadline: Utc::now(),
            })
            .await
            .expect("transition succeeded");
    }

    async fn player_state(&self, room_id: RoomId, player_id: PlayerId) -> PlayerState {
        let ctx = self.server.ctx();
        let world = load_world(self.server.store.as_ref(), &ctx, room_id)
            .await
            .unwrap()
            .unwrap();
        world.player(player_id).unwrap().state
    }

    async fn room_status(&self, room_id: RoomId) -> (RoomStatus, Option<Team>) {
        let ctx = self.server.ctx();
        let room = self
            .server
            .store
            .find_room_by_id(&ctx, room_id)
            .await
            .unwrap()
            .unwrap();
        (room.status, room.winning_team)
    }

    async fn subscribe_room_events(&self) -> Subscription {
        self.pubsub.subscribe("room.*").await.unwrap()
    }
}

async fn drain(sub: &mut Subscription) -> Vec<ServerMessage> {
    let mut messages = Vec::new();
    while let Ok(Some((_topic, payload))) =
        tokio::time::timeout(Duration::from_millis(50), sub.recv()).await
    {
        if let Ok(message) = serde_json::from_slice::<ServerMessage>(&payload) {
            messages.push(message);
        }
    }
    messages
}

#[tokio::test]
async fn baseline_five_player_game_villagers_win() {
    let h = harness();
    let roles = [
        GameRole::Werewolf,
        GameRole::Seer,
        GameRole::Villager,
        GameRole::Villager,
        GameRole::Villager,
    ];
    let (room_id, users, players) = h.game_with_roles(&roles, GamePhase::NightPhase, 1).await;
    let mut events = h.subscribe_room_events().await;

    // Night 1: the werewolf votes the third villager.
    h.server
        .submit_night_action(users[0], ActionType::WerewolfVote, Some(players[2]), None)
        .await
        .unwrap();
    h.expire_phase(room_id).await;

    assert_eq!(h.player_state(room_id, players[2]).await, PlayerState::Dead);
    let messages = drain(&mut events).await;
    assert!(messages.iter().any(|m| matches!(
        m,
        ServerMessage::PlayerDied { player_id, cause: DeathCause::WerewolfAttack, .. }
        if *player_id == players[2]
    )));
    assert!(messages
        .iter()
        .any(|m| matches!(m, ServerMessage::PhaseChange { phase: GamePhase::DayDiscussion, .. })));

    // Day: move to voting, everyone piles on the werewolf.
    h.expire_phase(room_id).await;
    for user in [users[1], users[3], users[4]] {
        h.server.cast_vote(user, Some(players[0])).await.unwrap();
    }
    h.server.cast_vote(users[0], None).await.unwrap();
    h.expire_phase(room_id).await;

    let (status, winner) = h.room_status(room_id).await;
    assert_eq!(status, RoomStatus::Ended);
    assert_eq!(winner, Some(Team::Villagers));
    let messages = drain(&mut events).await;
    assert!(messages
        .iter()
        .any(|m| matches!(m, ServerMessage::GameEnded { winning_team: Some(Team::Villagers), .. })));
}

#[tokio::test]
async fn guard_cancels_the_werewolf_kill() {
    let h = harness();
    let roles = [
        GameRole::Werewolf,
        GameRole::Guard,
        GameRole::Seer,
        GameRole::Villager,
        GameRole::Villager,
    ];
    let (room_id, users, players) = h.game_with_roles(&roles, GamePhase::NightPhase, 1).await;
    let mut events = h.subscribe_room_events().await;

    h.server
        .submit_night_action(users[0], ActionType::WerewolfVote, Some(players[3]), None)
        .await
        .unwrap();
    h.server
        .submit_night_action(users[1], ActionType::GuardProtect, Some(players[3]), None)
        .await
        .unwrap();
    h.expire_phase(room_id).await;

    assert_eq!(h.player_state(room_id, players[3]).await, PlayerState::Alive);
    let messages = drain(&mut events).await;
    assert!(messages
        .iter()
        .any(|m| matches!(m, ServerMessage::PlayerSaved { player_id } if *player_id == players[3])));
    let (status, _) = h.room_status(room_id).await;
    assert_eq!(status, RoomStatus::Day);
}

#[tokio::test]
async fn cupid_lovers_die_together() {
    let h = harness();
    let roles = [
        GameRole::Werewolf,
        GameRole::Cupid,
        GameRole::Hunter,
        GameRole::Seer,
        GameRole::Villager,
        GameRole::Villager,
        GameRole::Villager,
        GameRole::Villager,
    ];
    let (room_id, users, players) = h.game_with_roles(&roles, GamePhase::NightPhase, 1).await;

    // Night 1: Cupid links two villagers; nobody dies.
    let metadata = serde_json::json!({
        "player1_id": players[4].to_string(),
        "player2_id": players[5].to_string(),
    });
    h.server
        .submit_night_action(users[1], ActionType::CupidLink, None, Some(metadata))
        .await
        .unwrap();
    h.expire_phase(room_id).await; // -> day discussion
    h.expire_phase(room_id).await; // -> voting
    h.expire_phase(room_id).await; // -> night 2

    // Night 2: the pack takes the first lover.
    h.server
        .submit_night_action(users[0], ActionType::WerewolfVote, Some(players[4]), None)
        .await
        .unwrap();
    h.expire_phase(room_id).await;

    assert_eq!(h.player_state(room_id, players[4]).await, PlayerState::Dead);
    assert_eq!(h.player_state(room_id, players[5]).await, PlayerState::Dead);
}

#[tokio::test]
async fn hunter_lynch_triggers_revenge_shot() {
    let h = harness();
    let roles = [
        GameRole::Werewolf,
        GameRole::Hunter,
        GameRole::Seer,
        GameRole::Villager,
        GameRole::Villager,
    ];
    let (room_id, users, players) = h.game_with_roles(&roles, GamePhase::DayVoting, 2).await;
    let mut events = h.subscribe_room_events().await;

    for user in [users[0], users[2], users[3], users[4]] {
        h.server.cast_vote(user, Some(players[1])).await.unwrap();
    }
    h.expire_phase(room_id).await;

    assert_eq!(h.player_state(room_id, players[1]).await, PlayerState::Dead);

    // The dead hunter answers inside the grace window.
    h.server.hunter_shoot(users[1], players[0]).await.unwrap();
    assert_eq!(h.player_state(room_id, players[0]).await, PlayerState::Dead);

    let messages = drain(&mut events).await;
    assert!(messages.iter().any(|m| matches!(
        m,
        ServerMessage::HunterRevengeCompleted { target_id, .. } if *target_id == players[0]
    )));
    // With the wolf gone the evaluator settles on villagers.
    let (status, winner) = h.room_status(room_id).await;
    assert_eq!(status, RoomStatus::Ended);
    assert_eq!(winner, Some(Team::Villagers));
}

#[tokio::test]
async fn failed_dictator_coup_kills_only_the_dictator() {
    let h = harness();
    let roles = [
        GameRole::Werewolf,
        GameRole::Dictator,
        GameRole::Seer,
        GameRole::Villager,
        GameRole::Villager,
    ];
    let (room_id, users, players) = h
        .game_with_roles(&roles, GamePhase::DayDiscussion, 2)
        .await;
    let mut events = h.subscribe_room_events().await;

    h.server.dictator_coup(users[1], players[3]).await.unwrap();

    assert_eq!(h.player_state(room_id, players[1]).await, PlayerState::Dead);
    assert_eq!(h.player_state(room_id, players[3]).await, PlayerState::Alive);
    let messages = drain(&mut events).await;
    assert!(messages
        .iter()
        .any(|m| matches!(m, ServerMessage::DictatorFailed { dictator_id } if *dictator_id == players[1])));
    let (status, _) = h.room_status(room_id).await;
    assert_eq!(status, RoomStatus::Day);
}

#[tokio::test]
async fn successful_coup_executes_the_wolf_and_crowns_a_mayor() {
    let h = harness();
    let roles = [
        GameRole::Werewolf,
        GameRole::Dictator,
        GameRole::Seer,
        GameRole::Villager,
        GameRole::Villager,
    ];
    let (room_id, users, players) = h
        .game_with_roles(&roles, GamePhase::DayDiscussion, 2)
        .await;
    let mut events = h.subscribe_room_events().await;

    h.server.dictator_coup(users[1], players[0]).await.unwrap();

    assert_eq!(h.player_state(room_id, players[0]).await, PlayerState::Dead);
    assert_eq!(h.player_state(room_id, players[1]).await, PlayerState::Alive);
    let messages = drain(&mut events).await;
    assert!(messages
        .iter()
        .any(|m| matches!(m, ServerMessage::DictatorSuccess { .. })));
    // Executing the only wolf ends the game for the villagers.
    let (status, winner) = h.room_status(room_id).await;
    assert_eq!(status, RoomStatus::Ended);
    assert_eq!(winner, Some(Team::Villagers));
}

#[tokio::test]
async fn black_wolf_converts_the_pack_victim() {
    let h = harness();
    let roles = [
        GameRole::Werewolf,
        GameRole::BlackWolf,
        GameRole::Seer,
        GameRole::Villager,
        GameRole::Villager,
        GameRole::Villager,
    ];
    let (room_id, users, players) = h.game_with_roles(&roles, GamePhase::NightPhase, 1).await;

    h.server
        .submit_night_action(users[0], ActionType::WerewolfVote, Some(players[3]), None)
        .await
        .unwrap();
    h.server
        .submit_night_action(users[1], ActionType::BlackWolfConvert, Some(players[3]), None)
        .await
        .unwrap();
    h.expire_phase(room_id).await;

    assert_eq!(h.player_state(room_id, players[3]).await, PlayerState::Alive);
    let ctx = h.server.ctx();
    let world = load_world(h.server.store.as_ref(), &ctx, room_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(world.player(players[3]).unwrap().role, Some(GameRole::Werewolf));
}

#[tokio::test]
async fn all_votes_in_schedules_an_immediate_expiry() {
    let h = harness();
    let roles = [
        GameRole::Werewolf,
        GameRole::Seer,
        GameRole::Villager,
        GameRole::Villager,
        GameRole::Villager,
    ];
    let (room_id, users, players) = h.game_with_roles(&roles, GamePhase::DayVoting, 2).await;

    for user in &users[..4] {
        h.server.cast_vote(*user, Some(players[0])).await.unwrap();
    }
    assert!(
        h.server.timers.pop_expired(Utc::now()).is_empty(),
        "phase must not end before the last ballot"
    );
    h.server.cast_vote(users[4], None).await.unwrap();

    let due = h.server.timers.pop_expired(Utc::now());
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].room_id, room_id);
    assert_eq!(due[0].phase, GamePhase::DayVoting);
}

#[tokio::test]
async fn little_girl_is_caught_when_the_roll_says_so() {
    let mut config = Config::default();
    config.game.little_girl_catch_chance = 1.0;
    let h = harness_with(config);
    let roles = [
        GameRole::Werewolf,
        GameRole::LittleGirl,
        GameRole::Seer,
        GameRole::Villager,
        GameRole::Villager,
        GameRole::Villager,
    ];
    // Start from voting so the next expiry enters a fresh night.
    let (room_id, _users, players) = h.game_with_roles(&roles, GamePhase::DayVoting, 1).await;
    h.expire_phase(room_id).await;

    assert_eq!(h.player_state(room_id, players[1]).await, PlayerState::Dead);
}

#[tokio::test]
async fn little_girl_gets_channel_access_when_not_caught() {
    let mut config = Config::default();
    config.game.little_girl_catch_chance = 0.0;
    let h = harness_with(config);
    let roles = [
        GameRole::Werewolf,
        GameRole::LittleGirl,
        GameRole::Seer,
        GameRole::Villager,
        GameRole::Villager,
        GameRole::Villager,
    ];
    let (room_id, _users, players) = h.game_with_roles(&roles, GamePhase::DayVoting, 1).await;
    let mut private = h.pubsub.subscribe("player.*").await.unwrap();
    h.expire_phase(room_id).await;

    assert_eq!(h.player_state(room_id, players[1]).await, PlayerState::Alive);
    let mut found = false;
    while let Ok(Some((topic, payload))) =
        tokio::time::timeout(Duration::from_millis(50), private.recv()).await
    {
        if topic.ends_with(&players[1].to_string()) {
            if let Ok(ServerMessage::WerewolfChannelAccess { .. }) =
                serde_json::from_slice::<ServerMessage>(&payload)
            {
                found = true;
            }
        }
    }
    assert!(found, "little girl receives the channel grant");

    let ctx = h.server.ctx();
    let world = load_world(h.server.store.as_ref(), &ctx, room_id)
        .await
        .unwrap()
        .unwrap();
    assert!(world.room.little_girl_spying);
}

#[tokio::test]
async fn guard_cannot_repeat_last_nights_target() {
    let h = harness();
    let roles = [
        GameRole::Werewolf,
        GameRole::Guard,
        GameRole::Seer,
        GameRole::Villager,
        GameRole::Villager,
    ];
    let (room_id, users, players) = h.game_with_roles(&roles, GamePhase::NightPhase, 1).await;

    // Self-protection is rejected outright.
    let err = h
        .server
        .submit_night_action(users[1], ActionType::GuardProtect, Some(players[1]), None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("themselves"));

    h.server
        .submit_night_action(users[1], ActionType::GuardProtect, Some(players[3]), None)
        .await
        .unwrap();
    h.expire_phase(room_id).await; // -> day
    h.expire_phase(room_id).await; // -> voting
    h.expire_phase(room_id).await; // -> night 2

    let err = h
        .server
        .submit_night_action(users[1], ActionType::GuardProtect, Some(players[3]), None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("two nights in a row"));

    // A different target is fine.
    h.server
        .submit_night_action(users[1], ActionType::GuardProtect, Some(players[4]), None)
        .await
        .unwrap();
}

#[tokio::test]
async fn votes_outside_the_voting_phase_are_rejected() {
    let h = harness();
    let roles = [
        GameRole::Werewolf,
        GameRole::Seer,
        GameRole::Villager,
        GameRole::Villager,
        GameRole::Villager,
    ];
    let (_room_id, users, players) = h.game_with_roles(&roles, GamePhase::NightPhase, 1).await;

    let err = h
        .server
        .cast_vote(users[2], Some(players[0]))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("voting phase"));
}
