//! Concurrency tests for the room engine: every task goes through the
//! room's lock like a real connection handler would.

use std::sync::Arc;

use proptest::prelude::*;
use tokio::sync::RwLock;

use arena_server::core::geom::{Coordinates, Vec2};
use arena_server::game::config::RoomConfig;
use arena_server::game::player::{PlayerId, PlayerState, RpgClass};
use arena_server::game::powerup::PowerUpType;
use arena_server::game::room::GameRoom;
use arena_server::net::channel::ConnectionChannel;
use arena_server::ErrorCode;

fn room_config(max_players: usize) -> RoomConfig {
    RoomConfig {
        max_players,
        spawn_immortal_mls: 0,
        ..RoomConfig::default()
    }
}

async fn join(room: &Arc<RwLock<GameRoom>>, name: &str) -> PlayerId {
    let (channel, _receiver) = ConnectionChannel::new("10.0.0.1:6000".parse().unwrap());
    room.write()
        .await
        .join_player(name, channel, 0, None, RpgClass::Shooter)
        .unwrap()
        .player
        .id
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_joins_admit_exactly_capacity() {
    let capacity = 4;
    let room = Arc::new(RwLock::new(GameRoom::new(room_config(capacity))));

    let mut handles = Vec::new();
    for i in 0..16 {
        let room = room.clone();
        handles.push(tokio::spawn(async move {
            let (channel, _receiver) =
                ConnectionChannel::new("10.0.0.1:6000".parse().unwrap());
            room.write()
                .await
                .join_player(&format!("player-{i}"), channel, 0, None, RpgClass::Shooter)
                .map(|state| state.player.id)
        }));
    }

    let mut admitted = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => admitted += 1,
            Err(err) => {
                assert_eq!(err.code, ErrorCode::ServerFull);
                rejected += 1;
            }
        }
    }
    assert_eq!(admitted, capacity);
    assert_eq!(rejected, 16 - capacity);
    assert_eq!(room.read().await.player_count(), capacity);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_pickups_have_exactly_one_winner() {
    let room = Arc::new(RwLock::new(GameRoom::new(room_config(12))));

    let mut players = Vec::new();
    for i in 0..8 {
        players.push(join(&room, &format!("player-{i}")).await);
    }
    let pad = room
        .read()
        .await
        .snapshot()
        .available_power_ups
        .iter()
        .find(|p| p.kind == PowerUpType::QuadDamage)
        .unwrap()
        .location;

    let mut handles = Vec::new();
    for player_id in players {
        let room = room.clone();
        handles.push(tokio::spawn(async move {
            room.write()
                .await
                .pickup_power_up(pad, PowerUpType::QuadDamage, player_id, 1, 0)
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap().is_some() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
    assert!(!room
        .read()
        .await
        .snapshot()
        .available_power_ups
        .iter()
        .any(|p| p.kind == PowerUpType::QuadDamage));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_moves_keep_one_slot_per_player() {
    let room = Arc::new(RwLock::new(GameRoom::new(room_config(4))));
    let a = join(&room, "a").await;
    join(&room, "b").await;

    let mut handles = Vec::new();
    for seq in 1..=32i64 {
        let room = room.clone();
        handles.push(tokio::spawn(async move {
            let x = -90.0 + seq as f32;
            room.write()
                .await
                .buffer_move(a, Coordinates::at(Vec2::new(x, -90.0)), seq, 0)
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // However the moves interleaved, exactly one coalesced slot survives
    // and it carries the highest accepted sequence id's coordinates.
    let flushed = room.write().await.flush_buffered_moves();
    assert_eq!(flushed.len(), 1);
    assert_eq!(flushed[0].0.coordinates.position.x, -90.0 + 32.0);
}

proptest! {
    #[test]
    fn prop_watermark_only_advances(sequences in proptest::collection::vec(-5i64..200, 1..64)) {
        let mut player = PlayerState::new(
            PlayerId(1),
            "prop".into(),
            0,
            RpgClass::Shooter,
            Coordinates::at(Vec2::ZERO),
            std::time::Instant::now(),
        );

        let mut watermark = -1i64;
        for seq in sequences {
            let accepted = player.accept_sequence(seq);
            prop_assert_eq!(accepted, seq > watermark);
            if accepted {
                watermark = seq;
            }
            prop_assert_eq!(player.last_sequence_id, watermark);
        }
    }
}
