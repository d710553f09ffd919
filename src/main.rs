//! Arena Server
//!
//! Starts the configured rooms and, until a transport is plugged in,
//! drives a short scripted match to exercise the engine end to end.

use std::time::Duration;

use anyhow::Context;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use arena_server::core::geom::{Coordinates, Vec2};
use arena_server::game::events::SequencedEvent;
use arena_server::game::powerup::PowerUpType;
use arena_server::game::weapon::Weapon;
use arena_server::net::channel::ConnectionChannel;
use arena_server::net::rooms::RoomHandle;
use arena_server::{PlayerId, RoomConfig, RoomManager, RpgClass, ServerConfig, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    info!("Arena Server v{}", VERSION);

    let config = match std::env::args().nth(1) {
        Some(path) => ServerConfig::from_json_file(&path)
            .with_context(|| format!("failed to load config from {path}"))?,
        None => ServerConfig::default(),
    };
    info!("{} room(s) configured", config.rooms.len());

    let manager = RoomManager::start(&config)
        .await
        .context("failed to start rooms")?;

    demo_match(&manager).await?;
    Ok(())
}

/// Run a scripted two-player skirmish in a dedicated demo room. The room
/// skips spawn immortality and raises the speed limit so the bots can take
/// their positions in one move.
async fn demo_match(manager: &RoomManager) -> anyhow::Result<()> {
    info!("=== Starting Demo Match ===");

    let demo_config = RoomConfig {
        game_id: 1000,
        spawn_immortal_mls: 0,
        max_player_speed: 500.0,
        ..RoomConfig::default()
    };
    let game_id = demo_config.game_id;
    let room = manager.create_room(demo_config).await?;

    let (alice, mut alice_events) = join_bot(&room, "alice", RpgClass::Shooter).await?;
    let (bob, _bob_events) = join_bot(&room, "bob", RpgClass::Warrior).await?;

    // Alice walks onto the quad-damage pad and grabs it
    let quad_location = room
        .read()
        .await
        .snapshot()
        .available_power_ups
        .iter()
        .find(|p| p.kind == PowerUpType::QuadDamage)
        .map(|p| p.location);
    if let Some(location) = quad_location {
        room.write()
            .await
            .buffer_move(alice, Coordinates::at(location), 1, 0)?;
        let taken = manager
            .pickup_power_up(game_id, location, PowerUpType::QuadDamage, alice, 1, 0)
            .await?;
        info!(taken = taken.is_some(), "quad damage pickup attempted");
    }

    // Face off at shotgun range
    room.write()
        .await
        .buffer_move(alice, Coordinates::at(Vec2::new(-50.0, -60.0)), 2, 0)?;
    room.write()
        .await
        .buffer_move(bob, Coordinates::at(Vec2::new(-30.0, -60.0)), 1, 0)?;

    // Trade shots until somebody drops
    let mut sequence = 2;
    loop {
        let result = room
            .write()
            .await
            .attack_weapon(alice, bob, Weapon::Shotgun, sequence, 0)?;
        sequence += 1;
        match result {
            Some(state) if state.killed => {
                info!(victim = %state.victim.id, damage = state.damage, "kill");
                break;
            }
            Some(state) => {
                info!(victim_hp = state.victim.health, damage = state.damage, "hit");
            }
            None => break,
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let respawned = room.write().await.respawn_player(bob)?;
    info!(
        previous = %respawned.previous_player_id,
        player = %respawned.player.id,
        deaths = respawned.player.stats.deaths,
        "bob respawned"
    );

    info!("=== Final Standings ===");
    for row in room.read().await.leaderboard() {
        info!(name = row.name, kills = row.kills, deaths = row.deaths, "standing");
    }

    // Show what alice's client would have received
    let mut delivered = 0;
    while alice_events.try_recv().is_ok() {
        delivered += 1;
    }
    info!(delivered, "events delivered to alice");

    manager.close_room(game_id).await?;
    Ok(())
}

async fn join_bot(
    room: &RoomHandle,
    name: &str,
    rpg_class: RpgClass,
) -> anyhow::Result<(PlayerId, tokio::sync::mpsc::Receiver<SequencedEvent>)> {
    let (channel, receiver) = ConnectionChannel::new("127.0.0.1:0".parse()?);
    let state = room
        .write()
        .await
        .join_player(name, channel, 0, None, rpg_class)?;
    info!(player = %state.player.id, name, "bot joined");
    Ok((state.player.id, receiver))
}
