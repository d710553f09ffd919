//! Room Manager
//!
//! Owns every live room and the background cadences that drive it: the
//! move-broadcast tick, the speed check, the idle-dead cleanup, and the
//! one-shot power-up timers. Each loop takes the room's write lock only
//! when it fires and exits once the room reports closed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tokio::time::{interval, sleep};
use tracing::{debug, info};

use crate::core::geom::Vec2;
use crate::game::config::{RoomConfig, ServerConfig};
use crate::game::error::{ErrorCode, GameLogicError};
use crate::game::events::PowerUpTakenState;
use crate::game::player::PlayerId;
use crate::game::powerup::{PowerUp, PowerUpType};
use crate::game::room::{GameRoom, RoomSnapshot};

/// Cadence of the idle-dead cleanup sweep.
const CLEANUP_PERIOD: Duration = Duration::from_secs(5);

/// Shared handle to one room.
pub type RoomHandle = Arc<RwLock<GameRoom>>;

/// All rooms of this process.
pub struct RoomManager {
    rooms: RwLock<HashMap<u64, RoomHandle>>,
}

impl RoomManager {
    /// Manager with no rooms.
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Create every configured room and start its cadences.
    pub async fn start(config: &ServerConfig) -> Result<Arc<Self>, GameLogicError> {
        let manager = Arc::new(Self::new());
        for room_config in &config.rooms {
            manager.create_room(room_config.clone()).await?;
        }
        Ok(manager)
    }

    /// Create a room and spawn its background loops.
    pub async fn create_room(&self, config: RoomConfig) -> Result<RoomHandle, GameLogicError> {
        let game_id = config.game_id;
        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(&game_id) {
            return Err(GameLogicError::common(format!(
                "game room {game_id} already exists"
            )));
        }

        let move_period = config.move_broadcast_period();
        let speed_period = config.speed_check_period();
        let room: RoomHandle = Arc::new(RwLock::new(GameRoom::new(config)));
        rooms.insert(game_id, room.clone());

        tokio::spawn(run_move_flush_loop(room.clone(), move_period));
        tokio::spawn(run_speed_check_loop(room.clone(), speed_period));
        tokio::spawn(run_cleanup_loop(room.clone(), CLEANUP_PERIOD));

        info!(game_id, "room created");
        Ok(room)
    }

    /// Look a room up by its game id.
    pub async fn get_room(&self, game_id: u64) -> Result<RoomHandle, GameLogicError> {
        self.rooms
            .read()
            .await
            .get(&game_id)
            .cloned()
            .ok_or_else(|| {
                GameLogicError::new(
                    ErrorCode::NotExistingGameRoom,
                    format!("no game room with id {game_id}"),
                )
            })
    }

    /// Close a room and forget it. Its loops exit on their next tick.
    pub async fn close_room(&self, game_id: u64) -> Result<(), GameLogicError> {
        let room = {
            let mut rooms = self.rooms.write().await;
            rooms.remove(&game_id).ok_or_else(|| {
                GameLogicError::new(
                    ErrorCode::NotExistingGameRoom,
                    format!("no game room with id {game_id}"),
                )
            })?
        };
        room.write().await.close();
        Ok(())
    }

    /// Point-in-time view of a room for the get-info surface.
    pub async fn room_snapshot(&self, game_id: u64) -> Result<RoomSnapshot, GameLogicError> {
        let room = self.get_room(game_id).await?;
        let snapshot = room.read().await.snapshot();
        Ok(snapshot)
    }

    /// Number of live rooms.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Pickup with the revert/respawn timers attached. The timers carry the
    /// take-time match epoch, so a game-over reset or room close turns them
    /// into no-ops.
    pub async fn pickup_power_up(
        &self,
        game_id: u64,
        coordinates: Vec2,
        kind: PowerUpType,
        player_id: PlayerId,
        sequence_id: i64,
        ping_mls: u32,
    ) -> Result<Option<PowerUpTakenState>, GameLogicError> {
        let room = self.get_room(game_id).await?;
        let (result, epoch) = {
            let mut guard = room.write().await;
            let result = guard.pickup_power_up(coordinates, kind, player_id, sequence_id, ping_mls);
            (result, guard.match_id())
        };
        if let Some(state) = &result {
            schedule_power_up_timers(room, state.power_up, epoch);
        }
        Ok(result)
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot timers for a taken power-up: revert the effect after its
/// duration, return it to the map after its spawn period.
pub fn schedule_power_up_timers(room: RoomHandle, power_up: PowerUp, match_epoch: u64) {
    let kind = power_up.kind;
    if kind.is_timed() {
        let room = room.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(power_up.lasts_for_mls)).await;
            room.write().await.revert_power_up(kind, match_epoch);
        });
    }
    tokio::spawn(async move {
        sleep(Duration::from_millis(power_up.spawn_period_mls)).await;
        room.write().await.respawn_power_up(kind, match_epoch);
    });
}

async fn run_move_flush_loop(room: RoomHandle, period: Duration) {
    let mut ticker = interval(period);
    loop {
        ticker.tick().await;
        let mut guard = room.write().await;
        if guard.is_closed() {
            break;
        }
        guard.flush_buffered_moves();
    }
    let game_id = room.read().await.game_id();
    debug!(game_id, "move flush loop stopped");
}

async fn run_speed_check_loop(room: RoomHandle, period: Duration) {
    let mut ticker = interval(period);
    loop {
        ticker.tick().await;
        let mut guard = room.write().await;
        if guard.is_closed() {
            break;
        }
        guard.run_speed_check(Instant::now());
    }
}

async fn run_cleanup_loop(room: RoomHandle, period: Duration) {
    let mut ticker = interval(period);
    loop {
        ticker.tick().await;
        let mut guard = room.write().await;
        if guard.is_closed() {
            break;
        }
        guard.remove_idle_dead(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geom::Coordinates;
    use crate::game::map::GameMap;
    use crate::game::player::RpgClass;
    use crate::game::powerup::PowerUpType;
    use crate::net::channel::ConnectionChannel;

    fn room_config(game_id: u64) -> RoomConfig {
        RoomConfig {
            game_id,
            spawn_immortal_mls: 0,
            move_broadcast_period_mls: 10,
            ..RoomConfig::default()
        }
    }

    async fn join(
        room: &RoomHandle,
        name: &str,
    ) -> (
        PlayerId,
        tokio::sync::mpsc::Receiver<crate::game::events::SequencedEvent>,
    ) {
        let (channel, receiver) = ConnectionChannel::new("10.0.0.1:5000".parse().unwrap());
        let state = room
            .write()
            .await
            .join_player(name, channel, 0, None, RpgClass::Shooter)
            .unwrap();
        (state.player.id, receiver)
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let manager = RoomManager::new();
        manager.create_room(room_config(1)).await.unwrap();
        manager.create_room(room_config(2)).await.unwrap();
        assert_eq!(manager.room_count().await, 2);

        assert!(manager.get_room(1).await.is_ok());
        let err = manager.get_room(3).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotExistingGameRoom);

        let err = manager.create_room(room_config(1)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::CommonError);
    }

    #[tokio::test]
    async fn test_close_room_stops_lookups() {
        let manager = RoomManager::new();
        let room = manager.create_room(room_config(1)).await.unwrap();

        manager.close_room(1).await.unwrap();
        assert!(room.read().await.is_closed());
        assert_eq!(
            manager.get_room(1).await.unwrap_err().code,
            ErrorCode::NotExistingGameRoom
        );
        assert_eq!(
            manager.close_room(1).await.unwrap_err().code,
            ErrorCode::NotExistingGameRoom
        );
    }

    #[tokio::test]
    async fn test_move_flush_loop_delivers_moves() {
        let manager = RoomManager::new();
        let room = manager.create_room(room_config(1)).await.unwrap();
        let (a, _rx_a) = join(&room, "a").await;
        let (b, mut rx_b) = join(&room, "b").await;

        // Spawn points are picked at random; park b next to the move
        // target so the visibility filter cannot exclude it.
        {
            let mut guard = room.write().await;
            guard
                .buffer_move(b, Coordinates::at(Vec2::new(-60.0, -60.0)), 1, 0)
                .unwrap();
            guard
                .buffer_move(a, Coordinates::at(Vec2::new(-70.0, -70.0)), 1, 0)
                .unwrap();
        }

        sleep(Duration::from_millis(50)).await;
        let mut saw_move = false;
        while let Ok(sequenced) = rx_b.try_recv() {
            if matches!(sequenced.event, crate::game::events::GameEvent::Move(_)) {
                saw_move = true;
            }
        }
        assert!(saw_move);
    }

    #[tokio::test]
    async fn test_power_up_timers_revert_and_respawn() {
        // Shrink the quad-damage timings so the timers fire quickly
        let mut map = GameMap::default_arena();
        for power_up in &mut map.power_ups {
            power_up.lasts_for_mls = 20;
            power_up.spawn_period_mls = 40;
        }
        let config = RoomConfig {
            map: Some(map),
            ..room_config(1)
        };
        let manager = RoomManager::new();
        let room = manager.create_room(config).await.unwrap();
        let (a, _rx) = join(&room, "a").await;

        let location = {
            let guard = room.read().await;
            let snapshot = guard.snapshot();
            snapshot
                .available_power_ups
                .iter()
                .find(|p| p.kind == PowerUpType::QuadDamage)
                .unwrap()
                .location
        };
        let taken = manager
            .pickup_power_up(1, location, PowerUpType::QuadDamage, a, 1, 0)
            .await
            .unwrap();
        assert!(taken.is_some());

        sleep(Duration::from_millis(30)).await;
        {
            let guard = room.read().await;
            // Effect reverted, pad still empty
            assert!(!guard
                .snapshot()
                .available_power_ups
                .iter()
                .any(|p| p.kind == PowerUpType::QuadDamage));
        }

        sleep(Duration::from_millis(30)).await;
        let guard = room.read().await;
        assert!(guard
            .snapshot()
            .available_power_ups
            .iter()
            .any(|p| p.kind == PowerUpType::QuadDamage));
    }

    #[tokio::test]
    async fn test_stale_epoch_timer_is_a_no_op() {
        let mut map = GameMap::default_arena();
        for power_up in &mut map.power_ups {
            power_up.lasts_for_mls = 10;
            power_up.spawn_period_mls = 20;
        }
        let config = RoomConfig {
            map: Some(map),
            ..room_config(1)
        };
        let manager = RoomManager::new();
        let room = manager.create_room(config).await.unwrap();
        let (a, _rx) = join(&room, "a").await;

        let (state, stale_epoch) = {
            let mut guard = room.write().await;
            let location = guard
                .snapshot()
                .available_power_ups
                .iter()
                .find(|p| p.kind == PowerUpType::QuadDamage)
                .unwrap()
                .location;
            let state = guard
                .pickup_power_up(location, PowerUpType::QuadDamage, a, 1, 0)
                .unwrap();
            (state, guard.match_id() + 1)
        };

        // Timers armed with a wrong epoch fire but never touch the room
        schedule_power_up_timers(room.clone(), state.power_up, stale_epoch);
        sleep(Duration::from_millis(60)).await;

        let guard = room.read().await;
        assert!(!guard
            .snapshot()
            .available_power_ups
            .iter()
            .any(|p| p.kind == PowerUpType::QuadDamage));
    }
}
