//! Configuration
//!
//! The configuration surface consumed by the engine: per-room limits and
//! cadences plus the balance numbers. Loaded from a JSON file at startup;
//! every field has a sensible default so a bare `{}` room works.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::game::map::GameMap;
use crate::game::weapon::{Weapon, WeaponProfile};

/// Configuration load errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid JSON or does not match the schema.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Balance numbers shared by every room.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BalanceConfig {
    /// Per-weapon damage and range profile.
    pub weapons: BTreeMap<Weapon, WeaponProfile>,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        let weapons = Weapon::ALL
            .iter()
            .map(|weapon| (*weapon, WeaponProfile::default_for(*weapon)))
            .collect();
        Self { weapons }
    }
}

impl BalanceConfig {
    /// Profile for a weapon. Falls back to the built-in default for
    /// weapons missing from the file.
    pub fn weapon(&self, weapon: Weapon) -> WeaponProfile {
        self.weapons
            .get(&weapon)
            .copied()
            .unwrap_or_else(|| WeaponProfile::default_for(weapon))
    }
}

/// Configuration of one game room.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Room identifier commands are routed by.
    pub game_id: u64,
    /// Capacity.
    pub max_players: usize,
    /// Frags ending the match.
    pub frags_to_win: u32,
    /// Move-broadcast tick period.
    pub move_broadcast_period_mls: u64,
    /// Speed-check sampling period.
    pub speed_check_period_mls: u64,
    /// Post-spawn grace period.
    pub spawn_immortal_mls: u64,
    /// Observers beyond this radius do not receive a player's moves.
    pub visibility_radius: f32,
    /// Honest top speed, units per second.
    pub max_player_speed: f32,
    /// Speed-check slack multiplier before flagging.
    pub speed_tolerance: f32,
    /// Radius within which a live player crowds a spawn point.
    pub spawn_crowding_radius: f32,
    /// Power-up pickup radius.
    pub power_up_radius: f32,
    /// Teleport pad radius.
    pub teleport_radius: f32,
    /// Whether power-ups spawn in this room.
    pub power_ups_enabled: bool,
    /// Whether teleport pads work in this room.
    pub teleports_enabled: bool,
    /// Dead players are removed after this long without respawning.
    pub dead_idle_timeout_mls: u64,
    /// Bound of each connection's pending-ack storage.
    pub ack_storage_capacity: usize,
    /// Sliding TTL of each connection's dedup storage.
    pub dedup_ttl_mls: u64,
    /// Balance numbers.
    pub balance: BalanceConfig,
    /// Map geometry; the bundled arena when omitted.
    pub map: Option<GameMap>,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            game_id: 1,
            max_players: 12,
            frags_to_win: 20,
            move_broadcast_period_mls: 50,
            speed_check_period_mls: 1000,
            spawn_immortal_mls: 3000,
            visibility_radius: 120.0,
            max_player_speed: 20.0,
            speed_tolerance: 1.5,
            spawn_crowding_radius: 25.0,
            power_up_radius: 4.0,
            teleport_radius: 4.0,
            power_ups_enabled: true,
            teleports_enabled: true,
            dead_idle_timeout_mls: 60_000,
            ack_storage_capacity: 256,
            dedup_ttl_mls: 10_000,
            balance: BalanceConfig::default(),
            map: None,
        }
    }
}

impl RoomConfig {
    /// Move-broadcast tick period.
    pub fn move_broadcast_period(&self) -> Duration {
        Duration::from_millis(self.move_broadcast_period_mls)
    }

    /// Speed-check sampling period.
    pub fn speed_check_period(&self) -> Duration {
        Duration::from_millis(self.speed_check_period_mls)
    }

    /// Post-spawn grace period.
    pub fn spawn_immortal_period(&self) -> Duration {
        Duration::from_millis(self.spawn_immortal_mls)
    }

    /// Dead-player idle timeout.
    pub fn dead_idle_timeout(&self) -> Duration {
        Duration::from_millis(self.dead_idle_timeout_mls)
    }

    /// Dedup sliding TTL.
    pub fn dedup_ttl(&self) -> Duration {
        Duration::from_millis(self.dedup_ttl_mls)
    }

    /// Map geometry for this room.
    pub fn map_geometry(&self) -> GameMap {
        self.map.clone().unwrap_or_else(GameMap::default_arena)
    }
}

/// Whole-process configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// One room per configured map.
    pub rooms: Vec<RoomConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            rooms: vec![RoomConfig::default()],
        }
    }
}

impl ServerConfig {
    /// Load from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
