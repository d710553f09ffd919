//! Game Simulation
//!
//! The authoritative arena simulation: player lifecycle, combat, power-ups,
//! teleports, anti-cheat and the per-room orchestration in [`room`].

pub mod anticheat;
pub mod combat;
pub mod config;
pub mod error;
pub mod events;
pub mod map;
pub mod player;
pub mod powerup;
pub mod registry;
pub mod room;
pub mod spawn;
pub mod teleport;
pub mod weapon;

pub use config::{RoomConfig, ServerConfig};
pub use error::{ErrorCode, GameLogicError};
pub use events::GameEvent;
pub use player::{PlayerId, PlayerState, RpgClass};
pub use room::GameRoom;
