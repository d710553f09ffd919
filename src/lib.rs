//! # Arena Server
//!
//! Authoritative simulation engine for a real-time multiplayer arena
//! shooter. Clients are untrusted: every game rule, damage number and
//! movement claim is validated here.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       ARENA SERVER                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Shared primitives                         │
//! │  ├── geom.rs     - 2D vectors, coordinates, rectangles       │
//! │  └── sequence.rs - Atomic sequence id generation             │
//! │                                                              │
//! │  game/           - Authoritative simulation                  │
//! │  ├── room.rs     - Room orchestrator (one lock per room)     │
//! │  ├── registry.rs - Player table (capacity, names, standings) │
//! │  ├── combat.rs   - Damage resolution                         │
//! │  ├── powerup.rs  - Exclusive-holder power-up lifecycle       │
//! │  ├── anticheat.rs- Radius checks + periodic speed monitor    │
//! │  ├── spawn.rs    - Spawn-point selection                     │
//! │  └── ...         - players, weapons, maps, teleports, config │
//! │                                                              │
//! │  net/            - Delivery (transport-agnostic)             │
//! │  ├── channel.rs  - Per-connection ordered event channels     │
//! │  ├── ack.rs      - Bounded ack-required event storage        │
//! │  ├── dedup.rs    - TTL dedup of redelivered commands         │
//! │  └── rooms.rs    - Room manager and background cadences      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency Model
//!
//! One room is one serialization domain behind an `RwLock`; every room
//! operation runs under its write guard and performs no I/O. Independent
//! rooms run fully in parallel. Timer-driven work (move broadcast, speed
//! check, power-up revert/respawn) takes the lock only when it fires, and
//! carries the match epoch so callbacks outlive resets harmlessly.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod net;

pub use game::config::{RoomConfig, ServerConfig};
pub use game::error::{ErrorCode, GameLogicError};
pub use game::events::GameEvent;
pub use game::player::{PlayerId, RpgClass};
pub use game::room::GameRoom;
pub use net::rooms::RoomManager;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
