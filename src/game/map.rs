//! Map Geometry
//!
//! Read-only per-room geometry: bounds, walls, spawn points, teleport pads
//! and power-up placements. Supplied at room construction; the engine never
//! mutates it.

use serde::{Deserialize, Serialize};

use crate::core::geom::{Coordinates, Rect, Vec2};
use crate::game::powerup::{PowerUp, PowerUpType};
use crate::game::teleport::Teleport;

/// Static geometry for one arena.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameMap {
    /// Playable bounds. Moves outside are cheating.
    pub bounds: Rect,
    /// Solid wall pieces. Moves into a wall are cheating.
    pub walls: Vec<Rect>,
    /// Candidate spawn locations.
    pub spawn_points: Vec<Coordinates>,
    /// Teleport pads.
    pub teleports: Vec<Teleport>,
    /// Power-up placements.
    pub power_ups: Vec<PowerUp>,
}

impl GameMap {
    /// Whether a claimed position is legal: inside bounds, outside walls.
    pub fn allows_position(&self, position: Vec2) -> bool {
        self.bounds.contains(position) && !self.walls.iter().any(|wall| wall.contains(position))
    }

    /// The bundled default arena: a square with a cross of cover walls,
    /// four corner spawns plus two mid spawns, one teleport pair and the
    /// standard power-up set.
    pub fn default_arena() -> Self {
        let spawn_points = vec![
            Coordinates::new(Vec2::new(-80.0, -80.0), Vec2::RIGHT),
            Coordinates::new(Vec2::new(80.0, -80.0), Vec2::UP),
            Coordinates::new(Vec2::new(-80.0, 80.0), Vec2::RIGHT),
            Coordinates::new(Vec2::new(80.0, 80.0), -Vec2::RIGHT),
            Coordinates::new(Vec2::new(0.0, -90.0), Vec2::UP),
            Coordinates::new(Vec2::new(0.0, 90.0), -Vec2::UP),
        ];

        let walls = vec![
            Rect::new(Vec2::new(-40.0, -5.0), Vec2::new(-10.0, 5.0)),
            Rect::new(Vec2::new(10.0, -5.0), Vec2::new(40.0, 5.0)),
            Rect::new(Vec2::new(-5.0, 10.0), Vec2::new(5.0, 40.0)),
            Rect::new(Vec2::new(-5.0, -40.0), Vec2::new(5.0, -10.0)),
        ];

        let teleports = vec![
            Teleport {
                id: 1,
                location: Vec2::new(-90.0, 0.0),
                direction: Vec2::RIGHT,
                teleport_to: Some(2),
                destination: None,
            },
            Teleport {
                id: 2,
                location: Vec2::new(90.0, 0.0),
                direction: -Vec2::RIGHT,
                teleport_to: Some(1),
                destination: None,
            },
        ];

        let power_ups = vec![
            PowerUp {
                kind: PowerUpType::QuadDamage,
                location: Vec2::new(0.0, 0.0),
                lasts_for_mls: 15_000,
                spawn_period_mls: 60_000,
            },
            PowerUp {
                kind: PowerUpType::Beast,
                location: Vec2::new(60.0, 60.0),
                lasts_for_mls: 15_000,
                spawn_period_mls: 45_000,
            },
            PowerUp {
                kind: PowerUpType::Defence,
                location: Vec2::new(-60.0, 60.0),
                lasts_for_mls: 20_000,
                spawn_period_mls: 45_000,
            },
            PowerUp {
                kind: PowerUpType::Medkit,
                location: Vec2::new(-60.0, -60.0),
                lasts_for_mls: 0,
                spawn_period_mls: 30_000,
            },
            PowerUp {
                kind: PowerUpType::AmmoCrate,
                location: Vec2::new(60.0, -60.0),
                lasts_for_mls: 0,
                spawn_period_mls: 30_000,
            },
        ];

        Self {
            bounds: Rect::new(Vec2::new(-100.0, -100.0), Vec2::new(100.0, 100.0)),
            walls,
            spawn_points,
            teleports,
            power_ups,
        }
    }
}
