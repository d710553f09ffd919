//! Teleports
//!
//! Static teleport pads. A pad either points at a paired pad or at explicit
//! destination coordinates.

use serde::{Deserialize, Serialize};

use crate::core::geom::{Coordinates, Vec2};

/// Teleport pad identifier (map-local).
pub type TeleportId = u32;

/// A teleport pad on the map.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Teleport {
    /// Pad id.
    pub id: TeleportId,
    /// Pad location.
    pub location: Vec2,
    /// Facing direction players exit with.
    pub direction: Vec2,
    /// Paired pad whose location is the destination.
    pub teleport_to: Option<TeleportId>,
    /// Explicit destination, used when no pair is set.
    pub destination: Option<Vec2>,
}

/// Static teleport lookup for one map.
pub struct TeleportRegistry {
    teleports: Vec<Teleport>,
}

impl TeleportRegistry {
    /// Build from map placements.
    pub fn new(teleports: Vec<Teleport>) -> Self {
        Self { teleports }
    }

    /// Look up a pad.
    pub fn get(&self, id: TeleportId) -> Option<&Teleport> {
        self.teleports.iter().find(|t| t.id == id)
    }

    /// All pads (for join snapshots).
    pub fn all(&self) -> &[Teleport] {
        &self.teleports
    }

    /// Resolve where a pad sends a player. `None` when the pad does not
    /// exist or is mispaired.
    pub fn destination(&self, id: TeleportId) -> Option<Coordinates> {
        let pad = self.get(id)?;
        if let Some(target_id) = pad.teleport_to {
            let target = self.get(target_id)?;
            return Some(Coordinates::new(target.location, target.direction));
        }
        pad.destination
            .map(|position| Coordinates::new(position, pad.direction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paired_pads() -> TeleportRegistry {
        TeleportRegistry::new(vec![
            Teleport {
                id: 1,
                location: Vec2::new(0.0, 0.0),
                direction: Vec2::RIGHT,
                teleport_to: Some(2),
                destination: None,
            },
            Teleport {
                id: 2,
                location: Vec2::new(50.0, 50.0),
                direction: Vec2::UP,
                teleport_to: Some(1),
                destination: None,
            },
        ])
    }

    #[test]
    fn test_paired_destination() {
        let registry = paired_pads();
        let dest = registry.destination(1).unwrap();
        assert_eq!(dest.position, Vec2::new(50.0, 50.0));
        assert_eq!(dest.direction, Vec2::UP);
    }

    #[test]
    fn test_explicit_destination() {
        let registry = TeleportRegistry::new(vec![Teleport {
            id: 7,
            location: Vec2::ZERO,
            direction: Vec2::RIGHT,
            teleport_to: None,
            destination: Some(Vec2::new(-10.0, 3.0)),
        }]);
        let dest = registry.destination(7).unwrap();
        assert_eq!(dest.position, Vec2::new(-10.0, 3.0));
        assert_eq!(dest.direction, Vec2::RIGHT);
    }

    #[test]
    fn test_unknown_pad() {
        let registry = paired_pads();
        assert!(registry.get(99).is_none());
        assert!(registry.destination(99).is_none());
    }
}
