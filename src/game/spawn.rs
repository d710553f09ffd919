//! Spawn Selection
//!
//! Picks a spawn point for joining and respawning players. The scoring is
//! policy, not contract: anything that avoids clustering players at one
//! spawn when alternatives exist is acceptable.

use rand::seq::SliceRandom;

use crate::core::geom::Coordinates;
use crate::game::player::PlayerState;

/// Spawn-point selection policy.
///
/// A trait seam so rooms can run against deterministic fakes in tests.
pub trait Spawner: Send + Sync {
    /// Choose a spawn from the map's candidates given the current live
    /// players. `candidates` is never empty.
    fn select_spawn(&self, candidates: &[Coordinates], players: &[&PlayerState]) -> Coordinates;
}

/// Prefers spawns with the fewest live players nearby; ties are broken
/// uniformly at random.
pub struct LeastPopulatedSpawner {
    /// Radius within which a live player counts as crowding a spawn.
    pub crowding_radius: f32,
}

impl Spawner for LeastPopulatedSpawner {
    fn select_spawn(&self, candidates: &[Coordinates], players: &[&PlayerState]) -> Coordinates {
        let crowding = |spawn: &Coordinates| {
            players
                .iter()
                .filter(|p| p.is_alive())
                .filter(|p| {
                    p.coordinates
                        .position
                        .within_radius(spawn.position, self.crowding_radius)
                })
                .count()
        };

        let min_count = candidates
            .iter()
            .map(crowding)
            .min()
            .unwrap_or(0);

        let least_crowded: Vec<Coordinates> = candidates
            .iter()
            .filter(|spawn| crowding(*spawn) == min_count)
            .copied()
            .collect();

        *least_crowded
            .choose(&mut rand::thread_rng())
            .unwrap_or(&candidates[0])
    }
}

/// Always picks the first candidate. Test seam.
pub struct FirstSpawner;

impl Spawner for FirstSpawner {
    fn select_spawn(&self, candidates: &[Coordinates], _players: &[&PlayerState]) -> Coordinates {
        candidates[0]
    }
}
