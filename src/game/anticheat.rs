//! Anti-Cheat
//!
//! Server-side plausibility checks. Two mechanisms:
//!
//! - stateless radius predicates comparing a claimed position against a
//!   reference position, applied synchronously per action;
//! - a periodic speed check sampling every active player's position on its
//!   own cadence. A single move cannot be judged in isolation; excessive
//!   speed is a *rate* property, so it gets its own timer.

use std::collections::HashMap;
use std::time::Instant;

use crate::core::geom::Vec2;
use crate::game::player::PlayerId;

/// Stateless per-action plausibility checks.
///
/// A trait seam so rooms can run against permissive fakes in tests.
pub trait AntiCheat: Send + Sync {
    /// Is the victim beyond the weapon's plausible range?
    fn is_attacking_too_far(
        &self,
        attacker: Vec2,
        victim: Vec2,
        weapon_range: f32,
        ping_mls: u32,
    ) -> bool;

    /// Is the player too far from the power-up pad to pick it up?
    fn is_power_up_too_far(&self, player: Vec2, power_up: Vec2, ping_mls: u32) -> bool;

    /// Is the player too far from the teleport pad to use it?
    fn is_teleport_too_far(&self, player: Vec2, pad: Vec2, ping_mls: u32) -> bool;
}

/// Radius checks with ping compensation.
///
/// A laggy client reports positions up to `ping` old, so the allowed radius
/// is widened by the distance an honest player covers in that time.
pub struct RadiusAntiCheat {
    /// Pickup interaction radius.
    pub power_up_radius: f32,
    /// Teleport interaction radius.
    pub teleport_radius: f32,
    /// Honest top speed, units per second. Drives the ping slack.
    pub max_player_speed: f32,
}

impl RadiusAntiCheat {
    fn ping_slack(&self, ping_mls: u32) -> f32 {
        self.max_player_speed * ping_mls as f32 / 1000.0
    }
}

impl AntiCheat for RadiusAntiCheat {
    fn is_attacking_too_far(
        &self,
        attacker: Vec2,
        victim: Vec2,
        weapon_range: f32,
        ping_mls: u32,
    ) -> bool {
        !victim.within_radius(attacker, weapon_range + self.ping_slack(ping_mls))
    }

    fn is_power_up_too_far(&self, player: Vec2, power_up: Vec2, ping_mls: u32) -> bool {
        !player.within_radius(power_up, self.power_up_radius + self.ping_slack(ping_mls))
    }

    fn is_teleport_too_far(&self, player: Vec2, pad: Vec2, ping_mls: u32) -> bool {
        !player.within_radius(pad, self.teleport_radius + self.ping_slack(ping_mls))
    }
}

/// A permissive implementation that flags nothing. Test seam.
pub struct NoAntiCheat;

impl AntiCheat for NoAntiCheat {
    fn is_attacking_too_far(&self, _: Vec2, _: Vec2, _: f32, _: u32) -> bool {
        false
    }

    fn is_power_up_too_far(&self, _: Vec2, _: Vec2, _: u32) -> bool {
        false
    }

    fn is_teleport_too_far(&self, _: Vec2, _: Vec2, _: u32) -> bool {
        false
    }
}

/// Last observed position of a player.
#[derive(Clone, Copy, Debug)]
struct SpeedSample {
    position: Vec2,
    at: Instant,
}

/// Periodic implied-speed check.
///
/// Lives inside the room's serialization domain; the cadence that calls
/// [`SpeedMonitor::sample`] runs on its own timer and takes the room lock
/// only when it fires.
pub struct SpeedMonitor {
    samples: HashMap<PlayerId, SpeedSample>,
    /// Honest top speed, units per second.
    max_player_speed: f32,
    /// Multiplier of slack before flagging.
    tolerance: f32,
}

impl SpeedMonitor {
    /// Create a monitor.
    pub fn new(max_player_speed: f32, tolerance: f32) -> Self {
        Self {
            samples: HashMap::new(),
            max_player_speed,
            tolerance,
        }
    }

    /// Record a sample for every listed player and return the ones whose
    /// implied speed since the previous sample exceeds the limit.
    pub fn sample(
        &mut self,
        positions: impl Iterator<Item = (PlayerId, Vec2)>,
        now: Instant,
    ) -> Vec<PlayerId> {
        let mut violators = Vec::new();
        let limit = self.max_player_speed * self.tolerance;

        for (player_id, position) in positions {
            if let Some(previous) = self.samples.get(&player_id) {
                let elapsed = now.duration_since(previous.at).as_secs_f32();
                if elapsed > 0.0 {
                    let speed = previous.position.distance(position) / elapsed;
                    if speed > limit {
                        violators.push(player_id);
                    }
                }
            }
            self.samples.insert(
                player_id,
                SpeedSample {
                    position,
                    at: now,
                },
            );
        }

        violators
    }

    /// Restart tracking from a new position. Used after teleports and
    /// respawns so the legal jump is not misread as speed.
    pub fn reset(&mut self, player_id: PlayerId, position: Vec2, now: Instant) {
        self.samples.insert(
            player_id,
            SpeedSample {
                position,
                at: now,
            },
        );
    }

    /// Drop a player's sample (disconnect).
    pub fn forget(&mut self, player_id: &PlayerId) {
        self.samples.remove(player_id);
    }

    /// Drop all samples (room close / game-over reset).
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
