//! Weapons
//!
//! Weapon definitions: base damage, engagement range and the
//! proximity-amplifier bands used by combat resolution.

use serde::{Deserialize, Serialize};

/// Weapon identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Weapon {
    /// Melee. Always available, consumes no ammo.
    Punch,
    /// Close-range burst with strong proximity amplification.
    Shotgun,
    /// Mid-range automatic.
    MachineGun,
    /// Long-range hitscan.
    Railgun,
    /// Projectile; damage is measured from the detonation point.
    RocketLauncher,
}

impl Weapon {
    /// All weapons, in display order.
    pub const ALL: [Weapon; 5] = [
        Weapon::Punch,
        Weapon::Shotgun,
        Weapon::MachineGun,
        Weapon::Railgun,
        Weapon::RocketLauncher,
    ];

    /// Whether this weapon consumes ammo.
    pub fn uses_ammo(self) -> bool {
        !matches!(self, Weapon::Punch)
    }

    /// Whether this weapon is fired as a projectile
    /// (routed through `attack_projectile`).
    pub fn is_projectile(self) -> bool {
        matches!(self, Weapon::RocketLauncher)
    }
}

/// Per-weapon balance numbers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeaponProfile {
    /// Damage before any multiplier.
    pub base_damage: f64,
    /// Maximum plausible attacker-to-victim distance. Beyond this the shot
    /// is flagged by anti-cheat.
    pub max_range: f32,
    /// Distance inside which the near proximity amplifier applies.
    pub near_radius: f32,
    /// Distance inside which the mid proximity amplifier applies.
    pub mid_radius: f32,
    /// Amplifier inside `near_radius`.
    pub near_amplifier: f64,
    /// Amplifier inside `mid_radius` (but outside `near_radius`).
    pub mid_amplifier: f64,
}

impl WeaponProfile {
    /// Proximity amplifier for a given attacker-to-victim distance.
    pub fn proximity_amplifier(&self, distance: f32) -> f64 {
        if distance <= self.near_radius {
            self.near_amplifier
        } else if distance <= self.mid_radius {
            self.mid_amplifier
        } else {
            1.0
        }
    }

    /// Default balance for a weapon.
    pub fn default_for(weapon: Weapon) -> Self {
        match weapon {
            Weapon::Punch => Self {
                base_damage: 20.0,
                max_range: 3.0,
                near_radius: 0.0,
                mid_radius: 0.0,
                near_amplifier: 1.0,
                mid_amplifier: 1.0,
            },
            Weapon::Shotgun => Self {
                base_damage: 25.0,
                max_range: 40.0,
                near_radius: 5.0,
                mid_radius: 15.0,
                near_amplifier: 3.0,
                mid_amplifier: 2.0,
            },
            Weapon::MachineGun => Self {
                base_damage: 10.0,
                max_range: 60.0,
                near_radius: 0.0,
                mid_radius: 0.0,
                near_amplifier: 1.0,
                mid_amplifier: 1.0,
            },
            Weapon::Railgun => Self {
                base_damage: 50.0,
                max_range: 150.0,
                near_radius: 0.0,
                mid_radius: 0.0,
                near_amplifier: 1.0,
                mid_amplifier: 1.0,
            },
            Weapon::RocketLauncher => Self {
                base_damage: 40.0,
                max_range: 100.0,
                near_radius: 2.0,
                mid_radius: 6.0,
                near_amplifier: 2.0,
                mid_amplifier: 1.5,
            },
        }
    }
}
