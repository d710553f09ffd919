//! Player State
//!
//! Per-player simulation record. Owned exclusively by a room and mutated
//! only inside that room's serialization domain.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::core::geom::Coordinates;
use crate::game::powerup::PowerUpType;
use crate::game::weapon::Weapon;

/// Maximum (and starting) health.
pub const MAX_HEALTH: u32 = 100;

/// Unique player identifier. Assigned fresh on every join *and* respawn;
/// never reused within a room.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Player lifecycle status.
///
/// Kept explicit instead of inferring from health: a dead player is still
/// addressable (chat, draining) until the idle-timeout path removes it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerStatus {
    /// Joined, no accepted move yet.
    Connecting,
    /// Alive and in combat.
    Active,
    /// Killed; awaiting respawn or idle-timeout removal.
    Dead,
    /// Disconnected. Terminal.
    Exited,
}

/// RPG class: fixes the weapon set and the attack/defence multipliers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RpgClass {
    /// Balanced all-rounder with the full gun rack.
    Shooter,
    /// Close combat, hits harder and takes less.
    Warrior,
    /// Rockets and area denial.
    Demolition,
    /// Long-range, fragile.
    Sniper,
}

impl RpgClass {
    /// Weapons available to this class. Punch is always included.
    pub fn weapons(self) -> &'static [Weapon] {
        match self {
            RpgClass::Shooter => &[
                Weapon::Punch,
                Weapon::Shotgun,
                Weapon::MachineGun,
                Weapon::Railgun,
            ],
            RpgClass::Warrior => &[Weapon::Punch, Weapon::Shotgun],
            RpgClass::Demolition => &[Weapon::Punch, Weapon::RocketLauncher],
            RpgClass::Sniper => &[Weapon::Punch, Weapon::Railgun],
        }
    }

    /// Outgoing damage multiplier.
    pub fn attack_multiplier(self) -> f64 {
        match self {
            RpgClass::Shooter => 1.0,
            RpgClass::Warrior => 1.25,
            RpgClass::Demolition => 1.0,
            RpgClass::Sniper => 1.5,
        }
    }

    /// Incoming damage is divided by this.
    pub fn defence_multiplier(self) -> f64 {
        match self {
            RpgClass::Shooter => 1.0,
            RpgClass::Warrior => 1.25,
            RpgClass::Demolition => 1.0,
            RpgClass::Sniper => 0.8,
        }
    }

    /// Starting ammo per weapon.
    pub fn initial_ammo(self) -> BTreeMap<Weapon, u32> {
        let mut ammo = BTreeMap::new();
        for weapon in self.weapons() {
            if weapon.uses_ammo() {
                let rounds = match weapon {
                    Weapon::Shotgun => 25,
                    Weapon::MachineGun => 100,
                    Weapon::Railgun => 10,
                    Weapon::RocketLauncher => 15,
                    Weapon::Punch => 0,
                };
                ammo.insert(*weapon, rounds);
            }
        }
        ammo
    }
}

/// Kill/death counters. Reset on game-over, preserved across respawns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStats {
    /// Frags credited toward the win condition.
    pub kills: u32,
    /// Times respawned after death.
    pub deaths: u32,
}

/// An active power-up effect on a player.
#[derive(Clone, Copy, Debug)]
pub struct ActivePowerUp {
    /// Which power-up.
    pub kind: PowerUpType,
    /// When the effect reverts.
    pub revert_at: Instant,
}

/// State of a single player in a room.
#[derive(Clone, Debug)]
pub struct PlayerState {
    /// Unique id, fresh on join/respawn.
    pub id: PlayerId,
    /// Display name, unique among non-exited players of the room.
    pub name: String,
    /// Client-chosen color index.
    pub color: u8,
    /// Last accepted position + direction.
    pub coordinates: Coordinates,
    /// 0..=100.
    pub health: u32,
    /// Class, fixed for the player's lifetime in the room.
    pub rpg_class: RpgClass,
    /// Remaining rounds per weapon.
    pub ammo: BTreeMap<Weapon, u32>,
    /// Currently applied power-ups with their revert deadlines.
    pub active_power_ups: Vec<ActivePowerUp>,
    /// Product of held damage-amplifier power-ups. 1.0 when none.
    pub damage_amplifier: f64,
    /// Incoming damage is divided by this. 1.0 when no defence power-up.
    pub defence_divisor: f64,
    /// Kill/death counters.
    pub stats: GameStats,
    /// Watermark for in-order move acceptance. Starts at -1.
    pub last_sequence_id: i64,
    /// Spawn-immortality deadline.
    pub immortal_until: Option<Instant>,
    /// Lifecycle status.
    pub status: PlayerStatus,
}

impl PlayerState {
    /// Create a freshly spawned player. Starts in `Connecting`; the first
    /// accepted move promotes it to `Active`.
    pub fn new(
        id: PlayerId,
        name: String,
        color: u8,
        rpg_class: RpgClass,
        spawn: Coordinates,
        immortal_until: Instant,
    ) -> Self {
        Self {
            id,
            name,
            color,
            coordinates: spawn,
            health: MAX_HEALTH,
            rpg_class,
            ammo: rpg_class.initial_ammo(),
            active_power_ups: Vec::new(),
            damage_amplifier: 1.0,
            defence_divisor: 1.0,
            stats: GameStats::default(),
            last_sequence_id: -1,
            immortal_until: Some(immortal_until),
            status: PlayerStatus::Connecting,
        }
    }

    /// Alive for combat purposes.
    #[inline]
    pub fn is_alive(&self) -> bool {
        matches!(self.status, PlayerStatus::Active | PlayerStatus::Connecting)
    }

    /// Within the post-spawn grace period.
    pub fn is_immortal(&self, now: Instant) -> bool {
        self.immortal_until.is_some_and(|until| now < until)
    }

    /// Accept a move if its sequence id is beyond the watermark.
    /// Returns false for duplicates and out-of-order ids.
    pub fn accept_sequence(&mut self, sequence_id: i64) -> bool {
        if sequence_id > self.last_sequence_id {
            self.last_sequence_id = sequence_id;
            true
        } else {
            false
        }
    }

    /// Whether the weapon belongs to this player's class.
    pub fn has_weapon(&self, weapon: Weapon) -> bool {
        self.rpg_class.weapons().contains(&weapon)
    }

    /// Whether a round can be fired.
    pub fn has_ammo(&self, weapon: Weapon) -> bool {
        !weapon.uses_ammo() || self.ammo.get(&weapon).copied().unwrap_or(0) > 0
    }

    /// Spend one round. Caller must have checked `has_ammo`.
    pub fn consume_ammo(&mut self, weapon: Weapon) {
        if weapon.uses_ammo() {
            if let Some(rounds) = self.ammo.get_mut(&weapon) {
                *rounds = rounds.saturating_sub(1);
            }
        }
    }

    /// Refill every weapon of the class to its initial loadout.
    pub fn refill_ammo(&mut self) {
        self.ammo = self.rpg_class.initial_ammo();
    }

    /// Apply damage. Returns true when the hit was lethal.
    pub fn apply_damage(&mut self, amount: u32) -> bool {
        self.health = self.health.saturating_sub(amount);
        if self.health == 0 {
            self.status = PlayerStatus::Dead;
            true
        } else {
            false
        }
    }

    /// Heal up to [`MAX_HEALTH`].
    pub fn heal(&mut self, amount: u32) {
        self.health = (self.health + amount).min(MAX_HEALTH);
    }

    /// Clear per-match progress (game-over reset). Keeps connection-facing
    /// identity and position.
    pub fn reset_match_state(&mut self) {
        self.stats = GameStats::default();
        self.active_power_ups.clear();
        self.damage_amplifier = 1.0;
        self.defence_divisor = 1.0;
        self.health = MAX_HEALTH;
        self.ammo = self.rpg_class.initial_ammo();
        if self.status == PlayerStatus::Dead {
            self.status = PlayerStatus::Active;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geom::Vec2;
    use std::time::Duration;

    fn test_player(id: u64) -> PlayerState {
        PlayerState::new(
            PlayerId(id),
            format!("player-{id}"),
            0,
            RpgClass::Shooter,
            Coordinates::at(Vec2::ZERO),
            Instant::now(),
        )
    }

    #[test]
    fn test_watermark_rejects_stale_sequences() {
        let mut player = test_player(1);
        assert_eq!(player.last_sequence_id, -1);

        assert!(player.accept_sequence(0));
        assert!(player.accept_sequence(5));
        assert!(!player.accept_sequence(5));
        assert!(!player.accept_sequence(3));
        assert_eq!(player.last_sequence_id, 5);
    }

    #[test]
    fn test_lethal_damage_marks_dead() {
        let mut player = test_player(1);
        assert!(!player.apply_damage(60));
        assert_eq!(player.health, 40);
        assert!(player.apply_damage(60));
        assert_eq!(player.health, 0);
        assert_eq!(player.status, PlayerStatus::Dead);
    }

    #[test]
    fn test_heal_caps_at_max() {
        let mut player = test_player(1);
        player.apply_damage(30);
        player.heal(50);
        assert_eq!(player.health, MAX_HEALTH);
    }

    #[test]
    fn test_immortality_window() {
        let now = Instant::now();
        let mut player = test_player(1);
        player.immortal_until = Some(now + Duration::from_millis(100));
        assert!(player.is_immortal(now));
        assert!(!player.is_immortal(now + Duration::from_millis(101)));
    }

    #[test]
    fn test_class_weapon_availability() {
        let player = test_player(1);
        assert!(player.has_weapon(Weapon::Shotgun));
        assert!(!player.has_weapon(Weapon::RocketLauncher));
    }

    #[test]
    fn test_ammo_consumption() {
        let mut player = test_player(1);
        assert!(player.has_ammo(Weapon::Railgun));
        for _ in 0..10 {
            player.consume_ammo(Weapon::Railgun);
        }
        assert!(!player.has_ammo(Weapon::Railgun));
        // Punch never runs out
        assert!(player.has_ammo(Weapon::Punch));
    }

    #[test]
    fn test_match_reset_clears_progress() {
        let mut player = test_player(1);
        player.stats.kills = 7;
        player.damage_amplifier = 4.0;
        player.apply_damage(100);

        player.reset_match_state();
        assert_eq!(player.stats, GameStats::default());
        assert_eq!(player.damage_amplifier, 1.0);
        assert_eq!(player.health, MAX_HEALTH);
        assert_eq!(player.status, PlayerStatus::Active);
    }
}
