//! Combat Resolution
//!
//! Pure damage math. The room applies the result; nothing here mutates
//! state except the two explicit helpers at the bottom.

use crate::game::player::PlayerState;
use crate::game::weapon::WeaponProfile;

/// Health granted to the attacker on a kill.
pub const VAMPIRE_HP_BOOST: u32 = 20;

/// Compute the damage of one hit.
///
/// `damage = base × class_attack ÷ class_defence × proximity × power_up`,
/// further divided by the victim's defence divisor. Rounded to the nearest
/// point.
pub fn resolve_damage(
    attacker: &PlayerState,
    victim: &PlayerState,
    profile: &WeaponProfile,
    distance: f32,
) -> u32 {
    let damage = profile.base_damage
        * attacker.rpg_class.attack_multiplier()
        / victim.rpg_class.defence_multiplier()
        * profile.proximity_amplifier(distance)
        * attacker.damage_amplifier
        / victim.defence_divisor;

    damage.round().max(0.0) as u32
}

/// Credit a kill: bump the attacker's frag count and grant the vampire
/// health boost.
pub fn credit_kill(attacker: &mut PlayerState) {
    attacker.stats.kills += 1;
    attacker.heal(VAMPIRE_HP_BOOST);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geom::{Coordinates, Vec2};
    use crate::game::player::{PlayerId, RpgClass, MAX_HEALTH};
    use crate::game::powerup::PowerUpType;
    use crate::game::weapon::{Weapon, WeaponProfile};
    use std::time::Instant;

    fn shooter(id: u64) -> PlayerState {
        PlayerState::new(
            PlayerId(id),
            format!("p{id}"),
            0,
            RpgClass::Shooter,
            Coordinates::at(Vec2::ZERO),
            Instant::now(),
        )
    }

    #[test]
    fn test_flat_damage_no_multipliers() {
        let attacker = shooter(1);
        let victim = shooter(2);
        let profile = WeaponProfile::default_for(Weapon::MachineGun);
        assert_eq!(resolve_damage(&attacker, &victim, &profile, 30.0), 10);
    }

    #[test]
    fn test_shotgun_point_blank_triples() {
        let attacker = shooter(1);
        let victim = shooter(2);
        let profile = WeaponProfile::default_for(Weapon::Shotgun);
        // 25 base x3 near band
        assert_eq!(resolve_damage(&attacker, &victim, &profile, 2.0), 75);
        // x2 mid band
        assert_eq!(resolve_damage(&attacker, &victim, &profile, 10.0), 50);
        // x1 beyond
        assert_eq!(resolve_damage(&attacker, &victim, &profile, 30.0), 25);
    }

    #[test]
    fn test_quad_damage_stacks_with_beast() {
        let mut attacker = shooter(1);
        let victim = shooter(2);
        let at = Instant::now();
        PowerUpType::QuadDamage.apply(&mut attacker, at);
        PowerUpType::Beast.apply(&mut attacker, at);

        let profile = WeaponProfile::default_for(Weapon::MachineGun);
        // 10 x4 x1.5
        assert_eq!(resolve_damage(&attacker, &victim, &profile, 30.0), 60);
    }

    #[test]
    fn test_defence_power_up_halves() {
        let attacker = shooter(1);
        let mut victim = shooter(2);
        PowerUpType::Defence.apply(&mut victim, Instant::now());

        let profile = WeaponProfile::default_for(Weapon::Railgun);
        assert_eq!(resolve_damage(&attacker, &victim, &profile, 100.0), 25);
    }

    #[test]
    fn test_class_multipliers() {
        let warrior = PlayerState::new(
            PlayerId(1),
            "warrior".into(),
            0,
            RpgClass::Warrior,
            Coordinates::at(Vec2::ZERO),
            Instant::now(),
        );
        let victim = shooter(2);
        let profile = WeaponProfile::default_for(Weapon::Shotgun);
        // 25 x1.25 attack, x1 proximity
        assert_eq!(resolve_damage(&warrior, &victim, &profile, 30.0), 31);

        // Incoming into the warrior is divided by its 1.25 defence
        let attacker = shooter(3);
        assert_eq!(resolve_damage(&attacker, &warrior, &profile, 30.0), 20);
    }

    #[test]
    fn test_vampire_boost_caps_at_max() {
        let mut attacker = shooter(1);
        attacker.apply_damage(60); // 40 left
        credit_kill(&mut attacker);
        assert_eq!(attacker.health, 40 + VAMPIRE_HP_BOOST);
        assert_eq!(attacker.stats.kills, 1);

        let mut healthy = shooter(2);
        credit_kill(&mut healthy);
        assert_eq!(healthy.health, MAX_HEALTH);
    }
}
