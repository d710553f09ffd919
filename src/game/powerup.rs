//! Power-Ups
//!
//! Power-up definitions, their apply/revert effects on a player, and the
//! exclusive-holder registry with the
//! `Available -> Taken -> EffectReverted -> Available` lifecycle.
//!
//! The registry is plain mutable state: it always lives behind its room's
//! lock, which is what makes `take` an atomic test-and-set across the whole
//! registry.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::geom::Vec2;
use crate::game::player::{ActivePowerUp, PlayerId, PlayerState};

/// Health restored by a medkit.
pub const MEDKIT_HEALTH: u32 = 50;

/// Power-up identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PowerUpType {
    /// Outgoing damage x4 while held.
    QuadDamage,
    /// Outgoing damage x1.5 while held. Stacks with quad.
    Beast,
    /// Incoming damage halved while held.
    Defence,
    /// Instant +50 health.
    Medkit,
    /// Instant ammo refill for the class loadout.
    AmmoCrate,
}

impl PowerUpType {
    /// Whether the effect lasts and must be reverted after `lasts_for_mls`.
    /// Instant effects (health, ammo) have nothing to revert.
    pub fn is_timed(self) -> bool {
        matches!(
            self,
            PowerUpType::QuadDamage | PowerUpType::Beast | PowerUpType::Defence
        )
    }

    /// Damage-amplifier contribution while held.
    fn damage_factor(self) -> f64 {
        match self {
            PowerUpType::QuadDamage => 4.0,
            PowerUpType::Beast => 1.5,
            _ => 1.0,
        }
    }

    /// Defence-divisor contribution while held.
    fn defence_factor(self) -> f64 {
        match self {
            PowerUpType::Defence => 2.0,
            _ => 1.0,
        }
    }

    /// Apply the effect to a player. Timed effects are recorded in the
    /// player's active set with their revert deadline.
    pub fn apply(self, player: &mut PlayerState, revert_at: Instant) {
        match self {
            PowerUpType::QuadDamage | PowerUpType::Beast => {
                player.damage_amplifier *= self.damage_factor();
            }
            PowerUpType::Defence => {
                player.defence_divisor *= self.defence_factor();
            }
            PowerUpType::Medkit => player.heal(MEDKIT_HEALTH),
            PowerUpType::AmmoCrate => player.refill_ammo(),
        }

        if self.is_timed() {
            player.active_power_ups.push(ActivePowerUp {
                kind: self,
                revert_at,
            });
        }
    }

    /// Undo a timed effect. No-op when the player does not hold it.
    pub fn revert(self, player: &mut PlayerState) {
        let Some(index) = player
            .active_power_ups
            .iter()
            .position(|active| active.kind == self)
        else {
            return;
        };
        player.active_power_ups.remove(index);

        match self {
            PowerUpType::QuadDamage | PowerUpType::Beast => {
                player.damage_amplifier /= self.damage_factor();
            }
            PowerUpType::Defence => {
                player.defence_divisor /= self.defence_factor();
            }
            PowerUpType::Medkit | PowerUpType::AmmoCrate => {}
        }
    }
}

/// Revert every active power-up of a player (death, game-over reset).
pub fn revert_all(player: &mut PlayerState) {
    while let Some(active) = player.active_power_ups.last().copied() {
        active.kind.revert(player);
    }
}

/// A power-up placement on the map.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PowerUp {
    /// Which power-up.
    pub kind: PowerUpType,
    /// Map location of the pickup pad.
    pub location: Vec2,
    /// Effect duration in milliseconds.
    pub lasts_for_mls: u64,
    /// Respawn period in milliseconds, measured from the take.
    pub spawn_period_mls: u64,
}

/// Lifecycle of one power-up slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SlotState {
    /// On the map, can be taken.
    Available,
    /// Held; effect active on the holder.
    Taken { by: PlayerId },
    /// Effect reverted, pad still empty until the spawn period elapses.
    EffectReverted,
}

/// Exclusive-holder tracker for a room's power-ups.
///
/// A trait seam so rooms can run against fakes in tests.
pub trait PowerUpRegistry: Send + Sync {
    /// Atomically take a power-up. Returns its definition, or `None` when
    /// the kind is unknown to this map or already held.
    fn take(&mut self, kind: PowerUpType, player_id: PlayerId) -> Option<PowerUp>;

    /// Transition `Taken -> EffectReverted`. Returns the holder whose effect
    /// must be undone, or `None` when the slot is not in `Taken`.
    fn mark_reverted(&mut self, kind: PowerUpType) -> Option<PlayerId>;

    /// Transition back to `Available`. Returns the definition when the slot
    /// actually respawned.
    fn release(&mut self, kind: PowerUpType) -> Option<PowerUp>;

    /// Definition lookup regardless of state.
    fn definition(&self, kind: PowerUpType) -> Option<PowerUp>;

    /// Snapshot of currently takeable power-ups.
    fn available(&self) -> Vec<PowerUp>;

    /// Current holder, if held.
    fn holder(&self, kind: PowerUpType) -> Option<PlayerId>;

    /// Force every slot back to `Available` (game-over reset, close).
    fn reset(&mut self);
}

/// The standard in-memory registry.
pub struct InMemoryPowerUpRegistry {
    slots: BTreeMap<PowerUpType, (PowerUp, SlotState)>,
}

impl InMemoryPowerUpRegistry {
    /// Build from the map's power-up placements.
    pub fn new(power_ups: impl IntoIterator<Item = PowerUp>) -> Self {
        let slots = power_ups
            .into_iter()
            .map(|def| (def.kind, (def, SlotState::Available)))
            .collect();
        Self { slots }
    }
}

impl PowerUpRegistry for InMemoryPowerUpRegistry {
    fn take(&mut self, kind: PowerUpType, player_id: PlayerId) -> Option<PowerUp> {
        let (def, state) = self.slots.get_mut(&kind)?;
        if *state != SlotState::Available {
            return None;
        }
        *state = SlotState::Taken { by: player_id };
        Some(*def)
    }

    fn mark_reverted(&mut self, kind: PowerUpType) -> Option<PlayerId> {
        let (_, state) = self.slots.get_mut(&kind)?;
        if let SlotState::Taken { by } = *state {
            *state = SlotState::EffectReverted;
            Some(by)
        } else {
            None
        }
    }

    fn release(&mut self, kind: PowerUpType) -> Option<PowerUp> {
        let (def, state) = self.slots.get_mut(&kind)?;
        match *state {
            SlotState::Taken { .. } | SlotState::EffectReverted => {
                *state = SlotState::Available;
                Some(*def)
            }
            SlotState::Available => None,
        }
    }

    fn definition(&self, kind: PowerUpType) -> Option<PowerUp> {
        self.slots.get(&kind).map(|(def, _)| *def)
    }

    fn available(&self) -> Vec<PowerUp> {
        self.slots
            .values()
            .filter(|(_, state)| *state == SlotState::Available)
            .map(|(def, _)| *def)
            .collect()
    }

    fn holder(&self, kind: PowerUpType) -> Option<PlayerId> {
        match self.slots.get(&kind) {
            Some((_, SlotState::Taken { by })) => Some(*by),
            _ => None,
        }
    }

    fn reset(&mut self) {
        for (_, state) in self.slots.values_mut() {
            *state = SlotState::Available;
        }
    }
}
