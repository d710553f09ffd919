//! Game Room
//!
//! The authoritative simulation of one arena. A room is one serialization
//! domain: every public method runs with `&mut self` under the room's
//! `RwLock` write guard, so all invariants hold without further locking.
//! Independent rooms never contend with each other.
//!
//! Methods never perform I/O. Outbound events go through the non-blocking
//! channel layer; a recipient whose channel cannot keep up is shed.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::geom::{Coordinates, Vec2};
use crate::core::sequence::SequenceGenerator;
use crate::game::anticheat::{AntiCheat, RadiusAntiCheat, SpeedMonitor};
use crate::game::combat::{credit_kill, resolve_damage};
use crate::game::config::RoomConfig;
use crate::game::error::{ErrorCode, GameLogicError};
use crate::game::events::{
    GameEvent, GameOverState, LeaderboardEntry, PlayerAttackedState, PlayerJoinedState,
    PlayerMovedState, PlayerRespawnedState, PlayerSnapshot, PowerUpSpawnedState, PowerUpTakenState,
    TeleportedState,
};
use crate::game::map::GameMap;
use crate::game::player::{GameStats, PlayerId, PlayerState, PlayerStatus, RpgClass};
use crate::game::powerup::{
    self, InMemoryPowerUpRegistry, PowerUp, PowerUpRegistry, PowerUpType,
};
use crate::game::registry::PlayerRegistry;
use crate::game::spawn::{LeastPopulatedSpawner, Spawner};
use crate::game::teleport::{TeleportId, TeleportRegistry};
use crate::game::weapon::Weapon;
use crate::net::channel::{ConnectionChannel, PlayerConnection};

/// Point-in-time view of a room, for the get-info surface.
#[derive(Clone, Debug, Serialize)]
pub struct RoomSnapshot {
    /// Room identifier.
    pub game_id: u64,
    /// Current match epoch.
    pub match_id: u64,
    /// Every connected player.
    pub players: Vec<PlayerSnapshot>,
    /// Current standings.
    pub leaderboard: Vec<LeaderboardEntry>,
    /// Power-ups currently on the map.
    pub available_power_ups: Vec<PowerUp>,
}

/// One arena and everything in it.
pub struct GameRoom {
    config: RoomConfig,
    map: GameMap,
    /// Match epoch. Bumped on game-over reset and on close so stale timer
    /// callbacks become no-ops.
    match_id: u64,
    players: PlayerRegistry,
    power_ups: Box<dyn PowerUpRegistry>,
    teleports: TeleportRegistry,
    anti_cheat: Box<dyn AntiCheat>,
    spawner: Box<dyn Spawner>,
    speed_monitor: SpeedMonitor,
    /// Room-wide outbound event ids, acked by clients.
    events: SequenceGenerator,
    next_player_id: u64,
    /// One coalescing slot per player, drained by the broadcast tick.
    buffered_moves: HashMap<PlayerId, Coordinates>,
    closed: bool,
}

impl fmt::Debug for GameRoom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameRoom")
            .field("game_id", &self.config.game_id)
            .field("match_id", &self.match_id)
            .field("players", &self.players.len())
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl GameRoom {
    /// Room with the standard anti-cheat and spawn policy.
    pub fn new(config: RoomConfig) -> Self {
        let anti_cheat = RadiusAntiCheat {
            power_up_radius: config.power_up_radius,
            teleport_radius: config.teleport_radius,
            max_player_speed: config.max_player_speed,
        };
        let spawner = LeastPopulatedSpawner {
            crowding_radius: config.spawn_crowding_radius,
        };
        Self::with_parts(config, Box::new(anti_cheat), Box::new(spawner))
    }

    /// Room with injected anti-cheat and spawn policies.
    pub fn with_parts(
        config: RoomConfig,
        anti_cheat: Box<dyn AntiCheat>,
        spawner: Box<dyn Spawner>,
    ) -> Self {
        let map = config.map_geometry();
        let power_ups = Box::new(InMemoryPowerUpRegistry::new(map.power_ups.clone()));
        let teleports = TeleportRegistry::new(map.teleports.clone());
        let speed_monitor = SpeedMonitor::new(config.max_player_speed, config.speed_tolerance);
        let players = PlayerRegistry::new(config.max_players);
        Self {
            config,
            map,
            match_id: 1,
            players,
            power_ups,
            teleports,
            anti_cheat,
            spawner,
            speed_monitor,
            events: SequenceGenerator::new(),
            next_player_id: 0,
            buffered_moves: HashMap::new(),
            closed: false,
        }
    }

    /// Room identifier.
    pub fn game_id(&self) -> u64 {
        self.config.game_id
    }

    /// Current match epoch.
    pub fn match_id(&self) -> u64 {
        self.match_id
    }

    /// Whether the room has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Number of player entries, exited ones included.
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// The room's configuration.
    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Current standings.
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        self.players.leaderboard()
    }

    /// Point-in-time view for the get-info surface.
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            game_id: self.config.game_id,
            match_id: self.match_id,
            players: self.players.players().map(PlayerSnapshot::from).collect(),
            leaderboard: self.players.leaderboard(),
            available_power_ups: self.power_ups.available(),
        }
    }

    // ------------------------------------------------------------------
    // Player lifecycle
    // ------------------------------------------------------------------

    /// Admit a player.
    ///
    /// `recovery_player_id` lets a client resume after a transport drop:
    /// when it names an entry that still carries the same display name, that
    /// entry is replaced and its kill/death counters survive into the fresh
    /// player.
    pub fn join_player(
        &mut self,
        name: &str,
        connection: ConnectionChannel,
        color: u8,
        recovery_player_id: Option<PlayerId>,
        rpg_class: RpgClass,
    ) -> Result<PlayerJoinedState, GameLogicError> {
        self.ensure_open()?;

        let recovered_stats = recovery_player_id.and_then(|old_id| {
            self.players
                .get(old_id)
                .filter(|player| player.name == name)
                .map(|player| player.stats)
        });
        if recovered_stats.is_some() {
            if let Some(old_id) = recovery_player_id {
                self.drop_entry(old_id);
            }
        }

        let spawn = self.select_spawn();
        let id = self.fresh_player_id();
        let now = Instant::now();
        let mut state = PlayerState::new(
            id,
            name.to_string(),
            color,
            rpg_class,
            spawn,
            now + self.config.spawn_immortal_period(),
        );
        if let Some(stats) = recovered_stats {
            state.stats = stats;
        }
        let snapshot = PlayerSnapshot::from(&state);

        let player_connection = PlayerConnection::new(
            connection,
            self.config.ack_storage_capacity,
            self.config.dedup_ttl(),
        );
        self.players.insert(state, player_connection)?;
        self.speed_monitor.reset(id, spawn.position, now);

        info!(game_id = self.config.game_id, player = %id, name, "player joined");
        self.broadcast_filtered(GameEvent::PlayerJoined(snapshot.clone()), |p| p.id != id);

        Ok(PlayerJoinedState {
            player: snapshot,
            leaderboard: self.players.leaderboard(),
            available_power_ups: self.power_ups.available(),
            teleports: self.teleports.all().to_vec(),
        })
    }

    /// Bind an additional delivery path for one logical player. The
    /// secondary channel must come from the primary's peer.
    pub fn merge_connection(
        &mut self,
        player_id: PlayerId,
        secondary: ConnectionChannel,
    ) -> Result<(), GameLogicError> {
        self.ensure_open()?;
        let connection = self
            .players
            .connection_mut(player_id)
            .ok_or_else(|| GameLogicError::player_does_not_exist(player_id.0))?;
        if !connection.accepts_merge(&secondary) {
            return Err(GameLogicError::common(
                "secondary channel peer does not match the primary connection",
            ));
        }
        connection.merge(secondary);
        Ok(())
    }

    /// Bring a dead player back under a fresh id. Deaths are counted here,
    /// not at the lethal hit.
    pub fn respawn_player(
        &mut self,
        player_id: PlayerId,
    ) -> Result<PlayerRespawnedState, GameLogicError> {
        self.ensure_open()?;
        let status = self.players.require(player_id)?.status;
        if status != PlayerStatus::Dead {
            return Err(GameLogicError::common("player is not dead"));
        }

        // The entry is known to exist; unwrap-free removal via the status
        // check above.
        let Some(entry) = self.players.remove(player_id) else {
            return Err(GameLogicError::player_does_not_exist(player_id.0));
        };
        let spawn = self.select_spawn();
        let new_id = self.fresh_player_id();
        let now = Instant::now();
        let mut state = PlayerState::new(
            new_id,
            entry.state.name.clone(),
            entry.state.color,
            entry.state.rpg_class,
            spawn,
            now + self.config.spawn_immortal_period(),
        );
        state.stats = GameStats {
            kills: entry.state.stats.kills,
            deaths: entry.state.stats.deaths + 1,
        };
        // Respawn goes straight back to combat, unlike a first join.
        state.status = PlayerStatus::Active;
        let snapshot = PlayerSnapshot::from(&state);
        self.players.reinsert(state, entry.connection);

        self.speed_monitor.forget(&player_id);
        self.speed_monitor.reset(new_id, spawn.position, now);
        self.buffered_moves.remove(&player_id);

        let result = PlayerRespawnedState {
            player: snapshot,
            previous_player_id: player_id,
            available_power_ups: self.power_ups.available(),
        };
        self.broadcast_filtered(GameEvent::Respawned(result.clone()), |p| p.id != new_id);
        Ok(result)
    }

    /// Remove a player: registry entry, buffered move and every pending ack
    /// about them, in one step.
    pub fn disconnect_player(&mut self, player_id: PlayerId) -> bool {
        if !self.drop_entry(player_id) {
            return false;
        }
        for entry in self.players.entries_mut() {
            entry
                .connection
                .acks
                .ack_not_required(|event| event.subject() == Some(player_id));
        }
        debug!(game_id = self.config.game_id, player = %player_id, "player disconnected");
        self.broadcast(GameEvent::PlayerLeft { player_id });
        true
    }

    /// Reap dead players that never respawned. Returns the removed ids.
    pub fn remove_idle_dead(&mut self, now: Instant) -> Vec<PlayerId> {
        let idle = self
            .players
            .idle_dead(now, self.config.dead_idle_timeout());
        for player_id in &idle {
            self.disconnect_player(*player_id);
        }
        idle
    }

    // ------------------------------------------------------------------
    // Movement
    // ------------------------------------------------------------------

    /// Accept a move into the player's coalescing slot.
    ///
    /// Unknown and dead players are ignored, as are moves at or below the
    /// sequence watermark. A destination outside the map or inside a wall
    /// is cheating.
    pub fn buffer_move(
        &mut self,
        player_id: PlayerId,
        coordinates: Coordinates,
        sequence_id: i64,
        _ping_mls: u32,
    ) -> Result<Option<PlayerMovedState>, GameLogicError> {
        self.ensure_open()?;
        let Some(player) = self.players.get_mut(player_id) else {
            return Ok(None);
        };
        if !player.is_alive() {
            return Ok(None);
        }
        if !player.accept_sequence(sequence_id) {
            return Ok(None);
        }
        if !self.map.allows_position(coordinates.position) {
            return Err(GameLogicError::cheating(format!(
                "move to {:?} is out of bounds or inside a wall",
                coordinates.position
            )));
        }
        player.coordinates = coordinates;
        if player.status == PlayerStatus::Connecting {
            player.status = PlayerStatus::Active;
        }
        self.buffered_moves.insert(player_id, coordinates);
        Ok(Some(PlayerMovedState {
            player_id,
            coordinates,
        }))
    }

    /// Drain the coalescing slots and fan each move out to observers within
    /// the visibility radius. Returns what was flushed and to whom.
    pub fn flush_buffered_moves(&mut self) -> Vec<(PlayerMovedState, Vec<PlayerId>)> {
        if self.buffered_moves.is_empty() {
            return Vec::new();
        }
        let moves: Vec<(PlayerId, Coordinates)> = self.buffered_moves.drain().collect();
        let radius = self.config.visibility_radius;

        let mut flushed = Vec::with_capacity(moves.len());
        let mut overwhelmed = Vec::new();
        for (player_id, coordinates) in moves {
            let recipients: Vec<PlayerId> = self
                .players
                .players()
                .filter(|p| p.id != player_id)
                .filter(|p| {
                    p.coordinates
                        .position
                        .within_radius(coordinates.position, radius)
                })
                .map(|p| p.id)
                .collect();
            let state = PlayerMovedState {
                player_id,
                coordinates,
            };
            overwhelmed.extend(self.fan_out(GameEvent::Move(state.clone()), |p| {
                recipients.contains(&p.id)
            }));
            flushed.push((state, recipients));
        }
        self.shed_overwhelmed(overwhelmed);
        flushed
    }

    /// Sample every live player's implied speed and kick the violators.
    /// Returns the kicked ids.
    pub fn run_speed_check(&mut self, now: Instant) -> Vec<PlayerId> {
        if self.closed {
            return Vec::new();
        }
        let positions: Vec<(PlayerId, Vec2)> = self
            .players
            .players()
            .filter(|p| p.is_alive())
            .map(|p| (p.id, p.coordinates.position))
            .collect();
        let violators = self.speed_monitor.sample(positions.into_iter(), now);
        for player_id in &violators {
            warn!(
                game_id = self.config.game_id,
                player = %player_id,
                "implied speed over the limit, disconnecting"
            );
            self.disconnect_player(*player_id);
        }
        violators
    }

    // ------------------------------------------------------------------
    // Combat
    // ------------------------------------------------------------------

    /// Melee attack.
    pub fn attack(
        &mut self,
        attacker_id: PlayerId,
        victim_id: PlayerId,
        sequence_id: i64,
        ping_mls: u32,
    ) -> Result<Option<PlayerAttackedState>, GameLogicError> {
        self.perform_attack(
            attacker_id,
            victim_id,
            Weapon::Punch,
            None,
            sequence_id,
            ping_mls,
        )
    }

    /// Hitscan attack with one of the class weapons.
    pub fn attack_weapon(
        &mut self,
        attacker_id: PlayerId,
        victim_id: PlayerId,
        weapon: Weapon,
        sequence_id: i64,
        ping_mls: u32,
    ) -> Result<Option<PlayerAttackedState>, GameLogicError> {
        self.perform_attack(attacker_id, victim_id, weapon, None, sequence_id, ping_mls)
    }

    /// Projectile attack: range is checked to the detonation point and the
    /// damage falls off from there, not from the attacker.
    pub fn attack_projectile(
        &mut self,
        attacker_id: PlayerId,
        victim_id: PlayerId,
        weapon: Weapon,
        detonation: Vec2,
        sequence_id: i64,
        ping_mls: u32,
    ) -> Result<Option<PlayerAttackedState>, GameLogicError> {
        self.perform_attack(
            attacker_id,
            victim_id,
            weapon,
            Some(detonation),
            sequence_id,
            ping_mls,
        )
    }

    fn perform_attack(
        &mut self,
        attacker_id: PlayerId,
        victim_id: PlayerId,
        weapon: Weapon,
        damage_origin: Option<Vec2>,
        sequence_id: i64,
        ping_mls: u32,
    ) -> Result<Option<PlayerAttackedState>, GameLogicError> {
        self.ensure_open()?;
        if attacker_id == victim_id {
            return Err(GameLogicError::new(
                ErrorCode::CanNotAttackYourself,
                format!("player {attacker_id} attacked itself"),
            ));
        }
        {
            let Some(connection) = self.players.connection_mut(attacker_id) else {
                return Ok(None);
            };
            if connection.processed.event_already_processed(sequence_id) {
                return Ok(None);
            }
        }

        let now = Instant::now();
        let profile = self.config.balance.weapon(weapon);
        let damage = {
            let Some(attacker) = self.players.get(attacker_id) else {
                return Ok(None);
            };
            let Some(victim) = self.players.get(victim_id) else {
                return Ok(None);
            };
            if !attacker.is_alive() || !victim.is_alive() {
                return Ok(None);
            }
            if !attacker.has_weapon(weapon) || !attacker.has_ammo(weapon) {
                return Ok(None);
            }
            if victim.is_immortal(now) {
                return Ok(None);
            }

            let attacker_pos = attacker.coordinates.position;
            let victim_pos = victim.coordinates.position;
            let reach_target = damage_origin.unwrap_or(victim_pos);
            if self.anti_cheat.is_attacking_too_far(
                attacker_pos,
                reach_target,
                profile.max_range,
                ping_mls,
            ) {
                return Ok(None);
            }
            let origin = damage_origin.unwrap_or(attacker_pos);
            resolve_damage(attacker, victim, &profile, origin.distance(victim_pos))
        };

        if let Some(attacker) = self.players.get_mut(attacker_id) {
            attacker.consume_ammo(weapon);
        }
        let lethal = {
            let Some(victim) = self.players.get_mut(victim_id) else {
                return Ok(None);
            };
            let lethal = victim.apply_damage(damage);
            if lethal {
                powerup::revert_all(victim);
            }
            lethal
        };

        let mut frag_limit_reached = false;
        if lethal {
            self.players.note_dead(victim_id, now);
            self.buffered_moves.remove(&victim_id);
            if let Some(attacker) = self.players.get_mut(attacker_id) {
                credit_kill(attacker);
                frag_limit_reached = attacker.stats.kills >= self.config.frags_to_win;
            }
        }

        let attacker_snapshot = PlayerSnapshot::from(self.players.require(attacker_id)?);
        let victim_snapshot = PlayerSnapshot::from(self.players.require(victim_id)?);

        let game_over = if frag_limit_reached {
            Some(self.finish_match())
        } else {
            None
        };
        if let Some(connection) = self.players.connection_mut(attacker_id) {
            connection.processed.mark_event_processed(sequence_id);
        }

        let broadcast_state = PlayerAttackedState {
            attacker: attacker_snapshot,
            victim: victim_snapshot,
            weapon,
            damage,
            killed: lethal,
            game_over: None,
        };
        if lethal {
            info!(
                game_id = self.config.game_id,
                attacker = %attacker_id,
                victim = %victim_id,
                ?weapon,
                "kill"
            );
            self.broadcast(GameEvent::Kill(broadcast_state.clone()));
        } else {
            self.broadcast(GameEvent::GetAttacked(broadcast_state.clone()));
        }
        if let Some(over) = &game_over {
            info!(game_id = self.config.game_id, match_id = over.match_id, "match over");
            self.broadcast(GameEvent::GameOver(over.clone()));
        }

        Ok(Some(PlayerAttackedState {
            game_over,
            ..broadcast_state
        }))
    }

    // ------------------------------------------------------------------
    // Power-ups and teleports
    // ------------------------------------------------------------------

    /// Atomically take a power-up and apply its effect. `None` for unknown
    /// or dead players, an already-held or unknown power-up, and claims
    /// from too far away. The caller schedules the revert and respawn
    /// callbacks with the current `match_id`.
    pub fn pickup_power_up(
        &mut self,
        coordinates: Vec2,
        kind: PowerUpType,
        player_id: PlayerId,
        sequence_id: i64,
        ping_mls: u32,
    ) -> Option<PowerUpTakenState> {
        if self.closed || !self.config.power_ups_enabled {
            return None;
        }
        if !self.players.get(player_id).is_some_and(PlayerState::is_alive) {
            return None;
        }
        {
            let connection = self.players.connection_mut(player_id)?;
            if connection.processed.event_already_processed(sequence_id) {
                return None;
            }
        }
        let definition = self.power_ups.definition(kind)?;
        if self
            .anti_cheat
            .is_power_up_too_far(coordinates, definition.location, ping_mls)
        {
            return None;
        }

        let taken = self.power_ups.take(kind, player_id)?;
        let now = Instant::now();
        let player = self.players.get_mut(player_id)?;
        kind.apply(player, now + Duration::from_millis(taken.lasts_for_mls));

        if let Some(connection) = self.players.connection_mut(player_id) {
            connection.processed.mark_event_processed(sequence_id);
        }
        let snapshot = PlayerSnapshot::from(self.players.get(player_id)?);
        let state = PowerUpTakenState {
            player: snapshot,
            power_up: taken,
        };
        debug!(game_id = self.config.game_id, player = %player_id, ?kind, "power-up taken");
        self.broadcast(GameEvent::PowerUpTaken(state.clone()));
        Some(state)
    }

    /// Timer callback: undo a timed power-up effect on its holder. A no-op
    /// when the match was reset or the room closed since the take.
    pub fn revert_power_up(&mut self, kind: PowerUpType, match_epoch: u64) {
        if self.closed || match_epoch != self.match_id {
            return;
        }
        if let Some(holder) = self.power_ups.mark_reverted(kind) {
            if let Some(player) = self.players.get_mut(holder) {
                kind.revert(player);
            }
        }
    }

    /// Timer callback: return a power-up to the map. A no-op when the match
    /// was reset or the room closed since the take.
    pub fn respawn_power_up(
        &mut self,
        kind: PowerUpType,
        match_epoch: u64,
    ) -> Option<PowerUpSpawnedState> {
        if self.closed || match_epoch != self.match_id {
            return None;
        }
        let power_up = self.power_ups.release(kind)?;
        let state = PowerUpSpawnedState { power_up };
        self.broadcast(GameEvent::PowerUpSpawned(state));
        Some(state)
    }

    /// Relocate a player through a teleport pad. The jump is exempt from
    /// the next speed-check delta.
    pub fn teleport(
        &mut self,
        player_id: PlayerId,
        coordinates: Vec2,
        teleport_id: TeleportId,
        sequence_id: i64,
        ping_mls: u32,
    ) -> Result<TeleportedState, GameLogicError> {
        self.ensure_open()?;
        if !self.config.teleports_enabled {
            return Err(GameLogicError::common("teleports are disabled in this room"));
        }
        if !self.players.get(player_id).is_some_and(PlayerState::is_alive) {
            return Err(GameLogicError::common(format!(
                "no live player with id {player_id}"
            )));
        }
        {
            let Some(connection) = self.players.connection_mut(player_id) else {
                return Err(GameLogicError::player_does_not_exist(player_id.0));
            };
            if connection.processed.event_already_processed(sequence_id) {
                return Err(GameLogicError::common("duplicate teleport command"));
            }
        }
        let Some(pad) = self.teleports.get(teleport_id).copied() else {
            return Err(GameLogicError::common(format!(
                "no teleport with id {teleport_id}"
            )));
        };
        if self
            .anti_cheat
            .is_teleport_too_far(coordinates, pad.location, ping_mls)
        {
            return Err(GameLogicError::cheating(format!(
                "player {player_id} is too far from teleport {teleport_id}"
            )));
        }
        let destination = self
            .teleports
            .destination(teleport_id)
            .ok_or_else(|| GameLogicError::common("teleport has no destination"))?;

        let now = Instant::now();
        if let Some(player) = self.players.get_mut(player_id) {
            player.coordinates = destination;
        }
        self.speed_monitor
            .reset(player_id, destination.position, now);
        self.buffered_moves.remove(&player_id);
        if let Some(connection) = self.players.connection_mut(player_id) {
            connection.processed.mark_event_processed(sequence_id);
        }

        let state = TeleportedState {
            player_id,
            coordinates: destination,
        };
        self.broadcast(GameEvent::Teleported(state.clone()));
        Ok(state)
    }

    // ------------------------------------------------------------------
    // Delivery
    // ------------------------------------------------------------------

    /// Confirm delivery of an outbound event to one player.
    pub fn ack_event(&mut self, player_id: PlayerId, event_id: i64) -> bool {
        self.players
            .connection_mut(player_id)
            .is_some_and(|connection| connection.acks.ack_received(event_id).is_some())
    }

    /// Shut the room down: notify and drop every channel, clear all state.
    /// Idempotent; pending timer callbacks become no-ops.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.match_id += 1;
        let ids: Vec<PlayerId> = self.players.players().map(|p| p.id).collect();
        for player_id in ids {
            if let Some(entry) = self.players.remove(player_id) {
                entry.connection.notify_disconnect();
            }
        }
        self.power_ups.reset();
        self.speed_monitor.clear();
        self.buffered_moves.clear();
        info!(game_id = self.config.game_id, "room closed");
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn ensure_open(&self) -> Result<(), GameLogicError> {
        if self.closed {
            return Err(GameLogicError::new(
                ErrorCode::NotExistingGameRoom,
                format!("game room {} is closed", self.config.game_id),
            ));
        }
        Ok(())
    }

    fn fresh_player_id(&mut self) -> PlayerId {
        self.next_player_id += 1;
        PlayerId(self.next_player_id)
    }

    fn select_spawn(&self) -> Coordinates {
        let players: Vec<&PlayerState> = self.players.players().collect();
        self.spawner.select_spawn(&self.map.spawn_points, &players)
    }

    /// Registry removal plus the per-player side tables. No events.
    fn drop_entry(&mut self, player_id: PlayerId) -> bool {
        let Some(mut entry) = self.players.remove(player_id) else {
            return false;
        };
        entry.state.status = PlayerStatus::Exited;
        entry.connection.notify_disconnect();
        self.speed_monitor.forget(&player_id);
        self.buffered_moves.remove(&player_id);
        true
    }

    /// End the match: snapshot the standings, bump the epoch, reset every
    /// player and power-up.
    fn finish_match(&mut self) -> GameOverState {
        let over = GameOverState {
            match_id: self.match_id,
            leaderboard: self.players.leaderboard(),
        };
        self.match_id += 1;
        for player in self.players.players_mut() {
            player.reset_match_state();
        }
        self.power_ups.reset();
        self.speed_monitor.clear();
        self.buffered_moves.clear();
        over
    }

    /// Deliver an event to every recipient the filter admits. Returns the
    /// players whose ack storage overflowed.
    fn fan_out(
        &mut self,
        event: GameEvent,
        mut include: impl FnMut(&PlayerState) -> bool,
    ) -> Vec<PlayerId> {
        let event_id = self.events.next();
        let mut overwhelmed = Vec::new();
        for entry in self.players.entries_mut() {
            if !include(&entry.state) {
                continue;
            }
            if let Err(err) = entry.connection.deliver(event_id, &event) {
                warn!(player = %entry.state.id, %err, "recipient over ack capacity");
                overwhelmed.push(entry.state.id);
            }
        }
        overwhelmed
    }

    fn broadcast(&mut self, event: GameEvent) {
        let overwhelmed = self.fan_out(event, |_| true);
        self.shed_overwhelmed(overwhelmed);
    }

    fn broadcast_filtered(&mut self, event: GameEvent, include: impl FnMut(&PlayerState) -> bool) {
        let overwhelmed = self.fan_out(event, include);
        self.shed_overwhelmed(overwhelmed);
    }

    /// Disconnect players that could not keep up with ack-required events.
    /// Each iteration removes a player, so the worklist terminates.
    fn shed_overwhelmed(&mut self, mut overwhelmed: Vec<PlayerId>) {
        while let Some(player_id) = overwhelmed.pop() {
            if !self.drop_entry(player_id) {
                continue;
            }
            warn!(game_id = self.config.game_id, player = %player_id, "shedding overwhelmed connection");
            overwhelmed.extend(
                self.fan_out(GameEvent::PlayerLeft { player_id }, |_| true),
            );
        }
    }
}
