//! Player Registry
//!
//! The room's player table: simulation state plus the delivery channels of
//! every connected player, keyed by [`PlayerId`]. Enforces the capacity and
//! name-uniqueness rules at insertion so callers cannot end up with a
//! half-admitted player.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::game::error::{ErrorCode, GameLogicError};
use crate::game::events::LeaderboardEntry;
use crate::game::player::{PlayerId, PlayerState, PlayerStatus};
use crate::net::channel::PlayerConnection;

/// One registry row.
pub struct PlayerEntry {
    /// Simulation state.
    pub state: PlayerState,
    /// Delivery channels and reliability bookkeeping.
    pub connection: PlayerConnection,
    /// When the player died, for the idle-removal path.
    dead_since: Option<Instant>,
}

/// Players of one room.
pub struct PlayerRegistry {
    entries: BTreeMap<PlayerId, PlayerEntry>,
    max_players: usize,
}

impl PlayerRegistry {
    /// Empty registry with a capacity bound.
    pub fn new(max_players: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            max_players,
        }
    }

    /// Admit a player. A taken name wins over a full room: `PlayerExists`
    /// is reported before `ServerFull`.
    pub fn insert(
        &mut self,
        state: PlayerState,
        connection: PlayerConnection,
    ) -> Result<(), GameLogicError> {
        if self.name_taken(&state.name) {
            return Err(GameLogicError::new(
                ErrorCode::PlayerExists,
                format!("name already taken: {}", state.name),
            ));
        }
        if self.entries.len() >= self.max_players {
            return Err(GameLogicError::new(
                ErrorCode::ServerFull,
                format!("room is full: {} players", self.max_players),
            ));
        }
        self.entries.insert(
            state.id,
            PlayerEntry {
                state,
                connection,
                dead_since: None,
            },
        );
        Ok(())
    }

    /// Re-admit an existing player under a fresh id (respawn). Skips the
    /// capacity and name checks; the entry never left the registry.
    pub fn reinsert(&mut self, state: PlayerState, connection: PlayerConnection) {
        self.entries.insert(
            state.id,
            PlayerEntry {
                state,
                connection,
                dead_since: None,
            },
        );
    }

    /// Remove a player entirely.
    pub fn remove(&mut self, player_id: PlayerId) -> Option<PlayerEntry> {
        self.entries.remove(&player_id)
    }

    /// Whether a non-exited player already uses this name.
    pub fn name_taken(&self, name: &str) -> bool {
        self.entries
            .values()
            .any(|entry| entry.state.status != PlayerStatus::Exited && entry.state.name == name)
    }

    /// State of one player, if present.
    pub fn get(&self, player_id: PlayerId) -> Option<&PlayerState> {
        self.entries.get(&player_id).map(|entry| &entry.state)
    }

    /// Mutable state of one player, if present.
    pub fn get_mut(&mut self, player_id: PlayerId) -> Option<&mut PlayerState> {
        self.entries
            .get_mut(&player_id)
            .map(|entry| &mut entry.state)
    }

    /// State lookup that maps absence to `PLAYER_DOES_NOT_EXIST`.
    pub fn require(&self, player_id: PlayerId) -> Result<&PlayerState, GameLogicError> {
        self.get(player_id)
            .ok_or_else(|| GameLogicError::player_does_not_exist(player_id.0))
    }

    /// Mutable variant of [`Self::require`].
    pub fn require_mut(&mut self, player_id: PlayerId) -> Result<&mut PlayerState, GameLogicError> {
        self.entries
            .get_mut(&player_id)
            .map(|entry| &mut entry.state)
            .ok_or_else(|| GameLogicError::player_does_not_exist(player_id.0))
    }

    /// Connection of one player, if present.
    pub fn connection(&self, player_id: PlayerId) -> Option<&PlayerConnection> {
        self.entries.get(&player_id).map(|entry| &entry.connection)
    }

    /// Mutable connection of one player, if present.
    pub fn connection_mut(&mut self, player_id: PlayerId) -> Option<&mut PlayerConnection> {
        self.entries
            .get_mut(&player_id)
            .map(|entry| &mut entry.connection)
    }

    /// Both the state and the connection of one player, mutably.
    pub fn entry_mut(&mut self, player_id: PlayerId) -> Option<&mut PlayerEntry> {
        self.entries.get_mut(&player_id)
    }

    /// All player states, exited ones included.
    pub fn players(&self) -> impl Iterator<Item = &PlayerState> {
        self.entries.values().map(|entry| &entry.state)
    }

    /// Mutable iterator over all player states.
    pub fn players_mut(&mut self) -> impl Iterator<Item = &mut PlayerState> {
        self.entries.values_mut().map(|entry| &mut entry.state)
    }

    /// All entries.
    pub fn entries(&self) -> impl Iterator<Item = &PlayerEntry> {
        self.entries.values()
    }

    /// Mutable iterator over all entries.
    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut PlayerEntry> {
        self.entries.values_mut()
    }

    /// Number of entries, exited ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record the death time for idle tracking.
    pub fn note_dead(&mut self, player_id: PlayerId, now: Instant) {
        if let Some(entry) = self.entries.get_mut(&player_id) {
            entry.dead_since = Some(now);
        }
    }

    /// Dead players that have sat unrespawned longer than `timeout`.
    pub fn idle_dead(&self, now: Instant, timeout: Duration) -> Vec<PlayerId> {
        self.entries
            .values()
            .filter(|entry| entry.state.status == PlayerStatus::Dead)
            .filter(|entry| {
                entry
                    .dead_since
                    .is_some_and(|since| now.duration_since(since) >= timeout)
            })
            .map(|entry| entry.state.id)
            .collect()
    }

    /// Standings: kills descending, then deaths ascending, then id.
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let mut rows: Vec<LeaderboardEntry> = self
            .entries
            .values()
            .filter(|entry| entry.state.status != PlayerStatus::Exited)
            .map(|entry| LeaderboardEntry {
                player_id: entry.state.id,
                name: entry.state.name.clone(),
                kills: entry.state.stats.kills,
                deaths: entry.state.stats.deaths,
            })
            .collect();
        rows.sort_by(|a, b| {
            b.kills
                .cmp(&a.kills)
                .then(a.deaths.cmp(&b.deaths))
                .then(a.player_id.cmp(&b.player_id))
        });
        rows
    }
}
