//! Operation Results and Outbound Events
//!
//! Every room operation returns an immutable result describing what
//! happened; the caller fans it out to observers as [`GameEvent`]s. The
//! room itself never touches a socket.

use serde::{Deserialize, Serialize};

use crate::core::geom::Coordinates;
use crate::game::player::{GameStats, PlayerId, PlayerState, PlayerStatus, RpgClass};
use crate::game::powerup::PowerUp;
use crate::game::teleport::Teleport;
use crate::game::weapon::Weapon;

/// Immutable view of a player, safe to hand to the transport layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// Player id.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Color index.
    pub color: u8,
    /// Last accepted coordinates.
    pub coordinates: Coordinates,
    /// Current health.
    pub health: u32,
    /// Class.
    pub rpg_class: RpgClass,
    /// Lifecycle status.
    pub status: PlayerStatus,
    /// Kill/death counters.
    pub stats: GameStats,
}

impl From<&PlayerState> for PlayerSnapshot {
    fn from(player: &PlayerState) -> Self {
        Self {
            id: player.id,
            name: player.name.clone(),
            color: player.color,
            coordinates: player.coordinates,
            health: player.health,
            rpg_class: player.rpg_class,
            status: player.status,
            stats: player.stats,
        }
    }
}

/// One row of the room leaderboard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// Player id.
    pub player_id: PlayerId,
    /// Display name.
    pub name: String,
    /// Frags.
    pub kills: u32,
    /// Deaths.
    pub deaths: u32,
}

/// Final state of a finished match.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameOverState {
    /// The match that just ended.
    pub match_id: u64,
    /// Winner first.
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// Result of a successful join.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayerJoinedState {
    /// The new player.
    pub player: PlayerSnapshot,
    /// Current standings for the observer.
    pub leaderboard: Vec<LeaderboardEntry>,
    /// Power-ups currently on the map.
    pub available_power_ups: Vec<PowerUp>,
    /// Teleport pads of the map.
    pub teleports: Vec<Teleport>,
}

/// Result of an accepted (buffered) move.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerMovedState {
    /// Who moved.
    pub player_id: PlayerId,
    /// Where to.
    pub coordinates: Coordinates,
}

/// Result of a landed attack.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayerAttackedState {
    /// Attacker after the hit (vampire boost applied on kills).
    pub attacker: PlayerSnapshot,
    /// Victim after the hit.
    pub victim: PlayerSnapshot,
    /// Weapon used.
    pub weapon: Weapon,
    /// Damage dealt.
    pub damage: u32,
    /// True when the hit was lethal: fan out as a KILL event instead of
    /// GET_ATTACKED.
    pub killed: bool,
    /// Present when this kill reached the frag limit.
    pub game_over: Option<GameOverState>,
}

/// Result of a successful power-up pickup.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PowerUpTakenState {
    /// Holder after the effect was applied.
    pub player: PlayerSnapshot,
    /// What was taken.
    pub power_up: PowerUp,
}

/// A power-up returned to the map.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PowerUpSpawnedState {
    /// What respawned.
    pub power_up: PowerUp,
}

/// Result of a teleport.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeleportedState {
    /// Who teleported.
    pub player_id: PlayerId,
    /// Destination.
    pub coordinates: Coordinates,
}

/// Result of a respawn.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayerRespawnedState {
    /// The player under its fresh id.
    pub player: PlayerSnapshot,
    /// The id the player had before this respawn.
    pub previous_player_id: PlayerId,
    /// Power-ups currently on the map (held ones excluded).
    pub available_power_ups: Vec<PowerUp>,
}

/// Outbound event fanned out to room observers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum GameEvent {
    /// A player joined the room.
    PlayerJoined(PlayerSnapshot),
    /// A buffered move, flushed on the broadcast tick.
    Move(PlayerMovedState),
    /// Somebody was hit but survived.
    GetAttacked(PlayerAttackedState),
    /// Somebody was killed.
    Kill(PlayerAttackedState),
    /// A power-up was taken off the map.
    PowerUpTaken(PowerUpTakenState),
    /// A power-up respawned.
    PowerUpSpawned(PowerUpSpawnedState),
    /// A player teleported.
    Teleported(TeleportedState),
    /// A player respawned.
    Respawned(PlayerRespawnedState),
    /// The match ended.
    GameOver(GameOverState),
    /// A player left the room.
    PlayerLeft {
        /// Who left.
        player_id: PlayerId,
    },
    /// The room is closing this connection.
    Disconnect,
}

impl GameEvent {
    /// The player this event is about, when there is one.
    pub fn subject(&self) -> Option<PlayerId> {
        match self {
            GameEvent::PlayerJoined(snapshot) => Some(snapshot.id),
            GameEvent::Move(state) => Some(state.player_id),
            GameEvent::GetAttacked(state) | GameEvent::Kill(state) => Some(state.victim.id),
            GameEvent::PowerUpTaken(state) => Some(state.player.id),
            GameEvent::Teleported(state) => Some(state.player_id),
            GameEvent::Respawned(state) => Some(state.player.id),
            GameEvent::PlayerLeft { player_id } => Some(*player_id),
            GameEvent::PowerUpSpawned(_) | GameEvent::GameOver(_) | GameEvent::Disconnect => None,
        }
    }
}

/// An event stamped with the recipient's per-channel ordering number.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SequencedEvent {
    /// Room-wide event id. The client echoes it back to acknowledge a
    /// state event. Negative when the event is never ack-tracked.
    pub event_id: i64,
    /// Per-recipient ordering number.
    pub order: u64,
    /// The event.
    pub event: GameEvent,
}
