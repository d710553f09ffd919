//! Game Logic Errors
//!
//! The typed error surface of the room engine. Codes are machine-checkable
//! so the transport layer can decide between replying with an error event
//! and dropping the connection.

use serde::{Deserialize, Serialize};

/// Machine-checkable error code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// A connected player with this name already exists in the room.
    PlayerExists,
    /// The room is at capacity.
    ServerFull,
    /// The client claimed something physically impossible. Fatal for the
    /// connection.
    Cheating,
    /// No player with this id in the room.
    PlayerDoesNotExist,
    /// Generic state error (name the operation in the message).
    CommonError,
    /// Self-attack. Protocol violation, fatal for the connection.
    CanNotAttackYourself,
    /// No room with this game id.
    NotExistingGameRoom,
}

impl ErrorCode {
    /// Whether the offending connection must be disconnected.
    pub fn is_fatal(self) -> bool {
        matches!(self, ErrorCode::Cheating | ErrorCode::CanNotAttackYourself)
    }
}

/// Error returned by room operations.
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
#[error("{code:?}: {message}")]
pub struct GameLogicError {
    /// Machine-checkable code.
    pub code: ErrorCode,
    /// Human-readable context.
    pub message: String,
}

impl GameLogicError {
    /// Create an error with a code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Shorthand for [`ErrorCode::Cheating`].
    pub fn cheating(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Cheating, message)
    }

    /// Shorthand for [`ErrorCode::CommonError`].
    pub fn common(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::CommonError, message)
    }

    /// Shorthand for [`ErrorCode::PlayerDoesNotExist`].
    pub fn player_does_not_exist(player_id: u64) -> Self {
        Self::new(
            ErrorCode::PlayerDoesNotExist,
            format!("no player with id {player_id}"),
        )
    }
}
