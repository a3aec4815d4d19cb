//! Error types for the session layer.
//!
//! Three kinds of failure:
//!
//! - [`SessionError`]: a caller asked for something that can't be done
//!   (unknown game, unknown code, session already over). Returned to
//!   that caller; no session is harmed.
//! - [`CatalogError`]: the game catalog was configured wrongly. Surfaces
//!   at startup.
//! - [`StageError`]: a stage broke its contract. Fatal to its session
//!   and to nothing else.

use parlor_player::PlayerError;
use parlor_protocol::{ProtocolError, SessionCode};

/// Errors returned by registry and session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No game is registered under this name.
    #[error("failed to create session, unknown game: {0}")]
    UnknownGame(String),

    /// No live session uses this code.
    #[error("could not find session with code \"{0}\"")]
    NotFound(SessionCode),

    /// The session's execution loop has already exited.
    #[error("session {0} has ended")]
    Ended(SessionCode),

    /// The player directory refused the join.
    #[error(transparent)]
    Player(#[from] PlayerError),

    /// A code could not be produced or parsed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Errors raised while building the game catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Two games were registered under the same name.
    #[error("a game is already registered with the name {0}")]
    Duplicate(String),

    /// Games need a non-blank name.
    #[error("game name must not be empty")]
    EmptyName,
}

/// A stage violated the stage contract.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// The stage reached a state its own rules say is impossible.
    #[error("stage {stage} violated its contract: {reason}")]
    Contract { stage: String, reason: String },

    /// The stage panicked while running.
    #[error("stage {0} panicked")]
    Panicked(String),

    /// The stage could not encode an event it meant to send.
    #[error("stage failed to encode an event: {0}")]
    Encode(#[from] ProtocolError),
}

impl StageError {
    /// Shorthand for [`StageError::Contract`].
    pub fn contract(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Contract {
            stage: stage.into(),
            reason: reason.into(),
        }
    }
}
