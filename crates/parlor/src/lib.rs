//! # Parlor
//!
//! A session engine for multi-player, turn-based web games.
//!
//! A game is a chain of [stages](parlor_session::Stage). Players join a
//! session by its four-letter code, the active stage consumes their
//! events one at a time, and answers reach each player through a bounded
//! mailbox. This crate puts a WebSocket front end on top: clients list
//! games, create sessions, join them, and send actions as JSON.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use parlor::prelude::*;
//!
//! fn lobby() -> Box<dyn Stage> {
//!     Box::new(JoinStage::new(2, 4, |_players| lobby()))
//! }
//!
//! # async fn start() -> Result<(), ParlorError> {
//! let catalog = Arc::new(GameCatalog::new().with("Lobby", lobby)?);
//! let server = ParlorServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build(catalog)
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::ParlorError;
pub use server::{DEFAULT_IDLE_TIMEOUT, ParlorServer, ParlorServerBuilder};

use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Everything a game or server binary usually needs.
pub mod prelude {
    pub use crate::{ParlorError, ParlorServer, ParlorServerBuilder, init_tracing};
    pub use parlor_player::{Player, PlayerSummary};
    pub use parlor_protocol::{
        ClientRequest, EventType, PlayerId, ServerEvent, ServerMessage, SessionCode,
    };
    pub use parlor_session::{
        BoxFuture, EngineConfig, GameCatalog, JoinStage, PlayerEvent, Session, SessionError,
        SessionRegistry, SessionStatus, Stage, StageContext, StageError, StageResult, Started,
        Transition,
    };
}
