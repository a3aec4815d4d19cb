//! The Parlor session engine.
//!
//! A session is one running game: a code players use to find it, a
//! roster, one inbound event queue, and the stage currently in charge.
//! Stages are the game's rules; the engine only runs them, one after
//! another, and routes events in and out.
//!
//! # Key types
//!
//! - [`Stage`]: the trait game rules implement
//! - [`JoinStage`]: ready-made lobby with player limits
//! - [`Session`]: handle to a running session
//! - [`SessionRegistry`]: creates sessions, finds them by code
//! - [`GameCatalog`]: which games exist
//! - [`broadcast`]: one event to many players, never blocking
//!
//! ```text
//! client ──PlayerEvent──→ Session queue ──→ active Stage ──ServerEvent──→ mailboxes
//! ```

mod broadcast;
mod catalog;
mod config;
mod error;
mod event;
mod join;
mod registry;
mod session;
mod stage;

pub use broadcast::{Delivery, broadcast};
pub use catalog::{Game, GameCatalog};
pub use config::{EngineConfig, SessionStatus};
pub use error::{CatalogError, SessionError, StageError};
pub use event::{EventQueue, EventSender, PlayerEvent, event_queue};
pub use join::{JoinStage, StartFn, Started};
pub use registry::{CodeSource, Joined, RandomCodes, SessionRegistry};
pub use session::{Session, SessionInfo};
pub use stage::{Stage, StageContext, StageResult, Transition};

/// Re-exported so stage implementations can name their return type.
pub use futures_util::future::BoxFuture;
