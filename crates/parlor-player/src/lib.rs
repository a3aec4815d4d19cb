//! Player identity for Parlor.
//!
//! A [`Player`] is created exactly once per participant, together with
//! its [`Mailbox`]: the bounded queue of server events addressed to that
//! player. Stages hold cheap clones of the `Player`; the connection that
//! serves the participant holds the one and only `Mailbox`.
//!
//! Ids come from a [`PlayerDirectory`], the hook where a deployment plugs
//! in whatever store it uses for players.
//!
//! ```text
//! Session Layer (above)  ← rosters of players, broadcasts into mailboxes
//!     ↕
//! Player Layer (this crate)  ← identity, mailbox, directory
//!     ↕
//! Protocol Layer (below)  ← PlayerId, ServerEvent
//! ```

#![allow(async_fn_in_trait)]

mod directory;
mod error;
mod player;

pub use directory::{DirectoryConfig, InMemoryDirectory, PlayerDirectory};
pub use error::PlayerError;
pub use player::{DEFAULT_MAILBOX_CAPACITY, Mailbox, Player, PlayerSummary};
