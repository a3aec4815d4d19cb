//! Wire protocol for Parlor.
//!
//! This crate defines the vocabulary shared by every other layer:
//!
//! - **Identifiers** ([`PlayerId`], [`SessionId`], [`SessionCode`]).
//! - **Events** ([`EventType`], [`ServerEvent`]): what stages send to
//!   players. The player-side event lives with the session engine
//!   because it carries the sending player.
//! - **Wire messages** ([`ClientRequest`], [`ServerMessage`]).
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]).
//! - **Errors** ([`ProtocolError`]).
//!
//! Nothing here knows about connections or sessions.

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    ClientRequest, EventType, PlayerId, SESSION_CODE_LEN, SESSION_CODE_SPACE,
    ServerEvent, ServerMessage, SessionCode, SessionId,
};
