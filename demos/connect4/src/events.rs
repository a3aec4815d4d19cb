//! Connect 4 event tags and payloads.
//!
//! | Tag              | Direction | Payload                           |
//! |------------------|-----------|-----------------------------------|
//! | `PLAYER_TURN`    | server    | [`PlayerTurn`]                    |
//! | `DROP_PIECE`     | client    | [`DropPiece`]                     |
//! | `DID_DROP_PIECE` | server    | [`DidDropPiece`]                  |
//! | `DID_WIN`        | server    | [`DidWin`]                        |
//! | `DID_DRAW`       | server    | [`DidDraw`]                       |

use parlor_player::PlayerSummary;
use parlor_protocol::EventType;
use serde::{Deserialize, Serialize};

use crate::board::{Board, Piece};

pub const PLAYER_TURN: EventType = EventType::from_static("PLAYER_TURN");
pub const DROP_PIECE: EventType = EventType::from_static("DROP_PIECE");
pub const DID_DROP_PIECE: EventType = EventType::from_static("DID_DROP_PIECE");
pub const DID_WIN: EventType = EventType::from_static("DID_WIN");
pub const DID_DRAW: EventType = EventType::from_static("DID_DRAW");

/// Whose move it is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerTurn {
    pub player: PlayerSummary,
}

/// A move request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropPiece {
    pub slot: usize,
}

/// Where a piece landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DidDropPiece {
    pub piece: Piece,
    pub slot: usize,
    pub row: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DidWin {
    pub winner: PlayerSummary,
    pub board: Board,
}

/// The board filled up with no winner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DidDraw {
    pub board: Board,
}
