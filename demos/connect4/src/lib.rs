//! Connect 4 for two players, built on Parlor stages.
//!
//! A session starts in a [`JoinStage`] that takes exactly two players;
//! `START` hands them to [`MainStage`], where red (the first to join)
//! moves first.

pub mod board;
pub mod events;
pub mod stage;

pub use board::{Board, BoardError, GameResult, Piece};
pub use stage::MainStage;

use parlor_session::{CatalogError, GameCatalog, JoinStage, Stage};

/// Name the game is registered under.
pub const GAME_NAME: &str = "Connect4";

/// The initial stage of a fresh Connect 4 session.
pub fn connect4() -> Box<dyn Stage> {
    Box::new(JoinStage::new(2, 2, |players| Box::new(MainStage::new(players))))
}

/// Adds Connect 4 to `catalog`.
pub fn register(catalog: &GameCatalog) -> Result<(), CatalogError> {
    catalog.register(GAME_NAME, connect4)
}
