//! The main Connect 4 stage: two players alternate dropping pieces until
//! one connects four or the board fills up.

use parlor_player::Player;
use parlor_protocol::ServerEvent;
use parlor_session::{BoxFuture, PlayerEvent, Stage, StageContext, StageError, StageResult, Transition};

use crate::board::{Board, GameResult, Piece};
use crate::events::{
    DID_DRAW, DID_DROP_PIECE, DID_WIN, DROP_PIECE, DidDraw, DidDropPiece, DidWin, DropPiece,
    PLAYER_TURN, PlayerTurn,
};

/// What a single event did to the game.
enum Step {
    /// Keep waiting for moves.
    Continue,
    /// The game is over.
    Over,
}

/// Red is the first player in the roster and moves first; black is the
/// second.
pub struct MainStage {
    players: Vec<Player>,
    active: usize,
    board: Board,
}

impl MainStage {
    pub const NAME: &'static str = "connect4";

    /// A fresh game between `players`, which must hold exactly two.
    pub fn new(players: Vec<Player>) -> Self {
        Self {
            players,
            active: 0,
            board: Board::new(),
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    fn active_player(&self) -> &Player {
        &self.players[self.active]
    }

    fn piece_of(&self, player: &Player) -> Option<Piece> {
        match self.players.iter().position(|p| p == player)? {
            0 => Some(Piece::Red),
            _ => Some(Piece::Black),
        }
    }

    fn announce_turn(&self, ctx: &StageContext) -> Result<(), StageError> {
        let turn = PlayerTurn {
            player: self.active_player().summary(),
        };
        ctx.broadcast(&ServerEvent::with_payload(PLAYER_TURN, &turn)?);
        Ok(())
    }

    fn handle(&mut self, ctx: &StageContext, event: &PlayerEvent) -> Result<Step, StageError> {
        let player = event.sender();

        let Some(piece) = self.piece_of(player) else {
            ctx.reject(player, format!("unknown player: {}", player.name()));
            return Ok(Step::Continue);
        };
        if !event.is(&DROP_PIECE) {
            ctx.reject(player, format!("unexpected event \"{}\"", event.kind()));
            return Ok(Step::Continue);
        }
        if player != self.active_player() {
            ctx.reject(
                player,
                format!(
                    "player attempted to drop piece when not their turn: {}",
                    player.name()
                ),
            );
            return Ok(Step::Continue);
        }
        let slot = match event.payload_as::<DropPiece>() {
            Ok(request) => request.slot,
            Err(e) => {
                ctx.reject(player, format!("invalid DROP_PIECE payload: {e}"));
                return Ok(Step::Continue);
            }
        };
        let row = match self.board.drop_piece(piece, slot) {
            Ok(row) => row,
            Err(e) => {
                ctx.reject(player, e);
                return Ok(Step::Continue);
            }
        };

        tracing::debug!(code = %ctx.code(), player_id = %player.id(), slot, row, "piece dropped");
        ctx.broadcast(&ServerEvent::with_payload(
            DID_DROP_PIECE,
            &DidDropPiece { piece, slot, row },
        )?);

        if self.board.analyze_move(slot, row) == GameResult::Won {
            tracing::info!(code = %ctx.code(), player_id = %player.id(), "game won");
            let won = DidWin {
                winner: player.summary(),
                board: self.board.clone(),
            };
            ctx.broadcast(&ServerEvent::with_payload(DID_WIN, &won)?);
            return Ok(Step::Over);
        }
        if self.board.is_full() {
            tracing::info!(code = %ctx.code(), "game drawn");
            let drawn = DidDraw {
                board: self.board.clone(),
            };
            ctx.broadcast(&ServerEvent::with_payload(DID_DRAW, &drawn)?);
            return Ok(Step::Over);
        }

        self.active = (self.active + 1) % self.players.len();
        self.announce_turn(ctx)?;
        Ok(Step::Continue)
    }
}

impl Stage for MainStage {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run<'a>(mut self: Box<Self>, ctx: &'a mut StageContext) -> BoxFuture<'a, StageResult> {
        Box::pin(async move {
            if self.players.len() != 2 {
                return Err(StageError::contract(
                    Self::NAME,
                    format!("needs exactly 2 players, got {}", self.players.len()),
                ));
            }

            self.announce_turn(ctx)?;
            while let Some(event) = ctx.next_event().await {
                if let Step::Over = self.handle(ctx, &event)? {
                    return Ok(Transition::End);
                }
            }
            Ok(Transition::End)
        })
    }
}
