//! The stage protocol.
//!
//! A game is a chain of stages: a lobby, the play itself, maybe a
//! scoreboard. The engine runs one stage at a time. A stage pulls events
//! from the session's queue for as long as it likes and then hands
//! control to its successor, or ends the session.
//!
//! ```text
//! JoinStage ──Next──→ MainStage ──Next──→ ... ──End──→ (loop exits)
//! ```
//!
//! Stages are consumed when they run (`self: Box<Self>`), so a stage
//! instance can never be resumed after it has handed off.

use std::fmt;

use futures_util::future::BoxFuture;
use parlor_player::{Player, PlayerError};
use parlor_protocol::{ServerEvent, SessionCode};
use tokio::sync::watch;

use crate::broadcast::{Delivery, broadcast};
use crate::event::{EventQueue, PlayerEvent};
use crate::{SessionInfo, SessionStatus, StageError};

/// What a stage yields when it stops running.
pub type StageResult = Result<Transition, StageError>;

/// A stage's successor.
pub enum Transition {
    /// Run this stage next, against the same queue and roster.
    Next(Box<dyn Stage>),
    /// Stop the session.
    End,
}

impl Transition {
    /// Boxes `stage` as the successor.
    pub fn next(stage: impl Stage) -> Self {
        Self::Next(Box::new(stage))
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Next(stage) => f.debug_tuple("Next").field(&stage.name()).finish(),
            Self::End => f.write_str("End"),
        }
    }
}

/// One phase of a game's rules.
///
/// Implementations usually loop on [`StageContext::next_event`],
/// answering bad events with [`StageContext::reject`], until they are
/// ready to hand off. There is no engine timeout: a stage that never
/// returns keeps its session open.
///
/// Returning `Err` means the stage broke its own contract. The session
/// is marked failed and stops; other sessions are unaffected.
///
/// ```rust
/// use parlor_session::{BoxFuture, Stage, StageContext, StageResult, Transition};
///
/// /// Ends the session on the first event it sees.
/// struct OneShot;
///
/// impl Stage for OneShot {
///     fn name(&self) -> &str {
///         "one-shot"
///     }
///
///     fn run<'a>(self: Box<Self>, ctx: &'a mut StageContext) -> BoxFuture<'a, StageResult> {
///         Box::pin(async move {
///             let _ = ctx.next_event().await;
///             Ok(Transition::End)
///         })
///     }
/// }
/// ```
pub trait Stage: Send + 'static {
    /// A short name for logs and session info.
    fn name(&self) -> &str;

    /// Runs the stage until it hands off.
    fn run<'a>(self: Box<Self>, ctx: &'a mut StageContext) -> BoxFuture<'a, StageResult>;
}

impl Stage for Box<dyn Stage> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn run<'a>(self: Box<Self>, ctx: &'a mut StageContext) -> BoxFuture<'a, StageResult> {
        <dyn Stage as Stage>::run(*self, ctx)
    }
}

// ---------------------------------------------------------------------------
// StageContext
// ---------------------------------------------------------------------------

/// Everything a running stage can touch: the session's inbound queue and
/// its roster.
///
/// Owned by the session task and lent to one stage at a time, so stages
/// read and grow the roster without locking.
pub struct StageContext {
    code: SessionCode,
    events: EventQueue,
    roster: Vec<Player>,
    info: watch::Sender<SessionInfo>,
}

impl StageContext {
    /// Creates a context that is not attached to a registered session.
    ///
    /// Lets a stage be driven directly, as tests do.
    pub fn new(code: SessionCode, events: EventQueue) -> Self {
        let (info, _) = watch::channel(SessionInfo::detached(code.clone()));
        Self::with_info(code, events, info)
    }

    pub(crate) fn with_info(
        code: SessionCode,
        events: EventQueue,
        info: watch::Sender<SessionInfo>,
    ) -> Self {
        Self {
            code,
            events,
            roster: Vec::new(),
            info,
        }
    }

    /// The code of the session this context belongs to.
    pub fn code(&self) -> &SessionCode {
        &self.code
    }

    /// Waits for the next player event. `None` once every producer of
    /// the session's queue is gone.
    pub async fn next_event(&mut self) -> Option<PlayerEvent> {
        self.events.next().await
    }

    /// The players admitted so far, in join order.
    pub fn roster(&self) -> &[Player] {
        &self.roster
    }

    /// Returns `true` if `player` has been admitted.
    pub fn is_member(&self, player: &Player) -> bool {
        self.roster.contains(player)
    }

    /// Appends `player` to the roster.
    pub fn admit(&mut self, player: Player) {
        tracing::info!(
            code = %self.code,
            player_id = %player.id(),
            players = self.roster.len() + 1,
            "player admitted"
        );
        self.roster.push(player);
        let players = self.roster.len();
        self.info.send_modify(|info| info.players = players);
    }

    /// Sends an event to one player without waiting.
    ///
    /// Returns `false` if the player's mailbox was full or closed.
    pub fn reply(&self, to: &Player, event: ServerEvent) -> bool {
        match to.notify(event) {
            Ok(()) => true,
            Err(PlayerError::MailboxFull(player_id)) => {
                tracing::warn!(code = %self.code, %player_id, "mailbox full, reply dropped");
                false
            }
            Err(_) => false,
        }
    }

    /// Answers a player's event with an error event.
    pub fn reject(&self, to: &Player, message: impl fmt::Display) {
        let message = message.to_string();
        tracing::debug!(
            code = %self.code,
            player_id = %to.id(),
            %message,
            "event rejected"
        );
        self.reply(to, ServerEvent::error(message));
    }

    /// Sends an event to every roster member, in roster order.
    pub fn broadcast(&self, event: &ServerEvent) -> Delivery {
        broadcast(&self.roster, event)
    }

    /// A snapshot of the session's published info.
    pub fn info(&self) -> SessionInfo {
        self.info.borrow().clone()
    }

    pub(crate) fn publish_stage(&self, stage: &str) {
        self.info.send_modify(|info| info.stage = stage.to_string());
    }

    pub(crate) fn publish_status(&self, status: SessionStatus) {
        self.info.send_modify(|info| info.status = status);
    }
}
