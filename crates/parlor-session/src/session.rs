//! A live session and its execution loop.
//!
//! Each session runs in its own Tokio task, spawned once when the
//! session is created. The task owns the [`StageContext`] (queue and
//! roster) and runs one stage after another until a stage ends the
//! session. Everything outside the task talks to it through a
//! [`Session`] handle: events go in through the inbound queue, and
//! [`SessionInfo`] snapshots come out through a watch channel.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use parlor_player::Player;
use parlor_protocol::{SessionCode, SessionId};
use serde::Serialize;
use tokio::sync::watch;

use crate::event::{EventSender, PlayerEvent, event_queue};
use crate::join::JoinStage;
use crate::stage::{Stage, StageContext, Transition};
use crate::{EngineConfig, SessionError, SessionStatus, StageError};

/// A snapshot of session metadata (not the game state itself).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub id: SessionId,
    pub code: SessionCode,
    /// The catalog name of the game.
    pub game: String,
    /// Name of the active stage, or of the last one once the loop exits.
    pub stage: String,
    /// Roster size.
    pub players: usize,
    pub status: SessionStatus,
}

impl SessionInfo {
    /// Info for a context that isn't attached to a registered session.
    pub(crate) fn detached(code: SessionCode) -> Self {
        Self {
            id: SessionId(0),
            code,
            game: String::new(),
            stage: String::new(),
            players: 0,
            status: SessionStatus::Running,
        }
    }
}

/// Handle to a running session.
///
/// Cheap to clone. The registry keeps one per live session; callers get
/// clones from lookups.
#[derive(Clone)]
pub struct Session {
    id: SessionId,
    code: SessionCode,
    game: Arc<str>,
    events: EventSender,
    info: watch::Receiver<SessionInfo>,
}

impl Session {
    /// Starts a session running `initial` and returns its handle.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(
        id: SessionId,
        code: SessionCode,
        game: &str,
        initial: Box<dyn Stage>,
        config: &EngineConfig,
    ) -> Session {
        let (events, queue) = event_queue(config.inbound_capacity);
        let (info_tx, info_rx) = watch::channel(SessionInfo {
            id,
            code: code.clone(),
            game: game.to_string(),
            stage: initial.name().to_string(),
            players: 0,
            status: SessionStatus::Running,
        });
        let ctx = StageContext::with_info(code.clone(), queue, info_tx);

        tracing::info!(session_id = %id, %code, game, "session created");
        tokio::spawn(execute(ctx, initial));

        Session {
            id,
            code,
            game: Arc::from(game),
            events,
            info: info_rx,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn code(&self) -> &SessionCode {
        &self.code
    }

    /// The catalog name of the game this session plays.
    pub fn game(&self) -> &str {
        &self.game
    }

    /// The latest published info.
    pub fn info(&self) -> SessionInfo {
        self.info.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.info.borrow().status
    }

    pub fn is_running(&self) -> bool {
        self.status().is_running()
    }

    /// Queues a player event for the active stage.
    ///
    /// Waits while the inbound queue is full.
    ///
    /// # Errors
    /// [`SessionError::Ended`] once the execution loop has exited.
    pub async fn submit(&self, event: PlayerEvent) -> Result<(), SessionError> {
        if !self.is_running() {
            return Err(SessionError::Ended(self.code.clone()));
        }
        self.events
            .send(event)
            .await
            .map_err(|_| SessionError::Ended(self.code.clone()))
    }

    /// Asks the active stage to admit `player`.
    ///
    /// The answer arrives in the player's mailbox: `DID_JOIN` or an error.
    pub async fn join(&self, player: &Player) -> Result<(), SessionError> {
        self.submit(PlayerEvent::bare(JoinStage::JOIN, player.clone()))
            .await
    }

    /// Waits until the execution loop exits and returns how it ended.
    pub async fn finished(&self) -> SessionStatus {
        let mut info = self.info.clone();
        if let Ok(done) = info.wait_for(|i| !i.status.is_running()).await {
            return done.status;
        }
        info.borrow().status
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("code", &self.code)
            .field("game", &self.game)
            .finish()
    }
}

/// The execution loop. Exactly one stage runs at a time.
async fn execute(mut ctx: StageContext, initial: Box<dyn Stage>) {
    let mut stage = initial;
    loop {
        let name = stage.name().to_string();
        ctx.publish_stage(&name);
        tracing::debug!(code = %ctx.code(), stage = %name, "stage running");

        let outcome = AssertUnwindSafe(stage.run(&mut ctx))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(StageError::Panicked(name.clone())));

        match outcome {
            Ok(Transition::Next(next)) => {
                tracing::info!(
                    code = %ctx.code(),
                    from = %name,
                    to = next.name(),
                    "stage transition"
                );
                stage = next;
            }
            Ok(Transition::End) => {
                ctx.publish_status(SessionStatus::Ended);
                tracing::info!(code = %ctx.code(), stage = %name, "session ended");
                return;
            }
            Err(e) => {
                ctx.publish_status(SessionStatus::Failed);
                tracing::error!(
                    code = %ctx.code(),
                    stage = %name,
                    error = %e,
                    "stage failed, session terminated"
                );
                return;
            }
        }
    }
}
