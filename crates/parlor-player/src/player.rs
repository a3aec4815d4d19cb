//! The player record and its mailbox.
//!
//! Both halves are created together by [`Player::new`] and the pairing
//! never changes afterwards. `Player` is the sending side and is freely
//! cloned into rosters and events; [`Mailbox`] is the receiving side and
//! deliberately not `Clone`, so a player's events have a single reader.

use std::fmt;
use std::sync::Arc;

use parlor_protocol::{PlayerId, ServerEvent};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::PlayerError;

/// Mailbox capacity used when nothing else is configured.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 100;

struct PlayerInner {
    id: PlayerId,
    name: String,
    outbox: mpsc::Sender<ServerEvent>,
}

/// A participant: id, display name, and the sending side of its mailbox.
///
/// Two `Player` values are equal when their ids are equal.
#[derive(Clone)]
pub struct Player {
    inner: Arc<PlayerInner>,
}

impl Player {
    /// Creates a player and its mailbox.
    ///
    /// `capacity` bounds the number of undelivered events; a capacity of
    /// zero is raised to one.
    pub fn new(
        id: PlayerId,
        name: impl Into<String>,
        capacity: usize,
    ) -> (Player, Mailbox) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let player = Player {
            inner: Arc::new(PlayerInner {
                id,
                name: name.into(),
                outbox: tx,
            }),
        };
        let mailbox = Mailbox {
            player_id: id,
            receiver: rx,
        };
        (player, mailbox)
    }

    /// Returns the player's id.
    pub fn id(&self) -> PlayerId {
        self.inner.id
    }

    /// Returns the player's display name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns `false` once the mailbox has been dropped.
    pub fn is_connected(&self) -> bool {
        !self.inner.outbox.is_closed()
    }

    /// Queues an event without waiting.
    ///
    /// # Errors
    /// [`PlayerError::MailboxFull`] when the mailbox is at capacity and
    /// [`PlayerError::MailboxClosed`] when the player is gone. Either way
    /// the event is dropped.
    pub fn notify(&self, event: ServerEvent) -> Result<(), PlayerError> {
        match self.inner.outbox.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(dropped)) => {
                tracing::debug!(
                    player_id = %self.id(),
                    kind = %dropped.kind,
                    "mailbox full, dropping event"
                );
                Err(PlayerError::MailboxFull(self.id()))
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(player_id = %self.id(), "mailbox closed");
                Err(PlayerError::MailboxClosed(self.id()))
            }
        }
    }

    /// Queues an event, waiting for room if the mailbox is full.
    ///
    /// # Errors
    /// [`PlayerError::MailboxClosed`] when the player is gone.
    pub async fn deliver(&self, event: ServerEvent) -> Result<(), PlayerError> {
        self.inner
            .outbox
            .send(event)
            .await
            .map_err(|_| PlayerError::MailboxClosed(self.id()))
    }

    /// Returns the public view of this player, suitable for payloads.
    pub fn summary(&self) -> PlayerSummary {
        PlayerSummary {
            id: self.id(),
            name: self.name().to_string(),
        }
    }
}

impl PartialEq for Player {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Player {}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .finish()
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.inner.name, self.inner.id)
    }
}

/// What other players get to see about a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Mailbox
// ---------------------------------------------------------------------------

/// The receiving side of a player's event queue.
pub struct Mailbox {
    player_id: PlayerId,
    receiver: mpsc::Receiver<ServerEvent>,
}

impl Mailbox {
    /// The player this mailbox belongs to.
    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    /// Waits for the next event. `None` once every `Player` clone is
    /// dropped and the queue is drained.
    pub async fn recv(&mut self) -> Option<ServerEvent> {
        self.receiver.recv().await
    }

    /// Takes the next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<ServerEvent> {
        self.receiver.try_recv().ok()
    }

    /// Takes every event that is already queued.
    pub fn drain(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }
}

impl fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox")
            .field("player_id", &self.player_id)
            .field("pending", &self.receiver.len())
            .finish()
    }
}
