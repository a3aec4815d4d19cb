//! Player events and the inbound queue that carries them.
//!
//! Every session owns exactly one [`EventQueue`]. All of its stages read
//! from that same queue in turn, so events submitted while one stage is
//! handing off to the next are simply picked up by the next one.

use std::fmt;

use parlor_player::Player;
use parlor_protocol::{EventType, ProtocolError};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc;

/// Something a player did, addressed to the active stage of a session.
///
/// Immutable once built. The sender is the player as the engine knows
/// it; stages still have to check it against their roster before
/// trusting it.
#[derive(Clone)]
pub struct PlayerEvent {
    kind: EventType,
    sender: Player,
    payload: Value,
}

impl PlayerEvent {
    /// Creates an event with a payload.
    pub fn new(kind: EventType, sender: Player, payload: Value) -> Self {
        Self {
            kind,
            sender,
            payload,
        }
    }

    /// Creates an event with no payload.
    pub fn bare(kind: EventType, sender: Player) -> Self {
        Self::new(kind, sender, Value::Null)
    }

    pub fn kind(&self) -> &EventType {
        &self.kind
    }

    pub fn sender(&self) -> &Player {
        &self.sender
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Returns `true` if the event carries the given tag.
    pub fn is(&self, kind: &EventType) -> bool {
        &self.kind == kind
    }

    /// Decodes the payload into a concrete type.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the payload has another shape.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        T::deserialize(&self.payload).map_err(ProtocolError::Decode)
    }
}

impl fmt::Debug for PlayerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerEvent")
            .field("kind", &self.kind)
            .field("sender", &self.sender.id())
            .field("payload", &self.payload)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Inbound queue
// ---------------------------------------------------------------------------

/// Producer side of a session's inbound queue.
pub type EventSender = mpsc::Sender<PlayerEvent>;

/// Consumer side of a session's inbound queue. Only the running stage
/// reads from it.
pub struct EventQueue {
    receiver: mpsc::Receiver<PlayerEvent>,
}

impl EventQueue {
    /// Waits for the next event. `None` means every producer is gone.
    pub async fn next(&mut self) -> Option<PlayerEvent> {
        self.receiver.recv().await
    }
}

/// Creates a bounded inbound queue. A capacity of zero is raised to one.
pub fn event_queue(capacity: usize) -> (EventSender, EventQueue) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (tx, EventQueue { receiver: rx })
}
