//! Fan-out of one server event to many players.
//!
//! Each recipient gets a non-blocking enqueue. A full mailbox costs that
//! recipient the event and nobody else anything; the caller learns who
//! missed out from the returned [`Delivery`].

use parlor_player::{Player, PlayerError};
use parlor_protocol::{PlayerId, ServerEvent};

/// Who received a broadcast and who didn't.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Recipients whose mailbox accepted the event, in send order.
    pub delivered: Vec<PlayerId>,
    /// Recipients whose mailbox was full. They did not get the event.
    pub saturated: Vec<PlayerId>,
    /// Recipients whose mailbox is gone.
    pub disconnected: Vec<PlayerId>,
}

impl Delivery {
    /// Returns `true` if every recipient got the event.
    pub fn is_complete(&self) -> bool {
        self.saturated.is_empty() && self.disconnected.is_empty()
    }
}

/// Sends `event` to every player in `players`, in order.
pub fn broadcast<'a>(
    players: impl IntoIterator<Item = &'a Player>,
    event: &ServerEvent,
) -> Delivery {
    let mut delivery = Delivery::default();
    for player in players {
        match player.notify(event.clone()) {
            Ok(()) => delivery.delivered.push(player.id()),
            Err(PlayerError::MailboxFull(id)) => delivery.saturated.push(id),
            Err(_) => delivery.disconnected.push(player.id()),
        }
    }
    if !delivery.saturated.is_empty() {
        tracing::warn!(
            kind = %event.kind,
            delivered = delivery.delivered.len(),
            saturated = delivery.saturated.len(),
            "broadcast skipped saturated mailboxes"
        );
    }
    delivery
}
