//! Error types for the player layer.

use parlor_protocol::PlayerId;

/// Errors that can occur while registering players or delivering to
/// their mailboxes.
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    /// The directory refused the display name.
    #[error("invalid player name: {0}")]
    InvalidName(String),

    /// The mailbox is at capacity. The event was not queued.
    #[error("mailbox of player {0} is full")]
    MailboxFull(PlayerId),

    /// The mailbox's receiving side is gone: the player disconnected.
    #[error("mailbox of player {0} is closed")]
    MailboxClosed(PlayerId),
}
