//! Unified error type for the Parlor server.

use parlor_player::PlayerError;
use parlor_protocol::ProtocolError;
use parlor_session::{CatalogError, SessionError};
use parlor_transport::TransportError;

/// Top-level error that wraps the errors of every Parlor crate.
///
/// Each variant is `#[from]`, so `?` converts sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum ParlorError {
    /// Socket-level failure (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Encoding or decoding a wire message failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Player registration or mailbox failure.
    #[error(transparent)]
    Player(#[from] PlayerError),

    /// Session lookup, creation, or submission failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A game could not be added to the catalog.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

#[cfg(test)]
mod tests {
    use parlor_protocol::PlayerId;

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err: ParlorError = TransportError::ConnectionClosed("gone".into()).into();
        assert!(matches!(err, ParlorError::Transport(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err: ParlorError = ProtocolError::InvalidMessage("bad".into()).into();
        assert!(matches!(err, ParlorError::Protocol(_)));
    }

    #[test]
    fn test_from_player_error() {
        let err: ParlorError = PlayerError::MailboxClosed(PlayerId(3)).into();
        assert!(matches!(err, ParlorError::Player(_)));
        assert!(err.to_string().contains("P-3"));
    }

    #[test]
    fn test_from_session_error_keeps_message() {
        let err: ParlorError = SessionError::UnknownGame("Chess".into()).into();
        assert!(matches!(err, ParlorError::Session(_)));
        assert_eq!(
            err.to_string(),
            "failed to create session, unknown game: Chess"
        );
    }

    #[test]
    fn test_from_catalog_error() {
        let err: ParlorError = CatalogError::Duplicate("Connect4".into()).into();
        assert!(matches!(err, ParlorError::Catalog(_)));
    }
}
