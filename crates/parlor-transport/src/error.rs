use std::io;
use std::net::SocketAddr;

/// Failures of the listener or of a single connection.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The listening socket could not be opened.
    #[error("bind failed: {0}")]
    Bind(#[source] io::Error),

    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),

    /// A client connected but never completed the WebSocket upgrade.
    #[error("handshake with {0} failed: {1}")]
    Handshake(SocketAddr, String),

    /// The peer went away while we were still talking to it.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    #[error("send failed: {0}")]
    SendFailed(#[source] io::Error),

    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] io::Error),
}
