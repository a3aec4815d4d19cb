//! WebSocket listener and connections over `tokio-tungstenite`.
//!
//! A socket is split into its write half and its read half as soon as the
//! handshake completes. Each half has its own lock: the writer task of a
//! connection can push frames while the reader task is parked in
//! [`Connection::recv`], and neither waits on the other.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use crate::{Connection, ConnectionId, Transport, TransportError};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type Socket = WebSocketStream<TcpStream>;
type WriteHalf = SplitSink<Socket, Message>;
type ReadHalf = SplitStream<Socket>;

/// Listens for WebSocket clients and upgrades each TCP socket it accepts.
pub struct WebSocketTransport {
    listener: TcpListener,
}

impl WebSocketTransport {
    /// Starts listening on `addr`.
    ///
    /// Port `0` picks a free port; [`local_addr`](Self::local_addr)
    /// reports which one.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr).await.map_err(TransportError::Bind)?;
        tracing::info!(addr, "listening for WebSocket clients");
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        let (tcp, peer) = self.listener.accept().await.map_err(TransportError::Accept)?;
        let socket = tokio_tungstenite::accept_async(tcp)
            .await
            .map_err(|e| TransportError::Handshake(peer, e.to_string()))?;

        let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(%id, %peer, "WebSocket handshake complete");
        Ok(WebSocketConnection::split(id, socket))
    }
}

/// One upgraded client socket, held as two independently locked halves.
pub struct WebSocketConnection {
    id: ConnectionId,
    writer: Mutex<WriteHalf>,
    reader: Mutex<ReadHalf>,
}

impl WebSocketConnection {
    fn split(id: ConnectionId, socket: Socket) -> Self {
        let (writer, reader) = socket.split();
        Self {
            id,
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
        }
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        self.writer
            .lock()
            .await
            .send(outgoing_frame(data))
            .await
            .map_err(|e| TransportError::SendFailed(as_io(io::ErrorKind::BrokenPipe, e)))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut reader = self.reader.lock().await;
        while let Some(frame) = reader.next().await {
            let frame = frame
                .map_err(|e| TransportError::ReceiveFailed(as_io(io::ErrorKind::ConnectionReset, e)))?;
            match incoming_frame(frame) {
                Incoming::Data(bytes) => return Ok(Some(bytes)),
                Incoming::Closed => return Ok(None),
                Incoming::Control => {}
            }
        }
        Ok(None)
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.writer
            .lock()
            .await
            .close()
            .await
            .map_err(|e| TransportError::SendFailed(as_io(io::ErrorKind::BrokenPipe, e)))
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// What a received frame means to a reader.
#[derive(Debug, PartialEq, Eq)]
enum Incoming {
    Data(Vec<u8>),
    Closed,
    /// Ping, pong or a raw frame. Tungstenite answers pings itself.
    Control,
}

/// UTF-8 goes out as a text frame so browser clients get strings.
fn outgoing_frame(data: &[u8]) -> Message {
    match std::str::from_utf8(data) {
        Ok(text) => Message::Text(text.to_owned().into()),
        Err(_) => Message::Binary(data.to_vec().into()),
    }
}

fn incoming_frame(frame: Message) -> Incoming {
    match frame {
        Message::Text(text) => Incoming::Data(text.as_bytes().to_vec()),
        Message::Binary(bytes) => Incoming::Data(bytes.to_vec()),
        Message::Close(_) => Incoming::Closed,
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => Incoming::Control,
    }
}

fn as_io(kind: io::ErrorKind, err: WsError) -> io::Error {
    io::Error::new(kind, err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outgoing_frame_prefers_text() {
        assert!(outgoing_frame(b"{\"type\":\"Games\"}").is_text());
        assert!(outgoing_frame(&[0xff, 0xfe]).is_binary());
    }

    #[test]
    fn test_incoming_frame_classification() {
        assert_eq!(
            incoming_frame(Message::Text("hi".into())),
            Incoming::Data(b"hi".to_vec())
        );
        assert_eq!(
            incoming_frame(Message::Binary(vec![1, 2].into())),
            Incoming::Data(vec![1, 2])
        );
        assert_eq!(incoming_frame(Message::Ping(Vec::new().into())), Incoming::Control);
        assert_eq!(incoming_frame(Message::Close(None)), Incoming::Closed);
    }
}
