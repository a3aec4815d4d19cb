//! Per-connection handler: request routing and mailbox relay.
//!
//! Each accepted connection gets its own task running
//! [`handle_connection`]. Replies and relayed mailbox events share one
//! outbound queue drained by a writer task, so the socket has a single
//! writer and messages leave in the order they were queued:
//!
//!   reader loop ──┐
//!                 ├──▶ outbound queue ──▶ writer task ──▶ socket
//!   mailbox relay ┘

use std::sync::Arc;

use parlor_player::{Mailbox, Player, PlayerDirectory};
use parlor_protocol::{ClientRequest, Codec, ServerMessage, SessionCode};
use parlor_session::{JoinStage, Joined, PlayerEvent, Session, SessionError};
use parlor_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::ParlorError;
use crate::server::ServerState;

/// Messages waiting for the writer task, per connection.
const OUTBOUND_CAPACITY: usize = 64;

type Outbound = mpsc::Sender<ServerMessage>;

/// The player a connection is seated as after a successful join.
///
/// Dropping the seat stops its mailbox relay.
struct Seat {
    session: Session,
    player: Player,
    relay: JoinHandle<()>,
}

impl Drop for Seat {
    fn drop(&mut self) {
        self.relay.abort();
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<D, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<D, C>>,
) -> Result<(), ParlorError>
where
    D: PlayerDirectory,
    C: Codec,
{
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let (outbound, writer) = spawn_writer(Arc::clone(&conn), Arc::clone(&state));
    let mut seat: Option<Seat> = None;

    loop {
        let data = match tokio::time::timeout(state.idle_timeout, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%conn_id, "connection idle, closing");
                break;
            }
        };

        let request: ClientRequest = match state.codec.decode(&data) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode request");
                let _ = outbound
                    .send(rejection(400, format!("invalid request: {e}")))
                    .await;
                continue;
            }
        };

        if matches!(request, ClientRequest::Disconnect) {
            tracing::info!(%conn_id, "client disconnected");
            break;
        }

        if let Some(response) = handle_request(&state, &outbound, &mut seat, request).await {
            let _ = outbound.send(response).await;
        }
    }

    if let Some(seat) = seat.take() {
        tracing::info!(
            %conn_id,
            player_id = %seat.player.id(),
            code = %seat.session.code(),
            "player connection closed"
        );
    }

    // The writer exits once every sender is gone; wait so queued replies
    // reach the socket before it closes.
    drop(outbound);
    let _ = writer.await;
    if let Err(e) = conn.close().await {
        tracing::debug!(%conn_id, error = %e, "close failed");
    }
    Ok(())
}

/// Serves one request. Returns the direct response, if any.
///
/// Actions have none: their outcome arrives through the mailbox relay.
async fn handle_request<D, C>(
    state: &ServerState<D, C>,
    outbound: &Outbound,
    seat: &mut Option<Seat>,
    request: ClientRequest,
) -> Option<ServerMessage>
where
    D: PlayerDirectory,
    C: Codec,
{
    match request {
        ClientRequest::ListGames => Some(ServerMessage::Games {
            names: state.registry.catalog().names(),
        }),

        ClientRequest::CreateSession { game } => match state.registry.create(&game).await {
            Ok(session) => Some(ServerMessage::SessionCreated {
                code: session.code().clone(),
            }),
            Err(e) => Some(session_rejection(&e)),
        },

        ClientRequest::JoinSession { code, name } => {
            join_session(state, outbound, seat, &code, &name).await
        }

        ClientRequest::Action { kind, payload } => {
            let Some(seat) = seat.as_ref() else {
                return Some(rejection(400, "join a session before sending actions"));
            };
            // Seats are only taken through JoinSession, one per connection.
            if kind == JoinStage::JOIN {
                return Some(already_joined(&seat.session));
            }
            let event = PlayerEvent::new(kind, seat.player.clone(), payload);
            match seat.session.submit(event).await {
                Ok(()) => None,
                Err(e) => Some(session_rejection(&e)),
            }
        }

        // Handled by the reader loop.
        ClientRequest::Disconnect => None,
    }
}

async fn join_session<D, C>(
    state: &ServerState<D, C>,
    outbound: &Outbound,
    seat: &mut Option<Seat>,
    code: &SessionCode,
    name: &str,
) -> Option<ServerMessage>
where
    D: PlayerDirectory,
    C: Codec,
{
    if let Some(seat) = seat {
        return Some(already_joined(&seat.session));
    }

    let Joined {
        session,
        player,
        mailbox,
    } = match state.registry.join(code, name).await {
        Ok(joined) => joined,
        Err(e) => return Some(session_rejection(&e)),
    };

    // Queue the confirmation before the relay can forward DID_JOIN.
    let _ = outbound
        .send(ServerMessage::Joined {
            code: session.code().clone(),
            player_id: player.id(),
        })
        .await;
    let relay = tokio::spawn(relay_mailbox(mailbox, outbound.clone()));

    *seat = Some(Seat {
        session,
        player,
        relay,
    });
    None
}

/// Forwards every event in `mailbox` to the connection.
async fn relay_mailbox(mut mailbox: Mailbox, outbound: Outbound) {
    let player_id = mailbox.player_id();
    while let Some(event) = mailbox.recv().await {
        if outbound.send(ServerMessage::Event { event }).await.is_err() {
            break;
        }
    }
    tracing::debug!(%player_id, "mailbox relay stopped");
}

/// Starts the task that encodes outbound messages onto the socket.
fn spawn_writer<D, C>(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<D, C>>,
) -> (Outbound, JoinHandle<()>)
where
    D: PlayerDirectory,
    C: Codec,
{
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(OUTBOUND_CAPACITY);
    let writer = tokio::spawn(async move {
        let conn_id = conn.id();
        while let Some(message) = rx.recv().await {
            let bytes = match state.codec.encode(&message) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(%conn_id, error = %e, "failed to encode message");
                    continue;
                }
            };
            if let Err(e) = conn.send(&bytes).await {
                tracing::debug!(%conn_id, error = %e, "send failed, writer stopping");
                break;
            }
        }
    });
    (tx, writer)
}

fn rejection(code: u16, message: impl Into<String>) -> ServerMessage {
    ServerMessage::Error {
        code,
        message: message.into(),
    }
}

fn already_joined(session: &Session) -> ServerMessage {
    rejection(409, format!("already joined session {}", session.code()))
}

/// Maps a registry or session failure to an error response.
fn session_rejection(err: &SessionError) -> ServerMessage {
    let code = match err {
        SessionError::UnknownGame(_) | SessionError::NotFound(_) => 404,
        SessionError::Ended(_) => 410,
        SessionError::Player(_) | SessionError::Protocol(_) => 400,
    };
    rejection(code, err.to_string())
}
