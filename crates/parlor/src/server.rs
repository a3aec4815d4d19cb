//! `ParlorServer` builder and accept loop.
//!
//! Ties the layers together: WebSocket transport, JSON codec, and the
//! session registry every connection shares.

use std::sync::Arc;
use std::time::Duration;

use parlor_player::{InMemoryDirectory, PlayerDirectory};
use parlor_protocol::{Codec, JsonCodec};
use parlor_session::{EngineConfig, GameCatalog, SessionRegistry};
use parlor_transport::{Transport, WebSocketTransport};

use crate::ParlorError;
use crate::handler::handle_connection;

/// How long a connection may stay silent before it is closed.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(600);

/// State shared by every connection task.
pub(crate) struct ServerState<D: PlayerDirectory, C: Codec> {
    pub(crate) registry: SessionRegistry<D>,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Duration,
}

/// Builder for configuring and starting a Parlor server.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use parlor::prelude::*;
///
/// let catalog = Arc::new(GameCatalog::new().with("Connect4", connect4)?);
/// let server = ParlorServer::builder()
///     .bind("0.0.0.0:8080")
///     .build(catalog)
///     .await?;
/// server.run().await
/// ```
pub struct ParlorServerBuilder {
    bind_addr: String,
    engine: EngineConfig,
    idle_timeout: Duration,
}

impl ParlorServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            engine: EngineConfig::default(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the queue sizes used for every session.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.engine = config;
        self
    }

    /// Sets how long a silent connection is kept open.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Binds the listener and builds a server for the games in `catalog`.
    ///
    /// Players are registered in an in-memory directory.
    pub async fn build(
        self,
        catalog: Arc<GameCatalog>,
    ) -> Result<ParlorServer<InMemoryDirectory, JsonCodec>, ParlorError> {
        self.build_with_directory(catalog, InMemoryDirectory::default())
            .await
    }

    /// Like [`build`](Self::build), registering players through `directory`.
    pub async fn build_with_directory<D: PlayerDirectory>(
        self,
        catalog: Arc<GameCatalog>,
        directory: D,
    ) -> Result<ParlorServer<D, JsonCodec>, ParlorError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            registry: SessionRegistry::with_directory(catalog, directory, self.engine),
            codec: JsonCodec,
            idle_timeout: self.idle_timeout,
        });

        Ok(ParlorServer { transport, state })
    }
}

impl Default for ParlorServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Parlor server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct ParlorServer<D: PlayerDirectory, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<D, C>>,
}

impl ParlorServer<InMemoryDirectory, JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> ParlorServerBuilder {
        ParlorServerBuilder::new()
    }
}

impl<D: PlayerDirectory, C: Codec> ParlorServer<D, C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The registry shared by all connections.
    pub fn registry(&self) -> &SessionRegistry<D> {
        &self.state.registry
    }

    /// Runs the accept loop until the process is terminated.
    ///
    /// Each accepted connection is handled in its own task.
    pub async fn run(mut self) -> Result<(), ParlorError> {
        tracing::info!(
            games = ?self.state.registry.catalog().names(),
            "Parlor server running"
        );

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
