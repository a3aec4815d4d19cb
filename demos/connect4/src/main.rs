//! Serves Connect 4 over WebSocket on `0.0.0.0:$PORT` (default 8080).

use std::sync::Arc;

use parlor::prelude::*;

const DEFAULT_PORT: u16 = 8080;

#[tokio::main]
async fn main() -> Result<(), ParlorError> {
    init_tracing();

    let port = match std::env::var("PORT") {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(value = %raw, fallback = DEFAULT_PORT, "PORT is not a valid port");
            DEFAULT_PORT
        }),
        Err(_) => DEFAULT_PORT,
    };

    let catalog = GameCatalog::new();
    connect4::register(&catalog)?;

    let server = ParlorServer::builder()
        .bind(&format!("0.0.0.0:{port}"))
        .build(Arc::new(catalog))
        .await?;
    if let Ok(addr) = server.local_addr() {
        tracing::info!(%addr, "Connect 4 server listening");
    }
    server.run().await
}
