//! Library crate backing the `melodiousd` binary. Split out so integration
//! tests can drive real connections against an in-process server instead of
//! mocking the pieces in between.

pub mod codec;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod http;
pub mod metrics;
pub mod perm;
pub mod registry;
pub mod retention;
pub mod session;

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::warn;

/// Accepts connections on `listener` until the process is torn down,
/// spawning one session per accepted socket. This is the server's core
/// accept loop, factored out of `main` so tests can run it against an
/// ephemeral port.
pub async fn accept_loop(listener: TcpListener, db: Arc<db::Database>, registry: Arc<registry::Registry>) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "failed to accept connection");
                continue;
            }
        };

        let db = db.clone();
        let registry = registry.clone();
        tokio::spawn(async move {
            metrics::record_connection_accepted();
            match tokio_tungstenite::accept_async(stream).await {
                Ok(ws) => session::run(ws, peer.ip().to_string(), db, registry).await,
                Err(e) => warn!(peer = %peer, error = %e, "websocket upgrade failed"),
            }
        });
    }
}
