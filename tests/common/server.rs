use std::sync::Arc;

use melodious::db::Database;
use melodious::registry::Registry;
use tokio::net::TcpListener;

/// A `melodious` server bound to an ephemeral port, backed by its own
/// in-memory store, running for the lifetime of the test.
pub struct TestServer {
    addr: std::net::SocketAddr,
    pub db: Arc<Database>,
    pub registry: Arc<Registry>,
}

impl TestServer {
    pub async fn spawn() -> anyhow::Result<Self> {
        let db = Arc::new(Database::connect(":memory:").await?);
        let registry = Arc::new(Registry::new());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        tokio::spawn(melodious::accept_loop(listener, db.clone(), registry.clone()));

        Ok(Self { addr, db, registry })
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }
}
