use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use melodious::{config, db, http, registry, retention};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let config_path = config::resolve_config_path(&args);

    let cfg = config::load(&config_path)
        .with_context(|| format!("failed to load config from {config_path}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!(db = %cfg.db_addr, listen = %cfg.http_addr, "starting melodious");

    let database = Arc::new(
        db::Database::connect(&cfg.db_addr)
            .await
            .with_context(|| format!("failed to open store at {}", cfg.db_addr))?,
    );

    let registry = Arc::new(registry::Registry::new());

    tokio::spawn(retention::run(
        database.clone(),
        cfg.delete_history_every(),
        cfg.store_history_for(),
    ));

    if let Some(metrics_addr) = cfg.metrics_addr.clone().filter(|a| !a.is_empty()) {
        tokio::spawn(http::serve(metrics_addr));
    }

    let listener = TcpListener::bind(&cfg.http_addr)
        .await
        .with_context(|| format!("failed to bind listener on {}", cfg.http_addr))?;
    info!(addr = cfg.http_addr, "listening");

    melodious::accept_loop(listener, database, registry).await;
    Ok(())
}
