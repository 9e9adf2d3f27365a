//! Minimal HTTP surface: a single `/metrics` route. Everything else
//! (the actual WebSocket upgrade) is the transport module's concern.

use axum::Router;
use axum::routing::get;
use tracing::info;

use crate::metrics;

pub async fn serve(addr: String) {
    let app = Router::new().route("/metrics", get(metrics_handler));

    match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => {
            info!(addr, "metrics endpoint listening");
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "metrics endpoint stopped");
            }
        }
        Err(e) => tracing::error!(addr, error = %e, "failed to bind metrics endpoint"),
    }
}

async fn metrics_handler() -> String {
    metrics::encode()
}
