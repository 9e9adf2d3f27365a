use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use futures_util::stream::{SplitSink, SplitStream};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_tungstenite::tungstenite::Message as WsMessage;

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A minimal JSON WebSocket client for driving protocol scenarios.
pub struct TestClient {
    tx: SplitSink<Ws, WsMessage>,
    rx: SplitStream<Ws>,
}

impl TestClient {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let (ws, _) = connect_async(url).await?;
        let (tx, rx) = ws.split();
        Ok(Self { tx, rx })
    }

    pub async fn send(&mut self, frame: Value) -> anyhow::Result<()> {
        self.tx.send(WsMessage::Text(frame.to_string())).await?;
        Ok(())
    }

    /// Sends a frame with a synthesized correlation id and registers a helper.
    pub async fn send_with_id(&mut self, mut frame: Value, id: &str) -> anyhow::Result<()> {
        frame["_id"] = json!(id);
        self.send(frame).await
    }

    pub async fn recv(&mut self) -> anyhow::Result<Value> {
        self.recv_timeout(Duration::from_secs(2)).await
    }

    pub async fn recv_timeout(&mut self, timeout: Duration) -> anyhow::Result<Value> {
        let frame = tokio::time::timeout(timeout, self.rx.next())
            .await?
            .ok_or_else(|| anyhow::anyhow!("connection closed before a frame arrived"))??;
        match frame {
            WsMessage::Text(text) => Ok(serde_json::from_str(&text)?),
            other => anyhow::bail!("unexpected frame: {other:?}"),
        }
    }

    /// True if no frame arrives within `within`.
    pub async fn expect_silence(&mut self, within: Duration) -> bool {
        tokio::time::timeout(within, self.rx.next()).await.is_err()
    }
}
