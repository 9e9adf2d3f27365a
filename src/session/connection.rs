//! Per-connection session: the receiver/sender task pair described in the
//! session model, grounded directly in the reference implementation's
//! connection handler — a shared `running` flag, a close signal, and
//! per-iteration panic isolation on both tasks.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::{SinkExt, StreamExt};
use futures_util::stream::{SplitSink, SplitStream};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::codec::{self, ServerMessage};
use crate::db::Database;
use crate::dispatch;
use crate::registry::{Registry, SessionHandle};

use super::conn_info::ConnInfo;

type WsSender = SplitSink<WebSocketStream<TcpStream>, WsMessage>;
type WsReceiver = SplitStream<WebSocketStream<TcpStream>>;
type Outbound = (ServerMessage, Option<String>);

/// A live connection's shared state: what the receiver, sender, and every
/// ephemeral handler task for this connection all hold a clone of.
pub struct Connection {
    pub id: Uuid,
    pub ip: String,
    pub info: Arc<ConnInfo>,
    pub db: Arc<Database>,
    pub registry: Arc<Registry>,
    outbound_tx: UnboundedSender<Outbound>,
    running: Arc<AtomicBool>,
    close: Arc<tokio::sync::Notify>,
}

impl Connection {
    /// Enqueues a direct reply, stamped with the correlation id (if any) of
    /// the request it answers.
    pub fn reply(&self, message: ServerMessage, id: Option<String>) {
        let _ = self.outbound_tx.send((message, id));
    }

    /// This connection's registry handle, for subscribing it to fan-out
    /// under a now-authenticated username.
    pub fn session_handle(&self) -> SessionHandle {
        SessionHandle { conn_id: self.id, info: self.info.clone(), sender: self.outbound_tx.clone() }
    }

    pub fn request_close(&self) {
        self.running.store(false, Ordering::Release);
        self.close.notify_waiters();
    }
}

/// Runs one connection to completion: spawns the receiver and sender tasks
/// and drives them until the close signal fires, then performs the
/// close-handler duties (registry cleanup, `user-quit` broadcast).
pub async fn run(
    ws: WebSocketStream<TcpStream>,
    peer_ip: String,
    db: Arc<Database>,
    registry: Arc<Registry>,
) {
    let (ws_tx, ws_rx) = ws.split();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let running = Arc::new(AtomicBool::new(true));
    let close = Arc::new(tokio::sync::Notify::new());

    let conn = Arc::new(Connection {
        id: Uuid::new_v4(),
        ip: peer_ip,
        info: Arc::new(ConnInfo::default()),
        db,
        registry,
        outbound_tx,
        running: running.clone(),
        close: close.clone(),
    });

    info!(conn_id = %conn.id, "connection established");

    let sender_conn = conn.clone();
    let sender_task = tokio::spawn(sender_loop(sender_conn, ws_tx, outbound_rx, running.clone(), close.clone()));

    let receiver_conn = conn.clone();
    let receiver_task = tokio::spawn(receiver_loop(receiver_conn, ws_rx, running.clone(), close.clone()));

    let _ = tokio::join!(sender_task, receiver_task);

    if conn.info.is_logged_in() {
        let username = conn.info.username();
        conn.registry.remove(&username, conn.id);
        conn.registry.broadcast(ServerMessage::UserQuit { username });
    }
    info!(conn_id = %conn.id, "connection closed");
}

async fn receiver_loop(
    conn: Arc<Connection>,
    mut ws_rx: WsReceiver,
    running: Arc<AtomicBool>,
    close: Arc<tokio::sync::Notify>,
) {
    while running.load(Ordering::Acquire) {
        let frame = tokio::select! {
            _ = close.notified() => break,
            frame = ws_rx.next() => frame,
        };

        let Some(frame) = frame else {
            running.store(false, Ordering::Release);
            close.notify_waiters();
            break;
        };

        let text = match frame {
            Ok(WsMessage::Text(text)) => text,
            Ok(WsMessage::Close(_)) => {
                running.store(false, Ordering::Release);
                close.notify_waiters();
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                warn!(conn_id = %conn.id, error = %e, "error reading frame");
                continue;
            }
        };

        let conn = conn.clone();
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| codec::decode(&text)));
        match result {
            Ok(Ok((message, id))) => {
                // `quit` itself triggers the close, via the handler's own
                // `request_close`, after its `ok` reply is already queued —
                // closing here instead would race the sender loop against
                // that reply.
                tokio::spawn(dispatch::handle(conn, message, id));
            }
            Ok(Err(e)) => {
                conn.reply(ServerMessage::Fatal { message: e.to_string() }, None);
            }
            Err(panic) => {
                error!(conn_id = %conn.id, ?panic, "panic while decoding a message");
                conn.reply(ServerMessage::Fatal { message: "internal error".into() }, None);
                running.store(false, Ordering::Release);
                close.notify_waiters();
            }
        }
    }
}

async fn sender_loop(
    conn: Arc<Connection>,
    mut ws_tx: WsSender,
    mut outbound_rx: UnboundedReceiver<Outbound>,
    running: Arc<AtomicBool>,
    close: Arc<tokio::sync::Notify>,
) {
    while running.load(Ordering::Acquire) {
        let next = tokio::select! {
            _ = close.notified() => break,
            next = outbound_rx.recv() => next,
        };

        let Some((message, id)) = next else { break };

        let is_terminal = matches!(message, ServerMessage::Fatal { .. });

        let encoded = match codec::encode(&message, id.as_deref()) {
            Ok(text) => text,
            Err(e) => {
                error!(conn_id = %conn.id, error = %e, "cannot encode outbound message");
                continue;
            }
        };

        if let Err(e) = ws_tx.send(WsMessage::Text(encoded)).await {
            warn!(conn_id = %conn.id, error = %e, "unable to write frame");
        }

        if is_terminal {
            running.store(false, Ordering::Release);
            close.notify_waiters();
            break;
        }
    }
}
