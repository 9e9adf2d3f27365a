//! Routes one decoded message to its handler, enforcing the pre-auth gate
//! and the panic-isolation contract: a caught panic inside a handler is
//! reported to the client as `fatal` and the connection is closed.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tracing::error;

use crate::codec::{ClientMessage, ServerMessage};
use crate::error::{HandlerError, Severity};
use crate::handlers;
use crate::metrics;
use crate::session::Connection;

/// Entry point spawned by the receiver loop for each inbound frame.
pub async fn handle(conn: Arc<Connection>, message: ClientMessage, id: Option<String>) {
    let verb = verb_name(&message);
    metrics::record_message_dispatched(verb);

    if !conn.info.is_logged_in() && !matches!(message, ClientMessage::Register { .. } | ClientMessage::Login { .. }) {
        return;
    }

    let result = AssertUnwindSafe(handlers::dispatch(conn.clone(), message, id.clone()))
        .catch_unwind()
        .await;

    match result {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            if matches!(err, HandlerError::NoPermission) {
                metrics::record_permission_denial();
            }
            let message = match err.severity(verb) {
                Severity::Fail => ServerMessage::Fail { message: err.wire_message() },
                Severity::Fatal => ServerMessage::Fatal { message: err.wire_message() },
            };
            let is_fatal = matches!(message, ServerMessage::Fatal { .. });
            conn.reply(message, id);
            if is_fatal {
                conn.request_close();
            }
        }
        Err(panic) => {
            error!(conn_id = %conn.id, verb, ?panic, "panic inside a handler");
            conn.reply(ServerMessage::Fatal { message: "internal error".into() }, id);
            conn.request_close();
        }
    }
}

fn verb_name(message: &ClientMessage) -> &'static str {
    match message {
        ClientMessage::Quit => "quit",
        ClientMessage::Register { .. } => "register",
        ClientMessage::Login { .. } => "login",
        ClientMessage::NewChannel { .. } => "new-channel",
        ClientMessage::DeleteChannel { .. } => "delete-channel",
        ClientMessage::ChannelTopic { .. } => "channel-topic",
        ClientMessage::Subscribe { .. } => "subscribe",
        ClientMessage::PostMessage { .. } => "post-message",
        ClientMessage::GetMessages { .. } => "get-messages",
        ClientMessage::ListChannels { .. } => "list-channels",
        ClientMessage::ListUsers => "list-users",
        ClientMessage::Kick { .. } => "kick",
        ClientMessage::NewGroup { .. } => "new-group",
        ClientMessage::DeleteGroup { .. } => "delete-group",
        ClientMessage::SetFlag { .. } => "set-flag",
        ClientMessage::DeleteFlag { .. } => "delete-flag",
        ClientMessage::NewGroupHolder { .. } => "new-group-holder",
        ClientMessage::DeleteGroupHolder { .. } => "delete-group-holder",
        ClientMessage::GetGroupHolders => "get-group-holders",
        ClientMessage::Typing { .. } => "typing",
        ClientMessage::DeleteMessage { .. } => "delete-message",
    }
}

