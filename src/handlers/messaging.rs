use std::sync::Arc;

use regex::Regex;
use std::sync::OnceLock;

use crate::codec::ServerMessage;
use crate::db::DbError;
use crate::error::HandlerError;
use crate::perm::PermResolver;
use crate::session::Connection;

fn mention_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"@?<(\d+)>").unwrap())
}

pub async fn post_message(
    conn: &Arc<Connection>,
    id: Option<String>,
    content: String,
    channel: String,
) -> Result<(), HandlerError> {
    let username = conn.info.username();
    if !PermResolver::new(&conn.db)
        .has_perm(&username, &channel, "perms.post-message")
        .await
        .map_err(HandlerError::from_perm)?
    {
        return Err(HandlerError::NoPermission);
    }
    if !conn.info.is_subscribed(&channel) {
        return Err(HandlerError::NotSubscribed);
    }

    let mut pings = Vec::new();
    let mut unknown_ids = Vec::new();
    for cap in mention_pattern().captures_iter(&content) {
        let Ok(account_id) = cap[1].parse::<i64>() else { continue };
        match conn.db.accounts().get(account_id).await {
            Ok(account) => pings.push(account.username),
            Err(DbError::NotFound { .. }) => unknown_ids.push(account_id),
            Err(e) => return Err(HandlerError::from_store(e)),
        }
    }

    let message = conn
        .db
        .messages()
        .post(&channel, &content, pings.clone(), &username)
        .await
        .map_err(HandlerError::from_store)?;

    conn.reply(ServerMessage::Ok { message: "message posted".into() }, id);
    if !unknown_ids.is_empty() {
        conn.reply(
            ServerMessage::Note {
                message: format!("unknown mention id(s): {unknown_ids:?}"),
            },
            None,
        );
    }

    conn.registry.broadcast_to_subscribers(
        &channel,
        ServerMessage::PostMessage { channel: channel.clone(), message: message.clone() },
    );
    for pinged in &pings {
        conn.registry.send_to_user(pinged, ServerMessage::Ping { message: message.clone() });
    }

    Ok(())
}

pub async fn get_messages(
    conn: &Arc<Connection>,
    id: Option<String>,
    channel_id: i64,
    before_id: i64,
    amount: i64,
) -> Result<(), HandlerError> {
    let username = conn.info.username();
    if !PermResolver::new(&conn.db)
        .has_perm_by_channel_id(&username, channel_id, "perms.get-messages")
        .await
        .map_err(HandlerError::from_perm)?
    {
        return Err(HandlerError::NoPermission);
    }

    let messages = conn
        .db
        .messages()
        .get(channel_id, before_id, amount)
        .await
        .map_err(HandlerError::from_store)?;
    conn.reply(ServerMessage::GetMessagesResult { messages }, id);
    Ok(())
}

pub async fn delete_message(
    conn: &Arc<Connection>,
    id: Option<String>,
    message_id: i64,
) -> Result<(), HandlerError> {
    let username = conn.info.username();
    let (channel_name, message) = conn
        .db
        .messages()
        .details(message_id)
        .await
        .map_err(HandlerError::from_store)?;

    let is_author = conn
        .db
        .accounts()
        .find_by_name(&username)
        .await
        .map_err(HandlerError::from_store)?
        .map(|a| a.id == message.author_id)
        .unwrap_or(false);

    if !is_author
        && !PermResolver::new(&conn.db)
            .has_perm(&username, &channel_name, "perms.delete-message")
            .await
            .map_err(HandlerError::from_perm)?
    {
        return Err(HandlerError::NoPermission);
    }

    conn.db.messages().delete(message_id).await.map_err(HandlerError::from_store)?;
    conn.reply(ServerMessage::Ok { message: "message deleted".into() }, id);
    Ok(())
}

pub async fn typing(
    conn: &Arc<Connection>,
    id: Option<String>,
    channel: String,
    typing: bool,
) -> Result<(), HandlerError> {
    let username = conn.info.username();
    if !PermResolver::new(&conn.db)
        .has_perm(&username, &channel, "perms.post-message")
        .await
        .map_err(HandlerError::from_perm)?
    {
        return Err(HandlerError::NoPermission);
    }

    conn.reply(ServerMessage::Ok { message: "ok".into() }, id);
    conn.registry.broadcast_to_subscribers(
        &channel,
        ServerMessage::Typing { channel: channel.clone(), typing, username: username.clone() },
    );
    Ok(())
}
