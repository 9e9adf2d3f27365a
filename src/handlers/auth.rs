use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::codec::ServerMessage;
use crate::error::HandlerError;
use crate::session::Connection;

fn hash_password(pass: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(pass.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub async fn register(
    conn: &Arc<Connection>,
    id: Option<String>,
    name: String,
    pass: String,
) -> Result<(), HandlerError> {
    if conn.info.is_logged_in() {
        return Err(HandlerError::AlreadyLoggedIn);
    }
    if conn.db.accounts().is_banned(&name, &conn.ip).await.map_err(HandlerError::from_store)? {
        return Err(HandlerError::Banned);
    }
    if conn.db.accounts().exists(&name).await.map_err(HandlerError::from_store)? {
        return Err(HandlerError::Conflict(format!("account {name}")));
    }

    let owner = !conn.db.accounts().has_any().await.map_err(HandlerError::from_store)?;
    conn.db
        .accounts()
        .register(&name, &hash_password(&pass), owner, &conn.ip)
        .await
        .map_err(HandlerError::from_store)?;

    conn.info.log_in(&name);
    conn.registry.put(&name, conn.session_handle());

    conn.reply(ServerMessage::Ok { message: "done; you are now logged in".into() }, id);
    if owner {
        conn.reply(ServerMessage::Note { message: "you are a server owner now".into() }, None);
    }
    conn.registry.broadcast(ServerMessage::Register { username: name.clone() });
    Ok(())
}

pub async fn login(
    conn: &Arc<Connection>,
    id: Option<String>,
    name: String,
    pass: String,
) -> Result<(), HandlerError> {
    if conn.info.is_logged_in() {
        return Err(HandlerError::AlreadyLoggedIn);
    }
    if conn.db.accounts().is_banned(&name, &conn.ip).await.map_err(HandlerError::from_store)? {
        return Err(HandlerError::Banned);
    }

    let matches = match conn.db.accounts().check_password(&name, &hash_password(&pass)).await {
        Ok(matches) => matches,
        Err(crate::db::DbError::NotFound { .. }) => false,
        Err(e) => return Err(HandlerError::from_store(e)),
    };
    if !matches {
        return Err(HandlerError::InvalidCredentials);
    }

    conn.info.log_in(&name);
    conn.registry.put(&name, conn.session_handle());

    conn.reply(ServerMessage::Ok { message: "logged in".into() }, id);
    conn.registry.broadcast(ServerMessage::Login { username: name.clone() });
    Ok(())
}
