use std::sync::Arc;

use crate::codec::{ServerMessage, UserStatus};
use crate::error::HandlerError;
use crate::perm::PermResolver;
use crate::session::Connection;

pub async fn quit(conn: &Arc<Connection>, id: Option<String>) -> Result<(), HandlerError> {
    conn.reply(ServerMessage::Ok { message: "bye".into() }, id);
    conn.request_close();
    Ok(())
}

pub async fn list_users(conn: &Arc<Connection>, id: Option<String>) -> Result<(), HandlerError> {
    let username = conn.info.username();
    if !PermResolver::new(&conn.db)
        .has_perm(&username, "", "perms.list-users")
        .await
        .map_err(HandlerError::from_perm)?
    {
        return Err(HandlerError::NoPermission);
    }

    let accounts = conn.db.accounts().list().await.map_err(HandlerError::from_store)?;
    let users = accounts
        .into_iter()
        .map(|a| UserStatus { online: conn.registry.is_online(&a.username), user: a.username })
        .collect();
    conn.reply(ServerMessage::ListUsers { users }, id);
    Ok(())
}

pub async fn kick(
    conn: &Arc<Connection>,
    id: Option<String>,
    target_id: Option<i64>,
    target_username: Option<String>,
    ban: bool,
) -> Result<(), HandlerError> {
    let username = conn.info.username();
    if !PermResolver::new(&conn.db)
        .has_perm(&username, "", "perms.kickban")
        .await
        .map_err(HandlerError::from_perm)?
    {
        return Err(HandlerError::NoPermission);
    }

    let target = match (target_id, target_username) {
        (Some(target_id), None) => conn.db.accounts().get(target_id).await.map_err(HandlerError::from_store)?,
        (None, Some(name)) => conn
            .db
            .accounts()
            .find_by_name(&name)
            .await
            .map_err(HandlerError::from_store)?
            .ok_or(HandlerError::NotFound { entity: "account", name })?,
        _ => return Err(HandlerError::BadRequest("kick requires exactly one of id/username".into())),
    };

    if target.username == username {
        return Err(HandlerError::SelfTarget);
    }

    conn.registry.send_to_user(
        &target.username,
        ServerMessage::Fatal { message: "you've been kicked or banned".into() },
    );
    if ban {
        conn.db.accounts().ban(&target.username).await.map_err(HandlerError::from_store)?;
    }

    conn.reply(ServerMessage::Ok { message: "done".into() }, id);
    Ok(())
}
