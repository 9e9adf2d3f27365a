use std::sync::Arc;

use serde_json::Value;

use crate::codec::ServerMessage;
use crate::db::Flag;
use crate::error::HandlerError;
use crate::perm::PermResolver;
use crate::session::Connection;

async fn require_owner(conn: &Connection) -> Result<(), HandlerError> {
    let username = conn.info.username();
    if !conn.db.accounts().is_owner(&username).await.map_err(HandlerError::from_store)? {
        return Err(HandlerError::NoPermission);
    }
    Ok(())
}

pub async fn new_group(conn: &Arc<Connection>, id: Option<String>, name: String) -> Result<(), HandlerError> {
    require_owner(conn).await?;
    conn.db.groups().add(&name).await.map_err(HandlerError::from_store)?;
    conn.reply(ServerMessage::Ok { message: "group created".into() }, id);
    Ok(())
}

pub async fn delete_group(conn: &Arc<Connection>, id: Option<String>, name: String) -> Result<(), HandlerError> {
    require_owner(conn).await?;
    conn.db.groups().delete(&name).await.map_err(HandlerError::from_store)?;
    conn.reply(ServerMessage::Ok { message: "group deleted".into() }, id);
    Ok(())
}

pub async fn set_flag(
    conn: &Arc<Connection>,
    id: Option<String>,
    group: String,
    name: String,
    flag: Value,
) -> Result<(), HandlerError> {
    require_owner(conn).await?;
    conn.db
        .flags()
        .set(&Flag { group, name, flag })
        .await
        .map_err(HandlerError::from_store)?;
    conn.reply(ServerMessage::Ok { message: "flag set".into() }, id);
    Ok(())
}

pub async fn delete_flag(
    conn: &Arc<Connection>,
    id: Option<String>,
    group: String,
    name: String,
) -> Result<(), HandlerError> {
    require_owner(conn).await?;
    conn.db.flags().delete(&group, &name).await.map_err(HandlerError::from_store)?;
    conn.reply(ServerMessage::Ok { message: "flag deleted".into() }, id);
    Ok(())
}

pub async fn new_group_holder(
    conn: &Arc<Connection>,
    id: Option<String>,
    group: String,
    user: String,
    channel: String,
) -> Result<(), HandlerError> {
    require_owner(conn).await?;
    let user = Some(user).filter(|s| !s.is_empty());
    let channel = Some(channel).filter(|s| !s.is_empty());
    conn.db
        .holders()
        .add(&group, user.as_deref(), channel.as_deref())
        .await
        .map_err(HandlerError::from_store)?;
    conn.reply(ServerMessage::Ok { message: "holder created".into() }, id);
    Ok(())
}

pub async fn delete_group_holder(
    conn: &Arc<Connection>,
    id: Option<String>,
    holder_id: i64,
) -> Result<(), HandlerError> {
    require_owner(conn).await?;
    conn.db.holders().delete(holder_id).await.map_err(HandlerError::from_store)?;
    conn.reply(ServerMessage::Ok { message: "holder deleted".into() }, id);
    Ok(())
}

pub async fn get_group_holders(conn: &Arc<Connection>, id: Option<String>) -> Result<(), HandlerError> {
    require_owner(conn).await?;
    let holders = PermResolver::new(&conn.db)
        .list_holders(None, None, None, None, false)
        .await
        .map_err(HandlerError::from_perm)?;
    conn.reply(ServerMessage::GetGroupHoldersResult { holders }, id);
    Ok(())
}
