use std::sync::Arc;

use crate::codec::ServerMessage;
use crate::error::HandlerError;
use crate::perm::PermResolver;
use crate::session::Connection;

pub async fn new_channel(
    conn: &Arc<Connection>,
    id: Option<String>,
    name: String,
    topic: String,
) -> Result<(), HandlerError> {
    let username = conn.info.username();
    if !PermResolver::new(&conn.db)
        .has_perm(&username, &name, "perms.new-channel")
        .await
        .map_err(HandlerError::from_perm)?
    {
        return Err(HandlerError::NoPermission);
    }

    conn.db
        .channels()
        .new_channel(&name, &topic)
        .await
        .map_err(HandlerError::from_store)?;

    conn.reply(ServerMessage::Ok { message: "channel created".into() }, id);
    conn.registry
        .broadcast(ServerMessage::NewChannel { name: name.clone(), topic: topic.clone() });
    Ok(())
}

pub async fn delete_channel(
    conn: &Arc<Connection>,
    id: Option<String>,
    name: String,
) -> Result<(), HandlerError> {
    let username = conn.info.username();
    if !PermResolver::new(&conn.db)
        .has_perm(&username, &name, "perms.delete-channel")
        .await
        .map_err(HandlerError::from_perm)?
    {
        return Err(HandlerError::NoPermission);
    }

    conn.db.channels().delete_by_name(&name).await.map_err(HandlerError::from_store)?;

    conn.reply(ServerMessage::Ok { message: "channel deleted".into() }, id);
    conn.registry.broadcast(ServerMessage::DeleteChannel { name: name.clone() });
    Ok(())
}

pub async fn channel_topic(
    conn: &Arc<Connection>,
    id: Option<String>,
    name: String,
    topic: String,
) -> Result<(), HandlerError> {
    let username = conn.info.username();
    if !PermResolver::new(&conn.db)
        .has_perm(&username, &name, "perms.channel-topic")
        .await
        .map_err(HandlerError::from_perm)?
    {
        return Err(HandlerError::NoPermission);
    }

    conn.db.channels().set_topic(&name, &topic).await.map_err(HandlerError::from_store)?;

    conn.reply(ServerMessage::Ok { message: "topic updated".into() }, id);
    conn.registry
        .broadcast(ServerMessage::ChannelTopic { name: name.clone(), topic: topic.clone() });
    Ok(())
}

pub async fn subscribe(
    conn: &Arc<Connection>,
    id: Option<String>,
    name: String,
    subbed: bool,
) -> Result<(), HandlerError> {
    let username = conn.info.username();
    if !PermResolver::new(&conn.db)
        .has_perm(&username, &name, "perms.subscribe")
        .await
        .map_err(HandlerError::from_perm)?
    {
        return Err(HandlerError::NoPermission);
    }
    conn.db.channels().get_by_name(&name).await.map_err(HandlerError::from_store)?;

    if subbed {
        conn.info.subscribe(&name);
    } else {
        conn.info.unsubscribe(&name);
    }

    conn.reply(ServerMessage::Ok { message: "subscription updated".into() }, id);
    Ok(())
}

pub async fn list_channels(
    conn: &Arc<Connection>,
    id: Option<String>,
    client_supplied_channels: bool,
) -> Result<(), HandlerError> {
    let username = conn.info.username();
    if !PermResolver::new(&conn.db)
        .has_perm(&username, "", "perms.list-channels")
        .await
        .map_err(HandlerError::from_perm)?
    {
        return Err(HandlerError::NoPermission);
    }

    if client_supplied_channels {
        conn.reply(
            ServerMessage::Note { message: "`channels` field is server-assigned and was ignored".into() },
            None,
        );
    }

    let channels = conn.db.channels().list().await.map_err(HandlerError::from_store)?;
    conn.reply(ServerMessage::ListChannels { channels }, id);
    Ok(())
}
