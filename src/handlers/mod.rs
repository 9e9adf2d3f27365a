//! One module per verb family; `dispatch` is the single match that routes
//! a decoded message to its handler.

mod auth;
mod channels;
mod groups;
mod messaging;
mod misc;

use std::sync::Arc;

use crate::codec::ClientMessage;
use crate::error::HandlerError;
use crate::session::Connection;

pub async fn dispatch(
    conn: Arc<Connection>,
    message: ClientMessage,
    id: Option<String>,
) -> Result<(), HandlerError> {
    match message {
        ClientMessage::Register { name, pass } => auth::register(&conn, id, name, pass).await,
        ClientMessage::Login { name, pass } => auth::login(&conn, id, name, pass).await,
        ClientMessage::Quit => misc::quit(&conn, id).await,

        ClientMessage::NewChannel { name, topic } => channels::new_channel(&conn, id, name, topic).await,
        ClientMessage::DeleteChannel { name } => channels::delete_channel(&conn, id, name).await,
        ClientMessage::ChannelTopic { name, topic } => channels::channel_topic(&conn, id, name, topic).await,
        ClientMessage::Subscribe { name, subbed } => channels::subscribe(&conn, id, name, subbed).await,
        ClientMessage::ListChannels { client_supplied_channels } => {
            channels::list_channels(&conn, id, client_supplied_channels).await
        }

        ClientMessage::PostMessage { content, channel } => {
            messaging::post_message(&conn, id, content, channel).await
        }
        ClientMessage::GetMessages { channel_id, before_id, amount } => {
            messaging::get_messages(&conn, id, channel_id, before_id, amount).await
        }
        ClientMessage::DeleteMessage { id: message_id } => {
            messaging::delete_message(&conn, id, message_id).await
        }
        ClientMessage::Typing { channel, typing } => messaging::typing(&conn, id, channel, typing).await,

        ClientMessage::ListUsers => misc::list_users(&conn, id).await,
        ClientMessage::Kick { id: target_id, username, ban } => {
            misc::kick(&conn, id, target_id, username, ban).await
        }

        ClientMessage::NewGroup { name } => groups::new_group(&conn, id, name).await,
        ClientMessage::DeleteGroup { name } => groups::delete_group(&conn, id, name).await,
        ClientMessage::SetFlag { group, name, flag } => groups::set_flag(&conn, id, group, name, flag).await,
        ClientMessage::DeleteFlag { group, name } => groups::delete_flag(&conn, id, group, name).await,
        ClientMessage::NewGroupHolder { group, user, channel } => {
            groups::new_group_holder(&conn, id, group, user, channel).await
        }
        ClientMessage::DeleteGroupHolder { id: holder_id } => {
            groups::delete_group_holder(&conn, id, holder_id).await
        }
        ClientMessage::GetGroupHolders => groups::get_group_holders(&conn, id).await,
    }
}
