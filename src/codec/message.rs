use crate::db::{ChatMessage, FlagQueryResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed message: {0}")]
    Malformed(String),
    #[error("unserializable message: {0}")]
    Unserializable(String),
}

fn field<'a>(obj: &'a Value, name: &str) -> Result<&'a Value, CodecError> {
    obj.get(name)
        .ok_or_else(|| CodecError::Malformed(format!("missing field `{name}`")))
}

fn str_field(obj: &Value, name: &str) -> Result<String, CodecError> {
    field(obj, name)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| CodecError::Malformed(format!("field `{name}` must be a string")))
}

fn opt_str_field(obj: &Value, name: &str) -> Option<String> {
    obj.get(name).and_then(Value::as_str).map(str::to_string)
}

fn bool_field(obj: &Value, name: &str) -> Result<bool, CodecError> {
    field(obj, name)?
        .as_bool()
        .ok_or_else(|| CodecError::Malformed(format!("field `{name}` must be a bool")))
}

/// Accepts both JSON integers and floats, per the wire contract's numeric
/// tolerance — but a float with a nonzero fractional part is malformed, not
/// silently truncated.
fn int_field(obj: &Value, name: &str) -> Result<i64, CodecError> {
    let v = field(obj, name)?;
    if let Some(i) = v.as_i64() {
        return Ok(i);
    }
    if let Some(f) = v.as_f64() {
        if f.fract() != 0.0 {
            return Err(CodecError::Malformed(format!(
                "field `{name}` must be an integer, got a fractional value"
            )));
        }
        return Ok(f as i64);
    }
    Err(CodecError::Malformed(format!("field `{name}` must be numeric")))
}

/// Requests a client may send. Only verbs a client originates are
/// represented here; purely server-emitted types (`fatal`, `note`, `ok`,
/// `fail`, broadcasts, `ping`) live on `ServerMessage`.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Quit,
    Register { name: String, pass: String },
    Login { name: String, pass: String },
    NewChannel { name: String, topic: String },
    DeleteChannel { name: String },
    ChannelTopic { name: String, topic: String },
    Subscribe { name: String, subbed: bool },
    PostMessage { content: String, channel: String },
    GetMessages { channel_id: i64, before_id: i64, amount: i64 },
    /// `client_supplied_channels` is true when the request itself carried a
    /// `channels` field, which the server always ignores and warns about.
    ListChannels { client_supplied_channels: bool },
    ListUsers,
    Kick { id: Option<i64>, username: Option<String>, ban: bool },
    NewGroup { name: String },
    DeleteGroup { name: String },
    SetFlag { group: String, name: String, flag: Value },
    DeleteFlag { group: String, name: String },
    NewGroupHolder { group: String, user: String, channel: String },
    DeleteGroupHolder { id: i64 },
    GetGroupHolders,
    Typing { channel: String, typing: bool },
    DeleteMessage { id: i64 },
}

impl ClientMessage {
    pub fn from_envelope(kind: &str, value: Value) -> Result<Self, CodecError> {
        let v = &value;
        Ok(match kind {
            "quit" => ClientMessage::Quit,
            "register" => ClientMessage::Register {
                name: str_field(v, "name")?,
                pass: str_field(v, "pass")?,
            },
            "login" => ClientMessage::Login {
                name: str_field(v, "name")?,
                pass: str_field(v, "pass")?,
            },
            "new-channel" => ClientMessage::NewChannel {
                name: str_field(v, "name")?,
                topic: opt_str_field(v, "topic").unwrap_or_default(),
            },
            "delete-channel" => ClientMessage::DeleteChannel { name: str_field(v, "name")? },
            "channel-topic" => ClientMessage::ChannelTopic {
                name: str_field(v, "name")?,
                topic: str_field(v, "topic")?,
            },
            "subscribe" => ClientMessage::Subscribe {
                name: str_field(v, "name")?,
                subbed: bool_field(v, "subbed")?,
            },
            "post-message" => ClientMessage::PostMessage {
                content: str_field(v, "content")?,
                channel: str_field(v, "channel")?,
            },
            "get-messages" => ClientMessage::GetMessages {
                channel_id: int_field(v, "channel-id")?,
                before_id: int_field(v, "message-id")?,
                amount: int_field(v, "amount")?,
            },
            "list-channels" => ClientMessage::ListChannels {
                client_supplied_channels: v.get("channels").is_some(),
            },
            "list-users" => ClientMessage::ListUsers,
            "kick" => {
                let id = v.get("id").and_then(Value::as_i64);
                let username = opt_str_field(v, "username");
                if id.is_some() && username.is_some() {
                    return Err(CodecError::Malformed(
                        "kick accepts either `id` or `username`, not both".into(),
                    ));
                }
                if id.is_none() && username.is_none() {
                    return Err(CodecError::Malformed("kick requires `id` or `username`".into()));
                }
                ClientMessage::Kick {
                    id,
                    username,
                    ban: v.get("ban").and_then(Value::as_bool).unwrap_or(false),
                }
            }
            "new-group" => ClientMessage::NewGroup { name: str_field(v, "name")? },
            "delete-group" => ClientMessage::DeleteGroup { name: str_field(v, "name")? },
            "set-flag" => ClientMessage::SetFlag {
                group: str_field(v, "group")?,
                name: str_field(v, "name")?,
                flag: v.get("flag").cloned().unwrap_or(Value::Null),
            },
            "delete-flag" => ClientMessage::DeleteFlag {
                group: str_field(v, "group")?,
                name: str_field(v, "name")?,
            },
            "new-group-holder" => ClientMessage::NewGroupHolder {
                group: str_field(v, "group")?,
                user: opt_str_field(v, "user").unwrap_or_default(),
                channel: opt_str_field(v, "channel").unwrap_or_default(),
            },
            "delete-group-holder" => ClientMessage::DeleteGroupHolder { id: int_field(v, "id")? },
            "get-group-holders" => ClientMessage::GetGroupHolders,
            "typing" => ClientMessage::Typing {
                channel: str_field(v, "channel")?,
                typing: bool_field(v, "typing")?,
            },
            "delete-message" => ClientMessage::DeleteMessage { id: int_field(v, "id")? },
            other => return Err(CodecError::Malformed(format!("unrecognized type `{other}`"))),
        })
    }
}

/// A user entry inside a `list-users` result.
#[derive(Debug, Clone, Serialize)]
pub struct UserStatus {
    pub user: String,
    pub online: bool,
}

/// Messages the server emits, either as a direct reply or a broadcast.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    Fatal { message: String },
    Note { message: String },
    Ok { message: String },
    Fail { message: String },
    Register { username: String },
    Login { username: String },
    NewChannel { name: String, topic: String },
    DeleteChannel { name: String },
    ChannelTopic { name: String, topic: String },
    PostMessage { channel: String, message: ChatMessage },
    GetMessagesResult { messages: Vec<ChatMessage> },
    ListChannels { channels: Vec<crate::db::Channel> },
    ListUsers { users: Vec<UserStatus> },
    UserQuit { username: String },
    Ping { message: ChatMessage },
    Typing { channel: String, typing: bool, username: String },
    GetGroupHoldersResult { holders: Vec<FlagQueryResult> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kick_rejects_both_id_and_username() {
        let value = serde_json::json!({"type": "kick", "id": 1, "username": "x", "ban": false});
        let err = ClientMessage::from_envelope("kick", value).unwrap_err();
        assert!(matches!(err, CodecError::Malformed(_)));
    }

    #[test]
    fn kick_accepts_id_only() {
        let value = serde_json::json!({"type": "kick", "id": 1, "ban": true});
        let msg = ClientMessage::from_envelope("kick", value).unwrap();
        assert_eq!(msg, ClientMessage::Kick { id: Some(1), username: None, ban: true });
    }

    #[test]
    fn new_group_holder_defaults_empty_strings() {
        let value = serde_json::json!({"type": "new-group-holder", "group": "mods"});
        let msg = ClientMessage::from_envelope("new-group-holder", value).unwrap();
        assert_eq!(
            msg,
            ClientMessage::NewGroupHolder { group: "mods".into(), user: String::new(), channel: String::new() }
        );
    }
}
