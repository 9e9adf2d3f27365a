//! Entity types for the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub passhash: String,
    pub owner: bool,
    pub banned: bool,
    pub ip: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: i64,
    pub name: String,
    pub topic: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    #[serde(rename = "channel-id")]
    pub channel_id: i64,
    #[serde(rename = "author-id")]
    pub author_id: i64,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub pings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupFlag {
    pub id: i64,
    #[serde(rename = "group-id")]
    pub group_id: i64,
    pub name: String,
    pub flag: Value,
}

/// `user_id`/`channel_id` of `None` are the NULL wildcards: a holder with
/// `user_id: None` grants its flag to every user, and likewise `channel_id:
/// None` grants it in every channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupHolder {
    pub id: i64,
    #[serde(rename = "group-id")]
    pub group_id: i64,
    #[serde(rename = "user-id")]
    pub user_id: Option<i64>,
    #[serde(rename = "channel-id")]
    pub channel_id: Option<i64>,
}

/// A single row returned by a list-mode permission query, annotating
/// a matching holder with its owning group and the flag it grants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagQueryResult {
    pub holder: GroupHolder,
    #[serde(rename = "group-name")]
    pub group_name: String,
    #[serde(rename = "flag-id")]
    pub flag_id: i64,
    #[serde(rename = "flag-name")]
    pub flag_name: String,
    pub flag: Value,
}
