use serde::Deserialize;

/// On-disk config shape. `metrics-addr` is an ambient addition beyond the
/// documented wire contract: omitting it (or setting it to an empty
/// string) disables the metrics endpoint, matching the "port 0 disables
/// it" convention used elsewhere in the stack.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(rename = "db-addr")]
    pub db_addr: String,
    #[serde(rename = "http-addr")]
    pub http_addr: String,
    #[serde(rename = "delete-history-every")]
    pub delete_history_every: String,
    #[serde(rename = "store-history-for")]
    pub store_history_for: String,
    #[serde(rename = "metrics-addr", default)]
    pub metrics_addr: Option<String>,
}
