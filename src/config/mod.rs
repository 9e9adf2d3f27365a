//! Config file loading and validation. The file itself and its location
//! resolution (`--config <path>`) are the only pieces of this module that
//! touch the outside world; everything else is pure parsing/validation.

mod types;

pub use types::Config;

use std::time::Duration;
use thiserror::Error;

use crate::retention::parse_iso8601_duration;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("cannot parse config file {path}: {source}")]
    Parse { path: String, source: serde_json::Error },
    #[error("invalid `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub const DEFAULT_PATH: &str = "./melodious.config.json";

pub fn load(path: &str) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_string(),
        source,
    })?;
    let config: Config = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_string(),
        source,
    })?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.db_addr.is_empty() {
        return Err(ConfigError::Invalid { field: "db-addr", reason: "must not be empty".into() });
    }
    if config.http_addr.is_empty() {
        return Err(ConfigError::Invalid { field: "http-addr", reason: "must not be empty".into() });
    }
    parse_iso8601_duration(&config.delete_history_every)
        .map_err(|reason| ConfigError::Invalid { field: "delete-history-every", reason })?;
    parse_iso8601_duration(&config.store_history_for)
        .map_err(|reason| ConfigError::Invalid { field: "store-history-for", reason })?;
    Ok(())
}

impl Config {
    pub fn delete_history_every(&self) -> Duration {
        parse_iso8601_duration(&self.delete_history_every).expect("validated at load time")
    }

    pub fn store_history_for(&self) -> Duration {
        parse_iso8601_duration(&self.store_history_for).expect("validated at load time")
    }
}

/// Resolves `--config <path>` from CLI args, defaulting to [`DEFAULT_PATH`].
pub fn resolve_config_path(args: &[String]) -> String {
    args.iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .cloned()
        .unwrap_or_else(|| DEFAULT_PATH.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_path_defaults_when_absent() {
        let args: Vec<String> = vec!["melodiousd".into()];
        assert_eq!(resolve_config_path(&args), DEFAULT_PATH);
    }

    #[test]
    fn resolve_path_picks_up_flag() {
        let args: Vec<String> = vec!["melodiousd".into(), "--config".into(), "/etc/melodious.json".into()];
        assert_eq!(resolve_config_path(&args), "/etc/melodious.json");
    }

    #[test]
    fn validate_rejects_bad_duration() {
        let config = Config {
            db_addr: "db.sqlite".into(),
            http_addr: "0.0.0.0:9000".into(),
            delete_history_every: "garbage".into(),
            store_history_for: "P30D".into(),
            metrics_addr: None,
        };
        assert!(validate(&config).is_err());
    }

    #[test]
    fn load_missing_file_is_a_read_error() {
        let err = load("/nonexistent/path/melodious.config.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}

