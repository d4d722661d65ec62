use std::{net::SocketAddr, path::PathBuf};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://tasks.db";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid BIND_ADDR `{value}`: {source}")]
    InvalidBindAddr { value: String, source: std::net::AddrParseError },
}

/// Runtime settings, read from the environment (and `.env` when present).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub log_filter: String,
    /// When set, logs go to this file instead of stdout.
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let bind = non_empty("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind
            .parse()
            .map_err(|source| ConfigError::InvalidBindAddr { value: bind.clone(), source })?;
        Ok(Self {
            database_url: non_empty("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            bind_addr,
            log_filter: non_empty("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            log_file: non_empty("TASKS_LOG_FILE").map(PathBuf::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.bind_addr, "127.0.0.1:3000".parse().unwrap());
        assert_eq!(config.log_filter, "info");
        assert!(config.log_file.is_none());
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("BIND_ADDR", "0.0.0.0:8080"),
            ("RUST_LOG", "tasklist=debug"),
            ("TASKS_LOG_FILE", "/tmp/tasks.log"),
        ]))
        .unwrap();
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.log_filter, "tasklist=debug");
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/tasks.log")));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = Config::from_lookup(lookup(&[("DATABASE_URL", "  ")])).unwrap();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
    }

    #[test]
    fn bad_bind_addr_is_an_error() {
        let err = Config::from_lookup(lookup(&[("BIND_ADDR", "localhost")])).unwrap_err();
        assert!(err.to_string().contains("localhost"));
    }
}
