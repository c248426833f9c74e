use std::path::PathBuf;

use tracing::debug;
use tracing_subscriber::EnvFilter;

const DEFAULT_DB_PATH: &str = "./data/fathr-db.json";
const DEFAULT_LOG_FILTER: &str = "info";
const DEFAULT_RECENT_LIMIT: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub db_path: PathBuf,
    pub log_filter: String,
    /// How many of the newest records the dashboard lists.
    pub recent_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            recent_limit: DEFAULT_RECENT_LIMIT,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let db_path = non_empty("FATHR_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));
        let log_filter =
            non_empty("FATHR_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
        let recent_limit = non_empty("FATHR_RECENT_LIMIT")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_RECENT_LIMIT)
            .clamp(1, 20);

        Self {
            db_path,
            log_filter,
            recent_limit,
        }
    }
}

/// Installs the stderr log subscriber; stdout carries protocol frames only.
/// Returns `false` when a global subscriber was already set, which keeps the
/// existing one in place.
pub fn init_tracing(filter: &str) -> bool {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    match tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
    {
        Ok(()) => true,
        Err(err) => {
            debug!(error = %err, "tracing subscriber already installed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = ServerConfig::from_lookup(lookup_from(&[]));
        assert_eq!(cfg, ServerConfig::default());
    }

    #[test]
    fn reads_overrides_and_clamps_limit() {
        let cfg = ServerConfig::from_lookup(lookup_from(&[
            ("FATHR_DB", " /tmp/fathr.json "),
            ("FATHR_LOG", "debug"),
            ("FATHR_RECENT_LIMIT", "99"),
        ]));
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/fathr.json"));
        assert_eq!(cfg.log_filter, "debug");
        assert_eq!(cfg.recent_limit, 20);
    }

    #[test]
    fn second_tracing_init_keeps_first_subscriber() {
        let _ = init_tracing("off");
        assert!(!init_tracing("debug"));
    }

    #[test]
    fn ignores_blank_and_unparsable_values() {
        let cfg = ServerConfig::from_lookup(lookup_from(&[
            ("FATHR_DB", "   "),
            ("FATHR_RECENT_LIMIT", "many"),
        ]));
        assert_eq!(cfg.db_path, PathBuf::from(DEFAULT_DB_PATH));
        assert_eq!(cfg.recent_limit, DEFAULT_RECENT_LIMIT);
    }
}
