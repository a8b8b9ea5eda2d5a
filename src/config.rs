//! Application-level configuration loading: session limits and deadline handling.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use serde_with::{DurationMilliSeconds, serde_as};
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "CLASSPOLL_CONFIG_PATH";

const DEFAULT_CHAT_WINDOW: usize = 50;
const DEFAULT_HISTORY_LIMIT: usize = 10;
const DEFAULT_DEADLINE_GRACE: Duration = Duration::from_millis(500);
const DEFAULT_OBSERVER_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    chat_window: usize,
    history_limit: usize,
    deadline_grace: Duration,
    auto_end_on_deadline: bool,
    observer_capacity: usize,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json_str(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        chat_window = config.chat_window,
                        history_limit = config.history_limit,
                        deadline_grace_ms = config.deadline_grace.as_millis() as u64,
                        auto_end_on_deadline = config.auto_end_on_deadline,
                        "loaded session settings from config"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a JSON document; missing keys keep their default value.
    pub fn from_json_str(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    /// Number of chat messages replayed to peers.
    pub fn chat_window(&self) -> usize {
        self.chat_window
    }

    /// Most ended polls returned by a history request.
    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// Extra time granted to ballots in flight when the deadline passes.
    pub fn deadline_grace(&self) -> Duration {
        self.deadline_grace
    }

    /// Whether the server ends a poll by itself once its deadline passes.
    pub fn auto_end_on_deadline(&self) -> bool {
        self.auto_end_on_deadline
    }

    /// Events buffered per lagging SSE observer.
    pub fn observer_capacity(&self) -> usize {
        self.observer_capacity
    }

    /// Override the deadline grace period.
    pub fn with_deadline_grace(mut self, grace: Duration) -> Self {
        self.deadline_grace = grace;
        self
    }

    /// Override whether expired polls end automatically.
    pub fn with_auto_end_on_deadline(mut self, enabled: bool) -> Self {
        self.auto_end_on_deadline = enabled;
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            chat_window: DEFAULT_CHAT_WINDOW,
            history_limit: DEFAULT_HISTORY_LIMIT,
            deadline_grace: DEFAULT_DEADLINE_GRACE,
            auto_end_on_deadline: true,
            observer_capacity: DEFAULT_OBSERVER_CAPACITY,
        }
    }
}

#[serde_as]
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    chat_window: Option<usize>,
    history_limit: Option<usize>,
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    deadline_grace_ms: Option<Duration>,
    auto_end_on_deadline: Option<bool>,
    observer_capacity: Option<usize>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            chat_window: value
                .chat_window
                .filter(|window| *window > 0)
                .unwrap_or(defaults.chat_window),
            history_limit: value
                .history_limit
                .filter(|limit| *limit > 0)
                .unwrap_or(defaults.history_limit),
            deadline_grace: value.deadline_grace_ms.unwrap_or(defaults.deadline_grace),
            auto_end_on_deadline: value
                .auto_end_on_deadline
                .unwrap_or(defaults.auto_end_on_deadline),
            observer_capacity: value
                .observer_capacity
                .filter(|capacity| *capacity > 0)
                .unwrap_or(defaults.observer_capacity),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = AppConfig::from_json_str("{}").unwrap();
        assert_eq!(config.chat_window(), 50);
        assert_eq!(config.history_limit(), 10);
        assert_eq!(config.deadline_grace(), Duration::from_millis(500));
        assert!(config.auto_end_on_deadline());
    }

    #[test]
    fn overrides_are_applied() {
        let config = AppConfig::from_json_str(
            r#"{"chat_window": 20, "deadline_grace_ms": 1500, "auto_end_on_deadline": false}"#,
        )
        .unwrap();
        assert_eq!(config.chat_window(), 20);
        assert_eq!(config.deadline_grace(), Duration::from_millis(1500));
        assert!(!config.auto_end_on_deadline());
        assert_eq!(config.history_limit(), 10);
    }

    #[test]
    fn zero_limits_fall_back_to_defaults() {
        let config = AppConfig::from_json_str(r#"{"chat_window": 0, "history_limit": 0}"#).unwrap();
        assert_eq!(config.chat_window(), 50);
        assert_eq!(config.history_limit(), 10);
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(AppConfig::from_json_str(r#"{"chat_window": "many"}"#).is_err());
    }
}
