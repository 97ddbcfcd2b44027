//! Application-level configuration loading: share link base, polling cadence and retry budget.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::game::GameId;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "DECK_BAN_BACK_CONFIG_PATH";
/// Environment variable that overrides the configured public URL.
const PUBLIC_URL_ENV: &str = "DECK_BAN_PUBLIC_URL";

const DEFAULT_PUBLIC_URL: &str = "http://localhost:5173/";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_MAX_UPDATE_ATTEMPTS: u32 = 3;
const DEFAULT_EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    public_url: String,
    poll_interval: Duration,
    max_update_attempts: u32,
    event_capacity: usize,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        public_url = %app_config.public_url,
                        "loaded configuration"
                    );
                    app_config
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
        };

        match env::var(PUBLIC_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => config.with_public_url(url),
            _ => config,
        }
    }

    /// Replace the front-end URL share links point to.
    pub fn with_public_url(mut self, url: impl Into<String>) -> Self {
        self.public_url = url.into().trim().to_string();
        self
    }

    /// Replace the interval at which watched games are reloaded from storage.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Link a second player opens to join `game_id` (`<public_url>?gameId=<id>`).
    pub fn share_link(&self, game_id: &GameId) -> String {
        let base = self
            .public_url
            .split_once('?')
            .map_or(self.public_url.as_str(), |(base, _)| base);
        format!("{base}?gameId={game_id}")
    }

    /// Interval at which watched games are reloaded from storage.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Attempts made for one player command when writes conflict.
    pub fn max_update_attempts(&self) -> u32 {
        self.max_update_attempts
    }

    /// Capacity of each per-game broadcast channel.
    pub fn event_capacity(&self) -> usize {
        self.event_capacity
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            public_url: DEFAULT_PUBLIC_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_update_attempts: DEFAULT_MAX_UPDATE_ATTEMPTS,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    public_url: Option<String>,
    poll_interval_ms: Option<u64>,
    max_update_attempts: Option<u32>,
    event_capacity: Option<usize>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            public_url: value
                .public_url
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty())
                .unwrap_or(defaults.public_url),
            poll_interval: value
                .poll_interval_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            max_update_attempts: value
                .max_update_attempts
                .filter(|attempts| *attempts > 0)
                .unwrap_or(defaults.max_update_attempts),
            event_capacity: value
                .event_capacity
                .filter(|capacity| *capacity > 0)
                .unwrap_or(defaults.event_capacity),
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
    fn share_link_carries_game_id() {
        let config = AppConfig::default().with_public_url("https://bans.example/app");
        let id = GameId::parse("k3j9x0abc").unwrap();
        assert_eq!(
            config.share_link(&id),
            "https://bans.example/app?gameId=k3j9x0abc"
        );
    }

    #[test]
    fn share_link_replaces_existing_query() {
        let config = AppConfig::default().with_public_url("https://bans.example/?gameId=old");
        let id = GameId::parse("new").unwrap();
        assert_eq!(config.share_link(&id), "https://bans.example/?gameId=new");
    }

    #[test]
    fn raw_config_falls_back_per_field() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"public_url":"https://x.test/","poll_interval_ms":0}"#)
                .unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(config.public_url, "https://x.test/");
        assert_eq!(config.poll_interval(), DEFAULT_POLL_INTERVAL);
        assert_eq!(config.max_update_attempts(), DEFAULT_MAX_UPDATE_ATTEMPTS);
    }
}
