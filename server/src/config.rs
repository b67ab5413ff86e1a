//! Configuration management for the sync daemon.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Daemon configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Control surface host address
    pub host: String,
    /// Control surface port
    pub port: u16,
    /// Base URL of the remote REST store; `None` runs against an in-memory store
    pub remote_url: Option<String>,
    /// API key for the remote store
    pub remote_api_key: Option<String>,
    /// Where the queue and cache snapshot is persisted
    pub state_path: PathBuf,
    /// How often connectivity is probed
    pub probe_interval: Duration,
    /// Per-item replay timeout; `None` waits indefinitely
    pub replay_timeout: Option<Duration>,
    /// Bearer secret for the control surface
    pub auth_secret: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let remote_url = non_empty("REMOTE_URL").map(|url| url.trim_end_matches('/').to_string());
        let remote_api_key = non_empty("REMOTE_API_KEY");

        let state_path = env::var("STATE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("rindang-sync.json"));

        let probe_interval = match non_empty("PROBE_INTERVAL_SECS") {
            Some(raw) => parse_secs("PROBE_INTERVAL_SECS", &raw)?,
            None => Duration::from_secs(15),
        };

        let replay_timeout = non_empty("REPLAY_TIMEOUT_SECS")
            .map(|raw| parse_secs("REPLAY_TIMEOUT_SECS", &raw))
            .transpose()?;

        let auth_secret = non_empty("AUTH_SECRET");

        Ok(Self {
            host,
            port,
            remote_url,
            remote_api_key,
            state_path,
            probe_interval,
            replay_timeout,
            auth_secret,
        })
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_secs(key: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidDuration(key)),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("Invalid {0} value: expected a positive number of seconds")]
    InvalidDuration(&'static str),
}
