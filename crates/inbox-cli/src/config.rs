//! Configuration loaded from environment variables.

use std::env;

use sender_unsubscribe::{ConfigError as UnsubscribeConfigError, UnsubscribeConfig};

const DEFAULT_DATABASE_URL: &str = "sqlite:inbox.db?mode=rwc";

/// CLI configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database URL.
    pub database_url: String,
    pub unsubscribe: UnsubscribeConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `SQLITE_PATH` | SQLite database URL | `sqlite:inbox.db?mode=rwc` |
    /// | `UNSUBSCRIBE_TIMEOUT_SECS` | Per-request timeout | `10` |
    /// | `UNSUBSCRIBE_MAX_REDIRECTS` | Redirect budget per attempt | `5` |
    /// | `UNSUBSCRIBE_ATTEMPT_DEADLINE_SECS` | Deadline for a whole attempt | (none) |
    /// | `UNSUBSCRIBE_USER_AGENT` | User agent header | `InboxZeroBot/1.0` |
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("SQLITE_PATH").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let unsubscribe = UnsubscribeConfig::from_env()?;

        Ok(Self {
            database_url,
            unsubscribe,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid unsubscribe configuration: {0}")]
    Unsubscribe(#[from] UnsubscribeConfigError),
}
