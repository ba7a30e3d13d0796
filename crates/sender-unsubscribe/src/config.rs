//! Configuration for the unsubscribe workflow.

use std::env;
use std::time::Duration;

/// Default deadline for a single HTTP request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of redirects followed per attempt.
pub const DEFAULT_MAX_REDIRECTS: usize = 5;

/// Default `User-Agent` header.
pub const DEFAULT_USER_AGENT: &str = "InboxZeroBot/1.0";

/// Tunables for [`Unsubscriber`](crate::Unsubscriber).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsubscribeConfig {
    /// Deadline for each request, redirect hops included individually.
    pub request_timeout: Duration,
    /// Redirects followed before an attempt is rejected.
    pub max_redirects: usize,
    /// Optional deadline for a whole attempt (all hops of the POST or of
    /// the GET). Unset means only `request_timeout` applies.
    pub attempt_deadline: Option<Duration>,
    pub user_agent: String,
}

impl Default for UnsubscribeConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            attempt_deadline: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl UnsubscribeConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `UNSUBSCRIBE_TIMEOUT_SECS` | Per-request timeout | `10` |
    /// | `UNSUBSCRIBE_MAX_REDIRECTS` | Redirect hops per attempt | `5` |
    /// | `UNSUBSCRIBE_ATTEMPT_DEADLINE_SECS` | Deadline per attempt | (unset) |
    /// | `UNSUBSCRIBE_USER_AGENT` | `User-Agent` header | `InboxZeroBot/1.0` |
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let request_timeout = match read_number("UNSUBSCRIBE_TIMEOUT_SECS")? {
            Some(secs) => Duration::from_secs(secs),
            None => defaults.request_timeout,
        };

        let max_redirects = match read_number("UNSUBSCRIBE_MAX_REDIRECTS")? {
            Some(n) => n as usize,
            None => defaults.max_redirects,
        };

        let attempt_deadline =
            read_number("UNSUBSCRIBE_ATTEMPT_DEADLINE_SECS")?.map(Duration::from_secs);

        let user_agent =
            env::var("UNSUBSCRIBE_USER_AGENT").unwrap_or(defaults.user_agent);

        if request_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }

        Ok(Self {
            request_timeout,
            max_redirects,
            attempt_deadline,
            user_agent,
        })
    }
}

fn read_number(var: &'static str) -> Result<Option<u64>, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
        Err(_) => Ok(None),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("UNSUBSCRIBE_TIMEOUT_SECS must be greater than zero")]
    ZeroTimeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = UnsubscribeConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.max_redirects, 5);
        assert!(config.attempt_deadline.is_none());
        assert_eq!(config.user_agent, "InboxZeroBot/1.0");
    }

    #[test]
    fn test_from_env() {
        // Only test that touches these variables.
        env::set_var("UNSUBSCRIBE_TIMEOUT_SECS", "3");
        env::set_var("UNSUBSCRIBE_MAX_REDIRECTS", "2");
        env::set_var("UNSUBSCRIBE_ATTEMPT_DEADLINE_SECS", "20");
        let config = UnsubscribeConfig::from_env().unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.max_redirects, 2);
        assert_eq!(config.attempt_deadline, Some(Duration::from_secs(20)));

        env::set_var("UNSUBSCRIBE_MAX_REDIRECTS", "lots");
        assert!(matches!(
            UnsubscribeConfig::from_env(),
            Err(ConfigError::InvalidNumber { var: "UNSUBSCRIBE_MAX_REDIRECTS", .. })
        ));

        env::set_var("UNSUBSCRIBE_MAX_REDIRECTS", "2");
        env::set_var("UNSUBSCRIBE_TIMEOUT_SECS", "0");
        assert!(matches!(
            UnsubscribeConfig::from_env(),
            Err(ConfigError::ZeroTimeout)
        ));

        env::remove_var("UNSUBSCRIBE_TIMEOUT_SECS");
        env::remove_var("UNSUBSCRIBE_MAX_REDIRECTS");
        env::remove_var("UNSUBSCRIBE_ATTEMPT_DEADLINE_SECS");
    }
}
