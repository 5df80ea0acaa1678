//! Sample configuration, loaded from environment variables.
//!
//! | Variable            | Default | Meaning                              |
//! |---------------------|---------|--------------------------------------|
//! | `COUNTER_NAME`      | counter | program name on the tracing span     |
//! | `COUNTER_TICK_MS`   | 500     | interval of the tick subscription    |
//! | `COUNTER_MAX_TICKS` | 10      | ticks before the subscription stops  |

use std::env;
use std::time::Duration;

use thiserror::Error;

/// Configuration error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue {
        /// The name of the environment variable.
        key: String,
        /// Description of why the value is invalid.
        message: String,
    },
}

/// Counter sample configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterConfig {
    /// Program name.
    pub name: String,
    /// Interval between ticks.
    pub tick: Duration,
    /// Number of ticks after which the timer subscription is dropped.
    pub max_ticks: u32,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            name: "counter".to_string(),
            tick: Duration::from_millis(500),
            max_ticks: 10,
        }
    }
}

impl CounterConfig {
    /// Loads the configuration from the environment (and a `.env` file if
    /// present).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let name = env::var("COUNTER_NAME").unwrap_or(defaults.name);
        let tick_ms = get_optional_env_parsed("COUNTER_TICK_MS", 500_u64)?;
        let max_ticks = get_optional_env_parsed("COUNTER_MAX_TICKS", defaults.max_ticks)?;

        if tick_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "COUNTER_TICK_MS".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            name,
            tick: Duration::from_millis(tick_ms),
            max_ticks,
        })
    }
}

fn get_optional_env_parsed<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr<Err = std::num::ParseIntError>,
{
    match env::var(key) {
        Ok(value) => value.parse().map_err(|error: std::num::ParseIntError| ConfigError::InvalidValue {
            key: key.to_string(),
            message: error.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn default_config() {
        let config = CounterConfig::default();
        assert_eq!(config.tick, Duration::from_millis(500));
        assert_eq!(config.max_ticks, 10);
    }

    #[rstest]
    fn error_display() {
        let error = ConfigError::InvalidValue {
            key: "COUNTER_TICK_MS".to_string(),
            message: "must be greater than zero".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid value for COUNTER_TICK_MS: must be greater than zero"
        );
    }
}
