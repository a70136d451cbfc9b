//! Configuration for vision operations
//!
//! Values are merged with precedence defaults < caller overrides <
//! environment (`SCREEN_VISION_*`), coerced, then validated.

use std::time::Duration;
use thiserror::Error;

/// Prefix of environment variables read by [`MatchConfig::load`]
pub const ENV_PREFIX: &str = "SCREEN_VISION_";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for '{key}': {value}. {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("'{key}' {requirement} (got {value})")]
    OutOfRange {
        key: &'static str,
        requirement: &'static str,
        value: f64,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Process-wide match defaults. Immutable once loaded; operations apply
/// per-call overrides without touching it.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchConfig {
    /// Minimum similarity for a match (0.0 to 1.0)
    pub similarity: f64,
    /// Default operation timeout in seconds
    pub timeout: f64,
    /// Draw highlight overlays around matches
    pub highlight: bool,
    /// How long highlights stay visible, in seconds
    pub highlight_time: f64,
    /// Screen searched by every operation
    pub screen_id: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            similarity: 0.7,
            timeout: 1.0,
            highlight: true,
            highlight_time: 2.0,
            screen_id: 0,
        }
    }
}

impl MatchConfig {
    /// Load configuration from caller overrides and the process environment.
    pub fn load<K, V>(overrides: &[(K, V)]) -> ConfigResult<Self>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self::load_from(overrides, std::env::vars())
    }

    /// Same as [`MatchConfig::load`] with an explicit environment.
    pub fn load_from<K, V, E>(overrides: &[(K, V)], env: E) -> ConfigResult<Self>
    where
        K: AsRef<str>,
        V: AsRef<str>,
        E: IntoIterator<Item = (String, String)>,
    {
        let mut config = Self::default();

        for (key, value) in overrides {
            config.apply(key.as_ref(), value.as_ref())?;
        }

        let mut env_values: Vec<(String, String)> = env
            .into_iter()
            .filter_map(|(name, value)| {
                name.strip_prefix(ENV_PREFIX)
                    .map(|key| (key.to_string(), value))
            })
            .collect();
        env_values.sort();
        for (key, value) in &env_values {
            config.apply(key, value)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Coerce and store one raw `key=value` pair. Unknown keys are ignored.
    fn apply(&mut self, raw_key: &str, raw_value: &str) -> ConfigResult<()> {
        let key = raw_key.trim().to_lowercase().replace('-', "_");
        match key.as_str() {
            "similarity" => self.similarity = parse_float(raw_key, raw_value)?,
            "timeout" => self.timeout = parse_float(raw_key, raw_value)?,
            "highlight" => self.highlight = parse_bool(raw_key, raw_value)?,
            "highlight_time" => self.highlight_time = parse_float(raw_key, raw_value)?,
            "screen_id" => {
                self.screen_id =
                    raw_value
                        .trim()
                        .parse::<usize>()
                        .map_err(|e| ConfigError::InvalidValue {
                            key: raw_key.to_string(),
                            value: raw_value.to_string(),
                            reason: e.to_string(),
                        })?
            }
            _ => log::debug!("Ignoring unknown config key '{}'", raw_key),
        }
        Ok(())
    }

    /// Check every field against its allowed range
    pub fn validate(&self) -> ConfigResult<()> {
        validate_similarity(self.similarity)?;
        validate_timeout(self.timeout)?;
        validate_seconds("highlight_time", self.highlight_time)?;
        Ok(())
    }
}

pub fn validate_similarity(value: f64) -> ConfigResult<f64> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::OutOfRange {
            key: "similarity",
            requirement: "must be between 0.0 and 1.0",
            value,
        })
    }
}

pub fn validate_timeout(value: f64) -> ConfigResult<Duration> {
    validate_seconds("timeout", value)
}

/// A positive number of seconds that fits in a [`Duration`]
pub fn validate_seconds(key: &'static str, value: f64) -> ConfigResult<Duration> {
    match Duration::try_from_secs_f64(value) {
        Ok(duration) if value > 0.0 => Ok(duration),
        _ => Err(ConfigError::OutOfRange {
            key,
            requirement: "must be > 0 and fit in a duration",
            value,
        }),
    }
}

fn parse_float(key: &str, value: &str) -> ConfigResult<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// Only "true"/"false" (any case) are accepted
fn parse_bool(key: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: "string must be 'true' or 'false' (case insensitive)".to_string(),
        }),
    }
}
