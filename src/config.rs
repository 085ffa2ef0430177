use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Environment variable read by [`SaverConfig::from_env`].
pub const RETRIES_ENV_VAR: &str = "VERSIONED_SAVE_RETRIES";

/// Retries permitted after the first attempt when nothing is configured.
pub const DEFAULT_RETRIES: u32 = 2;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid saver config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid retries value '{0}': expected an integer")]
    InvalidRetries(String),
}

/// Saver configuration
///
/// Negative retry counts coming from JSON or the environment mean
/// "no retries" and are clamped to 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaverConfig {
    /// Maximum number of retry attempts after the first
    #[serde(default = "default_retries", deserialize_with = "deserialize_retries")]
    pub retries: u32,
}

impl SaverConfig {
    pub fn new() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
        }
    }

    /// Set maximum retries
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Parse from a JSON object such as `{"retries": 5}`
    ///
    /// A missing `retries` key keeps the default.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read `VERSIONED_SAVE_RETRIES`, falling back to the default when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(RETRIES_ENV_VAR) {
            Ok(raw) => Ok(Self::new().retries(parse_retries(&raw)?)),
            Err(_) => Ok(Self::new()),
        }
    }
}

impl Default for SaverConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn default_retries() -> u32 {
    DEFAULT_RETRIES
}

fn clamp_retries(raw: i64) -> u32 {
    u32::try_from(raw.max(0)).unwrap_or(u32::MAX)
}

fn deserialize_retries<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    i64::deserialize(deserializer).map(clamp_retries)
}

pub(crate) fn parse_retries(raw: &str) -> Result<u32, ConfigError> {
    raw.trim()
        .parse::<i64>()
        .map(clamp_retries)
        .map_err(|_| ConfigError::InvalidRetries(raw.to_string()))
}
