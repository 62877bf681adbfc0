use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::pattern::validate_patterns;
use crate::error::ConfigError;

/// Refresh interval used when the configuration doesn't set one.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Configuration for file based discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileSdConfig {
    /// Glob patterns of files holding target groups.
    #[serde(default)]
    pub files: Vec<String>,
    /// Interval of the periodic full re-scan, e.g. `"30s"` or `"5m"`.
    #[serde(default = "default_refresh_interval", with = "humantime_duration")]
    pub refresh_interval: Duration,
}

fn default_refresh_interval() -> Duration {
    DEFAULT_REFRESH_INTERVAL
}

impl Default for FileSdConfig {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

impl FileSdConfig {
    pub fn new<I, S>(files: I, refresh_interval: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
            refresh_interval,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_patterns(&self.files)?;
        if self.refresh_interval.is_zero() {
            return Err(ConfigError::InvalidInterval(
                humantime::format_duration(self.refresh_interval).to_string(),
            ));
        }
        Ok(())
    }
}

mod humantime_duration {
    use std::time::Duration;

    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim())
            .map_err(|e| D::Error::custom(format!("invalid duration '{}': {}", raw, e)))
    }
}
