//! beacon.toml configuration parser.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::SystemOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid duration {0:?} (expected e.g. \"5s\", \"500ms\", \"1m\")")]
    Duration(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeaconConfig {
    pub client: ClientConfig,
    pub system: Option<SystemConfig>,
    pub heartbeat: Option<HeartbeatConfig>,
    pub monitor: Option<MonitorConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    pub token: Option<String>,
    /// Per-call timeout, defaults to 5s.
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    pub name: String,
    pub tenant: String,
    pub feature_instance_path: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    pub name: String,
    pub interval: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Locator of the feature-instance document (path or URL).
    pub source: String,
    pub interval: Option<String>,
}

impl BeaconConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Scaffold a config for a system registered under `feature_instance_path`.
    pub fn scaffold(base_url: &str, tenant: &str, name: &str, feature_instance_path: &str) -> Self {
        BeaconConfig {
            client: ClientConfig {
                base_url: base_url.to_string(),
                token: None,
                timeout: Some("5s".to_string()),
            },
            system: Some(SystemConfig {
                name: name.to_string(),
                tenant: tenant.to_string(),
                feature_instance_path: feature_instance_path.to_string(),
                display_name: None,
                description: None,
            }),
            heartbeat: Some(HeartbeatConfig {
                name: "heartbeat".to_string(),
                interval: "10s".to_string(),
            }),
            monitor: None,
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Result<Duration, ConfigError> {
        duration_or(self.timeout.as_deref(), Duration::from_secs(5))
    }
}

impl SystemConfig {
    pub fn options(&self) -> SystemOptions {
        SystemOptions {
            name: self.name.clone(),
            tenant: Some(self.tenant.clone()),
            display_name: self.display_name.clone(),
            description: self.description.clone(),
            feature_instance_path: Some(self.feature_instance_path.clone()),
        }
    }
}

impl HeartbeatConfig {
    pub fn interval(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.interval).ok_or_else(|| ConfigError::Duration(self.interval.clone()))
    }
}

impl MonitorConfig {
    pub fn interval(&self) -> Result<Duration, ConfigError> {
        duration_or(self.interval.as_deref(), Duration::from_secs(30))
    }
}

fn duration_or(value: Option<&str>, default: Duration) -> Result<Duration, ConfigError> {
    match value {
        Some(s) => parse_duration(s).ok_or_else(|| ConfigError::Duration(s.to_string())),
        None => Ok(default),
    }
}

/// Parse a duration string like "5s", "500ms", "1m".
///
/// A bare number is taken as seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
