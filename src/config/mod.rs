mod loader;

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

pub use loader::load_config;

use crate::dispatchers::new_dispatcher;
use crate::profile::DispatchProfile;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub profiles: Vec<DispatchProfile>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default filter when neither --log-level nor RUST_LOG is set
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        load_config(path)
    }

    /// Check that profile ids are unique and that every profile builds a dispatcher
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for profile in &self.profiles {
            let key = profile.tenant_id();
            if !seen.insert(key.clone()) {
                return Err(ConfigError::Validation(format!("duplicate profile {}", key)));
            }
            new_dispatcher(profile)
                .map_err(|e| ConfigError::Validation(format!("profile {}: {}", key, e)))?;
        }
        Ok(())
    }

    /// Connection ids of every profile, keyed by "tenant:id", after validation
    pub fn conn_ids_by_profile(&self) -> Result<HashMap<String, HashSet<String>>, ConfigError> {
        self.validate()?;
        Ok(self
            .profiles
            .iter()
            .map(|p| (p.tenant_id(), p.conns.iter().map(|c| c.id.clone()).collect()))
            .collect())
    }

    /// Look up a profile by "tenant:id"
    pub fn profile(&self, tenant_id: &str) -> Option<&DispatchProfile> {
        self.profiles.iter().find(|p| p.tenant_id() == tenant_id)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}
