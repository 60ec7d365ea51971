//! Client configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{core::store::RefreshPolicy, runtime::handle::RuntimeConfig};

/// Failure loading a [`ClientConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid config JSON.
    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Settings for the API client and the optimistic collections.
///
/// Every field is optional in JSON; missing ones take the defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend origin, e.g. `http://localhost:3001`.
    pub api_base_url: String,
    /// Per-request HTTP timeout.
    pub request_timeout_ms: u64,
    /// Auto-rollback window for single-field toggles.
    pub toggle_timeout_ms: u64,
    /// Auto-rollback window for multi-field updates.
    pub update_timeout_ms: u64,
    /// Auto-rollback window for creates.
    pub create_timeout_ms: u64,
    /// Auto-rollback window for deletes.
    pub delete_timeout_ms: u64,
    /// What a refresh does while operations are pending.
    pub refresh_policy: RefreshPolicy,
    /// Collection runtime sizing.
    pub runtime: RuntimeConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3001".to_string(),
            request_timeout_ms: 30_000,
            toggle_timeout_ms: 10_000,
            update_timeout_ms: 15_000,
            create_timeout_ms: 15_000,
            delete_timeout_ms: 10_000,
            refresh_policy: RefreshPolicy::Defer,
            runtime: RuntimeConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Parses config JSON.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Reads and parses a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
