//! Configuration file support.
//!
//! A factory can be tuned from a TOML file:
//!
//! ```toml
//! [factory]
//! single_flight = true
//!
//! [activation]
//! "factory.activation::alloc::string::String::legacy" = false
//!
//! [settings]
//! mode = "dev"
//! ```
//!
//! Activation entries become activation flags, settings become `String`
//! components named after their key.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Factory configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Resolver settings
    pub factory: FactoryConfig,

    /// Activation flags, by activation key
    pub activation: BTreeMap<String, bool>,

    /// Plain string settings, by component id
    pub settings: BTreeMap<String, String>,
}

/// Resolver-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryConfig {
    /// Build each name at most once even under concurrent requests
    #[serde(default = "default_true")]
    pub single_flight: bool,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        FactoryConfig {
            single_flight: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        // single_flight defaults to true, so only an explicit opt-out is merged
        if !other.factory.single_flight {
            self.factory.single_flight = false;
        }
        self.activation.extend(other.activation);
        self.settings.extend(other.settings);
    }

    /// Activation entries rendered as flag values (`"true"` / `"false"`).
    pub fn activation_flags(&self) -> BTreeMap<String, String> {
        self.activation
            .iter()
            .map(|(key, active)| (key.clone(), active.to_string()))
            .collect()
    }
}
