//! # Store Configuration
//!
//! Pool and reservation sizes, loaded once at startup from TOML.
//!
//! ```toml
//! default_pool_size = 256
//! initial_capacity = 1024
//!
//! [pools]
//! Transform = 4096
//! Sprite = 2048
//! ```

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::ecs::ComponentType;
use crate::error::ConfigError;

/// Sizing configuration for a [`ComponentStore`](crate::ComponentStore).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Pool size for types without an entry in `pools`.
    pub default_pool_size: usize,
    /// Entities reserved per type at registration.
    pub initial_capacity: usize,
    /// Pool size overrides keyed by component type name.
    pub pools: HashMap<String, usize>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_pool_size: 128,
            initial_capacity: 0,
            pools: HashMap::new(),
        }
    }
}

impl StoreConfig {
    /// Parses a configuration from TOML text.
    ///
    /// Missing keys take their default value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML or unknown keys.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Parse`] if it is not a valid configuration.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Pool size to use for a component type.
    #[must_use]
    pub fn pool_size_for(&self, component_type: ComponentType) -> usize {
        self.pools
            .get(component_type.name())
            .copied()
            .unwrap_or(self.default_pool_size)
    }
}
