//! Configuration management for caserne.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "caserne";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "registry.db";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `CASERNE_`)
/// 2. TOML config file at `~/.config/caserne/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Display configuration.
    pub display: DisplayConfig,
    /// Registry configuration.
    pub registry: RegistryConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/caserne/registry.db`
    pub database_path: Option<PathBuf>,
}

/// Display-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Image shown for records that carry no photo of their own.
    pub fallback_photo_url: String,
    /// Number of records shown per page in list output.
    pub page_size: usize,
}

/// Registry-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Station names offered when assigning personnel and accounts.
    pub affectation_options: Vec<String>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            fallback_photo_url: "https://placehold.co/400x300?text=Photo".to_string(),
            page_size: 50,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            affectation_options: default_affectation_options(),
        }
    }
}

/// Default station names.
fn default_affectation_options() -> Vec<String> {
    [
        "Noyon",
        "Guiscard",
        "Compiègne",
        "Beauvais",
        "Creil",
        "Senlis",
        "Clermont",
        "Méru",
        "Chantilly",
        "Pont-Sainte-Maxence",
        "Nogent-sur-Oise",
        "Autres",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `CASERNE_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file).nested())
            .merge(Env::prefixed("CASERNE_").split("_"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.display.page_size == 0 {
            return Err(Error::ConfigValidation {
                message: "page_size must be greater than 0".to_string(),
            });
        }

        if self.registry.affectation_options.is_empty() {
            return Err(Error::ConfigValidation {
                message: "affectation_options must not be empty".to_string(),
            });
        }

        let mut seen = std::collections::HashSet::new();
        for option in &self.registry.affectation_options {
            if option.trim().is_empty() {
                return Err(Error::ConfigValidation {
                    message: "affectation_options must not contain blank entries".to_string(),
                });
            }
            if !seen.insert(option) {
                return Err(Error::ConfigValidation {
                    message: format!("duplicate affectation option: {option}"),
                });
            }
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Whether a station name is one of the configured options.
    #[must_use]
    pub fn is_known_affectation(&self, name: &str) -> bool {
        self.registry
            .affectation_options
            .iter()
            .any(|option| option == name)
    }
}
