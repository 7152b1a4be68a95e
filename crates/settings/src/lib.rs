//! RewardCraft Settings
//!
//! Deployment inputs for a distributor and its publisher, stored as JSON.
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::PathBuf;
//! use rewardcraft_settings::Settings;
//!
//! let settings = Settings::load_from(&PathBuf::from("rewardcraft.json"))?;
//! let config = settings.distributor.distributor_config()?;
//! let governance = settings.distributor.governance_config()?;
//! # Ok::<(), rewardcraft_settings::SettingsError>(())
//! ```

mod config;

pub use config::{DistributorSettings, PublisherSettings, Settings};

use std::path::PathBuf;

use rewardcraft_core::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings: {0}")]
    ReadError(std::io::Error),

    #[error("Failed to write settings: {0}")]
    WriteError(std::io::Error),

    #[error("Failed to parse settings: {0}")]
    ParseError(serde_json::Error),

    #[error("Failed to create config directory: {0}")]
    CreateDirError(std::io::Error),

    #[error("Invalid address for {field}: {value}")]
    InvalidAddress { field: String, value: String },

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, SettingsError>;

/// Settings file used when no path is given
pub fn default_settings_path() -> PathBuf {
    PathBuf::from("rewardcraft.json")
}
