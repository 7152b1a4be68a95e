//! Configuration types

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use rewardcraft_core::{
    parse_hex32, to_hex32, Address, DistributorConfig, GovernanceConfig, PayoutMode,
};

use crate::{default_settings_path, Result, SettingsError};

/// Main settings structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub distributor: DistributorSettings,

    #[serde(default)]
    pub publisher: PublisherSettings,

    /// Custom settings file path (not serialized)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

impl Settings {
    /// Load settings from the default path, or create defaults
    pub fn load_or_default() -> Result<Self> {
        Self::load_from(&default_settings_path())
    }

    /// Load settings from a specific path, or create defaults
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).map_err(SettingsError::ReadError)?;
            let mut settings: Settings =
                serde_json::from_str(&content).map_err(SettingsError::ParseError)?;
            settings.config_path = Some(path.clone());
            info!("Loaded settings from {:?}", path);
            Ok(settings)
        } else {
            let mut settings = Self::default();
            settings.config_path = Some(path.clone());
            Ok(settings)
        }
    }

    /// Save settings to the path they were loaded from
    pub fn save(&self) -> Result<()> {
        let path = self.config_path.clone().unwrap_or_else(default_settings_path);
        self.save_to(&path)
    }

    /// Save settings to a specific path
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(SettingsError::CreateDirError)?;
            }
        }

        let content = serde_json::to_string_pretty(self).map_err(SettingsError::ParseError)?;
        std::fs::write(path, content).map_err(SettingsError::WriteError)?;
        info!("Saved settings to {:?}", path);
        Ok(())
    }
}

/// Distributor deployment inputs. Addresses are hex strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributorSettings {
    /// The distributor's own account
    #[serde(default)]
    pub address: String,

    #[serde(default)]
    pub admin: String,

    #[serde(default = "default_update_threshold")]
    pub update_threshold: usize,

    /// Updater -> also holds the slasher role
    #[serde(default)]
    pub updaters: BTreeMap<String, bool>,

    /// Accounts allowed to settle claims for anyone
    #[serde(default)]
    pub distributors: Vec<String>,

    /// Producer -> collector
    #[serde(default)]
    pub collectors: BTreeMap<String, String>,

    #[serde(default)]
    pub payout: PayoutMode,
}

fn default_update_threshold() -> usize {
    1
}

impl Default for DistributorSettings {
    fn default() -> Self {
        Self {
            address: String::new(),
            admin: String::new(),
            update_threshold: default_update_threshold(),
            updaters: BTreeMap::new(),
            distributors: Vec::new(),
            collectors: BTreeMap::new(),
            payout: PayoutMode::default(),
        }
    }
}

fn parse_address(field: &str, value: &str) -> Result<Address> {
    parse_hex32(value).ok_or_else(|| SettingsError::InvalidAddress {
        field: field.to_string(),
        value: value.to_string(),
    })
}

impl DistributorSettings {
    pub fn distributor_config(&self) -> Result<DistributorConfig> {
        Ok(DistributorConfig::new(
            parse_address("address", &self.address)?,
            parse_address("admin", &self.admin)?,
        )
        .with_threshold(self.update_threshold)
        .with_payout(self.payout))
    }

    pub fn governance_config(&self) -> Result<GovernanceConfig> {
        let mut config = GovernanceConfig::new(parse_address("admin", &self.admin)?);
        for (updater, is_slasher) in &self.updaters {
            let updater = parse_address("updater", updater)?;
            config.updaters.push(updater);
            if *is_slasher {
                config.slashers.push(updater);
            }
        }
        for distributor in &self.distributors {
            config.distributors.push(parse_address("distributor", distributor)?);
        }
        for (producer, collector) in &self.collectors {
            config.collectors.push((
                parse_address("producer", producer)?,
                parse_address("collector", collector)?,
            ));
        }
        Ok(config)
    }

    /// Parse both configs and check the threshold is reachable.
    pub fn validate(&self) -> Result<(DistributorConfig, GovernanceConfig)> {
        let distributor = self.distributor_config()?;
        let governance = self.governance_config()?;
        distributor.validate(governance.updater_count())?;
        Ok((distributor, governance))
    }

    pub fn add_updater(&mut self, updater: &Address, is_slasher: bool) {
        self.updaters.insert(to_hex32(updater), is_slasher);
    }

    pub fn add_collector(&mut self, producer: &Address, collector: &Address) {
        self.collectors.insert(to_hex32(producer), to_hex32(collector));
    }
}

/// Where published distributions go
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublisherSettings {
    /// Directory receiving `<root>.json` documents
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// JSONL publication history
    #[serde(default = "default_history_file")]
    pub history_file: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("distributions")
}

fn default_history_file() -> PathBuf {
    PathBuf::from("distributions/history.jsonl")
}

impl Default for PublisherSettings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            history_file: default_history_file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewardcraft_core::ConfigError;

    const ADMIN: Address = [0xAD; 32];
    const CONTRACT: Address = [0xDD; 32];

    fn settings() -> DistributorSettings {
        let mut s = DistributorSettings {
            address: to_hex32(&CONTRACT),
            admin: to_hex32(&ADMIN),
            ..Default::default()
        };
        s.add_updater(&[1u8; 32], true);
        s.add_updater(&[2u8; 32], false);
        s.distributors.push(hex_addr(3));
        s.add_collector(&[4u8; 32], &[5u8; 32]);
        s
    }

    fn hex_addr(byte: u8) -> String {
        to_hex32(&[byte; 32])
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.distributor.update_threshold, 1);
        assert_eq!(settings.distributor.payout, PayoutMode::Mint);
        assert_eq!(settings.publisher.output_dir, PathBuf::from("distributions"));
    }

    #[test]
    fn test_serialization_defaults() {
        let json = r#"{"distributor": {"admin": "0xabcd"}}"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.distributor.update_threshold, 1);
        assert_eq!(settings.distributor.admin, "0xabcd");
        assert_eq!(settings.publisher, PublisherSettings::default());
    }

    #[test]
    fn test_governance_config_mirrors_deployment_inputs() {
        let gov = settings().governance_config().unwrap();
        assert_eq!(gov.admin, ADMIN);
        assert_eq!(gov.updaters, vec![[1u8; 32], [2u8; 32]]);
        assert_eq!(gov.slashers, vec![[1u8; 32]]);
        assert_eq!(gov.distributors, vec![[3u8; 32]]);
        assert_eq!(gov.collectors, vec![([4u8; 32], [5u8; 32])]);
    }

    #[test]
    fn test_distributor_config() {
        let mut s = settings();
        s.update_threshold = 2;
        s.payout = PayoutMode::Funded;
        let config = s.distributor_config().unwrap();
        assert_eq!(config.address, CONTRACT);
        assert_eq!(config.update_threshold, 2);
        assert_eq!(config.payout, PayoutMode::Funded);
    }

    #[test]
    fn test_validate_threshold() {
        let mut s = settings();
        s.update_threshold = 3;
        assert!(s.validate().is_ok());

        s.update_threshold = 4;
        assert!(matches!(
            s.validate(),
            Err(SettingsError::Config(ConfigError::UnreachableThreshold { threshold: 4, updaters: 3 }))
        ));
    }

    #[test]
    fn test_invalid_address() {
        let mut s = settings();
        s.collectors.insert("nope".to_string(), hex_addr(9));
        let err = s.governance_config().unwrap_err();
        assert!(matches!(err, SettingsError::InvalidAddress { ref field, .. } if field == "producer"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join("rewardcraft-test-settings");
        let _ = std::fs::create_dir_all(&dir);
        let path = dir.join("settings.json");
        let _ = std::fs::remove_file(&path);

        let mut saved = Settings::default();
        saved.distributor = settings();
        saved.distributor.payout = PayoutMode::Funded;
        saved.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded.distributor, saved.distributor);
        assert_eq!(loaded.distributor.payout, PayoutMode::Funded);

        let _ = std::fs::remove_file(&path);
        let _ = std::fs::remove_dir(&dir);
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("rewardcraft-test-settings-missing.json");
        let _ = std::fs::remove_file(&path);
        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.distributor, DistributorSettings::default());
    }
}
