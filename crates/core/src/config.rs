//! Configuration types

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{Address, ConfigError, ZERO_ADDRESS};

/// How a distributor settles claims
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PayoutMode {
    /// Mint new tokens to the payee on every claim
    #[default]
    Mint,
    /// Transfer from a pre-funded balance, guarded by the debt account
    Funded,
}

/// Static parameters of one distributor instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributorConfig {
    /// The distributor's own account (holds funds in `Funded` mode, mints in `Mint` mode)
    pub address: Address,
    /// Initial admin
    pub admin: Address,
    /// Number of agreeing updaters required to finalize a root
    pub update_threshold: usize,
    /// Settlement mode
    pub payout: PayoutMode,
}

impl DistributorConfig {
    pub fn new(address: Address, admin: Address) -> Self {
        Self {
            address,
            admin,
            update_threshold: 1,
            payout: PayoutMode::Mint,
        }
    }

    pub fn with_threshold(mut self, update_threshold: usize) -> Self {
        self.update_threshold = update_threshold;
        self
    }

    pub fn with_payout(mut self, payout: PayoutMode) -> Self {
        self.payout = payout;
        self
    }

    /// Check the threshold is reachable with `updater_count` updaters.
    pub fn validate(&self, updater_count: usize) -> Result<(), ConfigError> {
        if self.address == ZERO_ADDRESS {
            return Err(ConfigError::ZeroAddress("distributor"));
        }
        if self.admin == ZERO_ADDRESS {
            return Err(ConfigError::ZeroAddress("admin"));
        }
        if self.update_threshold == 0 {
            return Err(ConfigError::ZeroThreshold);
        }
        if self.update_threshold > updater_count {
            return Err(ConfigError::UnreachableThreshold {
                threshold: self.update_threshold,
                updaters: updater_count,
            });
        }
        Ok(())
    }
}

/// Initial role assignments for the governance collaborator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceConfig {
    pub admin: Address,
    #[serde(default)]
    pub updaters: Vec<Address>,
    #[serde(default)]
    pub slashers: Vec<Address>,
    #[serde(default)]
    pub distributors: Vec<Address>,
    /// (producer, collector) delegations
    #[serde(default)]
    pub collectors: Vec<(Address, Address)>,
}

impl GovernanceConfig {
    pub fn new(admin: Address) -> Self {
        Self {
            admin,
            ..Default::default()
        }
    }

    /// Distinct updaters, counting the admin (who always holds the role).
    pub fn updater_count(&self) -> usize {
        let mut set: BTreeSet<Address> = self.updaters.iter().copied().collect();
        set.insert(self.admin);
        set.len()
    }
}
