//! Governance collaborator
//!
//! Role membership and collector delegation. The distributor only reads
//! through the `Governance` trait; `RoleRegistry` is the in-memory
//! implementation, administered by holders of the admin role.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use tracing::info;

use rewardcraft_core::{short_hex, Address, GovernanceConfig, Role, ZERO_ADDRESS};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GovernanceError {
    #[error("Caller must have {0}")]
    MissingRole(Role),

    #[error("Zero address")]
    ZeroAddress,

    #[error("Caller cannot delegate for this account")]
    CannotDelegate,
}

/// Read-only view of roles and delegations.
pub trait Governance {
    fn has_role(&self, role: Role, account: &Address) -> bool;

    /// Number of distinct accounts holding `role`.
    fn role_member_count(&self, role: Role) -> usize;

    /// Collector registered for `account`, if any.
    fn collector_of(&self, account: &Address) -> Option<Address>;
}

#[derive(Debug, Clone, Default)]
pub struct RoleRegistry {
    members: BTreeMap<Role, BTreeSet<Address>>,
    collectors: BTreeMap<Address, Address>,
}

impl RoleRegistry {
    /// Registry where `admin` holds the admin and updater roles.
    pub fn new(admin: Address) -> Self {
        let mut registry = Self::default();
        registry.insert(Role::Admin, admin);
        registry.insert(Role::Updater, admin);
        registry
    }

    /// Registry seeded from deployment inputs.
    pub fn from_config(config: &GovernanceConfig) -> Result<Self, GovernanceError> {
        if config.admin == ZERO_ADDRESS {
            return Err(GovernanceError::ZeroAddress);
        }
        let mut registry = Self::new(config.admin);
        for updater in &config.updaters {
            registry.insert(Role::Updater, *updater);
        }
        for slasher in &config.slashers {
            registry.insert(Role::Slasher, *slasher);
        }
        for distributor in &config.distributors {
            registry.insert(Role::Distributor, *distributor);
        }
        for (producer, collector) in &config.collectors {
            if *producer == ZERO_ADDRESS || *collector == ZERO_ADDRESS {
                return Err(GovernanceError::ZeroAddress);
            }
            registry.collectors.insert(*producer, *collector);
        }
        Ok(registry)
    }

    pub fn grant_role(
        &mut self,
        caller: &Address,
        role: Role,
        account: Address,
    ) -> Result<(), GovernanceError> {
        self.require_admin(caller)?;
        if account == ZERO_ADDRESS {
            return Err(GovernanceError::ZeroAddress);
        }
        if self.insert(role, account) {
            info!("Granted {} to {}", role, short_hex(&account));
        }
        Ok(())
    }

    pub fn revoke_role(
        &mut self,
        caller: &Address,
        role: Role,
        account: &Address,
    ) -> Result<(), GovernanceError> {
        self.require_admin(caller)?;
        let removed = self
            .members
            .get_mut(&role)
            .map_or(false, |set| set.remove(account));
        if removed {
            info!("Revoked {} from {}", role, short_hex(account));
        }
        Ok(())
    }

    /// Register `collector` to receive `account`'s rewards.
    ///
    /// Allowed for the account itself or an admin.
    pub fn delegate(
        &mut self,
        caller: &Address,
        account: Address,
        collector: Address,
    ) -> Result<(), GovernanceError> {
        if *caller != account && !self.has_role(Role::Admin, caller) {
            return Err(GovernanceError::CannotDelegate);
        }
        if account == ZERO_ADDRESS || collector == ZERO_ADDRESS {
            return Err(GovernanceError::ZeroAddress);
        }
        self.collectors.insert(account, collector);
        info!(
            "Delegated rewards of {} to collector {}",
            short_hex(&account),
            short_hex(&collector),
        );
        Ok(())
    }

    pub fn undelegate(&mut self, caller: &Address, account: &Address) -> Result<(), GovernanceError> {
        if caller != account && !self.has_role(Role::Admin, caller) {
            return Err(GovernanceError::CannotDelegate);
        }
        if self.collectors.remove(account).is_some() {
            info!("Removed collector of {}", short_hex(account));
        }
        Ok(())
    }

    /// Accounts holding `role`, in address order.
    pub fn members(&self, role: Role) -> impl Iterator<Item = &Address> {
        self.members.get(&role).into_iter().flatten()
    }

    fn require_admin(&self, caller: &Address) -> Result<(), GovernanceError> {
        if self.has_role(Role::Admin, caller) {
            Ok(())
        } else {
            Err(GovernanceError::MissingRole(Role::Admin))
        }
    }

    fn insert(&mut self, role: Role, account: Address) -> bool {
        self.members.entry(role).or_default().insert(account)
    }
}

impl Governance for RoleRegistry {
    fn has_role(&self, role: Role, account: &Address) -> bool {
        self.members
            .get(&role)
            .map_or(false, |set| set.contains(account))
    }

    fn role_member_count(&self, role: Role) -> usize {
        self.members.get(&role).map_or(0, |set| set.len())
    }

    fn collector_of(&self, account: &Address) -> Option<Address> {
        self.collectors.get(account).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADMIN: Address = [1u8; 32];
    const ALICE: Address = [2u8; 32];
    const BOB: Address = [3u8; 32];

    #[test]
    fn test_admin_is_updater() {
        let registry = RoleRegistry::new(ADMIN);
        assert!(registry.has_role(Role::Admin, &ADMIN));
        assert!(registry.has_role(Role::Updater, &ADMIN));
        assert_eq!(registry.role_member_count(Role::Updater), 1);
        assert_eq!(registry.role_member_count(Role::Distributor), 0);
    }

    #[test]
    fn test_grant_requires_admin() {
        let mut registry = RoleRegistry::new(ADMIN);
        assert_eq!(
            registry.grant_role(&ALICE, Role::Updater, BOB),
            Err(GovernanceError::MissingRole(Role::Admin))
        );
        registry.grant_role(&ADMIN, Role::Updater, BOB).unwrap();
        assert!(registry.has_role(Role::Updater, &BOB));
        assert_eq!(registry.role_member_count(Role::Updater), 2);
    }

    #[test]
    fn test_grant_is_idempotent() {
        let mut registry = RoleRegistry::new(ADMIN);
        registry.grant_role(&ADMIN, Role::Distributor, BOB).unwrap();
        registry.grant_role(&ADMIN, Role::Distributor, BOB).unwrap();
        assert_eq!(registry.role_member_count(Role::Distributor), 1);
    }

    #[test]
    fn test_revoke() {
        let mut registry = RoleRegistry::new(ADMIN);
        registry.grant_role(&ADMIN, Role::Updater, BOB).unwrap();
        registry.revoke_role(&ADMIN, Role::Updater, &BOB).unwrap();
        assert!(!registry.has_role(Role::Updater, &BOB));
        assert!(registry.revoke_role(&BOB, Role::Updater, &ADMIN).is_err());
    }

    #[test]
    fn test_delegation() {
        let mut registry = RoleRegistry::new(ADMIN);
        assert_eq!(
            registry.delegate(&BOB, ALICE, BOB),
            Err(GovernanceError::CannotDelegate)
        );

        registry.delegate(&ALICE, ALICE, BOB).unwrap();
        assert_eq!(registry.collector_of(&ALICE), Some(BOB));

        registry.undelegate(&ADMIN, &ALICE).unwrap();
        assert_eq!(registry.collector_of(&ALICE), None);
    }

    #[test]
    fn test_from_config() {
        let mut config = GovernanceConfig::new(ADMIN);
        config.updaters = vec![ALICE, BOB];
        config.slashers = vec![ALICE];
        config.distributors = vec![BOB];
        config.collectors = vec![(ALICE, BOB)];

        let registry = RoleRegistry::from_config(&config).unwrap();
        assert_eq!(registry.role_member_count(Role::Updater), 3);
        assert!(registry.has_role(Role::Slasher, &ALICE));
        assert!(registry.has_role(Role::Distributor, &BOB));
        assert_eq!(registry.collector_of(&ALICE), Some(BOB));
        assert_eq!(
            registry.members(Role::Updater).copied().collect::<Vec<_>>(),
            vec![ADMIN, ALICE, BOB]
        );
    }

    #[test]
    fn test_from_config_rejects_zero_admin() {
        let config = GovernanceConfig::new(ZERO_ADDRESS);
        assert!(matches!(
            RoleRegistry::from_config(&config),
            Err(GovernanceError::ZeroAddress)
        ));
    }
}
