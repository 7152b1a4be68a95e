//! Claim settlement records
//!
//! Claims are cumulative: the leaf amount is the total ever owed to an
//! index, and a claim pays the difference to what has already been paid.

use std::collections::BTreeMap;

use rewardcraft_core::{Address, Amount, Hash, Role};
use rewardcraft_tree::BalanceTree;

use crate::governance::Governance;
use crate::{DistributorError, Result};

#[derive(Debug, Clone, Default)]
pub struct ClaimLedger {
    pub(crate) claimed: BTreeMap<u64, Amount>,
}

impl ClaimLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total paid out for `index` so far.
    pub fn claimed_amount(&self, index: u64) -> Amount {
        self.claimed.get(&index).copied().unwrap_or(0)
    }

    /// Whether anything has been paid for `index`.
    pub fn is_claimed(&self, index: u64) -> bool {
        self.claimed_amount(index) > 0
    }

    /// Verify a leaf against `root`.
    pub fn verify(
        &self,
        root: &Hash,
        index: u64,
        account: &Address,
        amount: Amount,
        proof: &[Hash],
    ) -> Result<()> {
        if BalanceTree::verify_proof(root, index, account, amount, proof) {
            Ok(())
        } else {
            Err(DistributorError::InvalidProof)
        }
    }

    /// Amount still payable for a leaf carrying cumulative `amount`.
    pub fn claimable(&self, index: u64, amount: Amount) -> Result<Amount> {
        let paid = self.claimed_amount(index);
        if amount <= paid {
            return Err(DistributorError::NothingClaimable);
        }
        Ok(amount - paid)
    }

    /// Mark `index` as settled up to `amount`.
    pub fn record(&mut self, index: u64, amount: Amount) {
        self.claimed.insert(index, amount);
    }

    pub fn settled_count(&self) -> usize {
        self.claimed.len()
    }
}

/// Destination of a claim submitted by `caller` for `account`.
///
/// The account itself is paid directly. A registered collector or a holder
/// of the distributor role are paid to the collector when one is set.
pub fn resolve_payee<G: Governance>(governance: &G, caller: &Address, account: &Address) -> Result<Address> {
    if caller == account {
        return Ok(*account);
    }
    let collector = governance.collector_of(account);
    if collector.as_ref() == Some(caller) {
        return Ok(*caller);
    }
    if governance.has_role(Role::Distributor, caller) {
        return Ok(collector.unwrap_or(*account));
    }
    Err(DistributorError::CannotCollect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RoleRegistry;

    const ADMIN: Address = [9u8; 32];
    const ALICE: Address = [1u8; 32];
    const COLLECTOR: Address = [2u8; 32];
    const DISTRIBUTOR: Address = [3u8; 32];
    const STRANGER: Address = [4u8; 32];

    fn registry() -> RoleRegistry {
        let mut registry = RoleRegistry::new(ADMIN);
        registry.grant_role(&ADMIN, Role::Distributor, DISTRIBUTOR).unwrap();
        registry
    }

    #[test]
    fn test_cumulative_claimable() {
        let mut ledger = ClaimLedger::new();
        assert_eq!(ledger.claimable(0, 100).unwrap(), 100);
        ledger.record(0, 100);
        assert!(ledger.is_claimed(0));
        assert!(matches!(ledger.claimable(0, 100), Err(DistributorError::NothingClaimable)));
        assert!(matches!(ledger.claimable(0, 50), Err(DistributorError::NothingClaimable)));
        assert_eq!(ledger.claimable(0, 250).unwrap(), 150);
        assert!(!ledger.is_claimed(1));
    }

    #[test]
    fn test_zero_amount_leaf_has_nothing() {
        let ledger = ClaimLedger::new();
        assert!(matches!(ledger.claimable(3, 0), Err(DistributorError::NothingClaimable)));
    }

    #[test]
    fn test_verify() {
        let tree = BalanceTree::new(&[(ALICE, 10), (COLLECTOR, 20)]).unwrap();
        let ledger = ClaimLedger::new();
        let proof = tree.proof(1, &COLLECTOR, 20).unwrap();
        assert!(ledger.verify(&tree.root(), 1, &COLLECTOR, 20, &proof.siblings).is_ok());
        assert!(matches!(
            ledger.verify(&tree.root(), 1, &COLLECTOR, 21, &proof.siblings),
            Err(DistributorError::InvalidProof)
        ));
    }

    #[test]
    fn test_self_claim_pays_account() {
        let mut gov = registry();
        gov.delegate(&ALICE, ALICE, COLLECTOR).unwrap();
        assert_eq!(resolve_payee(&gov, &ALICE, &ALICE).unwrap(), ALICE);
    }

    #[test]
    fn test_collector_claim_pays_collector() {
        let mut gov = registry();
        gov.delegate(&ALICE, ALICE, COLLECTOR).unwrap();
        assert_eq!(resolve_payee(&gov, &COLLECTOR, &ALICE).unwrap(), COLLECTOR);
    }

    #[test]
    fn test_distributor_claim_redirects_to_collector() {
        let mut gov = registry();
        assert_eq!(resolve_payee(&gov, &DISTRIBUTOR, &ALICE).unwrap(), ALICE);
        gov.delegate(&ALICE, ALICE, COLLECTOR).unwrap();
        assert_eq!(resolve_payee(&gov, &DISTRIBUTOR, &ALICE).unwrap(), COLLECTOR);
    }

    #[test]
    fn test_stranger_cannot_collect() {
        let gov = registry();
        assert!(matches!(
            resolve_payee(&gov, &STRANGER, &ALICE),
            Err(DistributorError::CannotCollect)
        ));
        // A collector of someone else is still a stranger
        assert!(matches!(
            resolve_payee(&gov, &COLLECTOR, &ALICE),
            Err(DistributorError::CannotCollect)
        ));
    }
}
