//! Balance tree over `(index, account, amount)` leaves.
//!
//! Leaf formula, shared with claim verification in the distributor:
//!
//! `SHA256(index.to_le_bytes() || account || amount.to_le_bytes())`

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};
use tracing::debug;

use rewardcraft_core::{short_hex, Address, Amount, Hash, Leaf};

use crate::merkle::{MerkleProof, MerkleTree};
use crate::{Result, TreeError};

/// Compute the leaf hash for one balance-table row.
pub fn leaf_hash(index: u64, account: &Address, amount: Amount) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(index.to_le_bytes());
    hasher.update(account);
    hasher.update(amount.to_le_bytes());
    let result = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&result);
    out
}

/// Merkle commitment to a balance table.
#[derive(Debug, Clone)]
pub struct BalanceTree {
    /// Rows keyed by leaf index
    leaves: BTreeMap<u64, Leaf>,
    total: Amount,
    tree: MerkleTree,
}

impl BalanceTree {
    /// Build from `(account, amount)` rows, assigning indices by position.
    pub fn new(balances: &[(Address, Amount)]) -> Result<Self> {
        let leaves = balances
            .iter()
            .enumerate()
            .map(|(i, (account, amount))| Leaf::new(i as u64, *account, *amount))
            .collect::<Vec<_>>();
        Self::from_leaves(leaves)
    }

    /// Build from explicitly indexed rows.
    pub fn from_leaves(leaves: Vec<Leaf>) -> Result<Self> {
        if leaves.is_empty() {
            return Err(TreeError::EmptyTable);
        }

        let mut by_index = BTreeMap::new();
        for leaf in leaves {
            if by_index.insert(leaf.index, leaf).is_some() {
                return Err(TreeError::DuplicateIndex(leaf.index));
            }
        }

        let total = by_index
            .values()
            .try_fold(0u128, |sum, leaf| sum.checked_add(leaf.amount))
            .ok_or(TreeError::TotalOverflow)?;

        let hashes: Vec<Hash> = by_index
            .values()
            .map(|leaf| leaf_hash(leaf.index, &leaf.account, leaf.amount))
            .collect();
        let tree = MerkleTree::from_leaves(&hashes);

        debug!(
            "Built balance tree over {} leaves (root={})",
            by_index.len(),
            short_hex(&tree.root()),
        );

        Ok(Self {
            leaves: by_index,
            total,
            tree,
        })
    }

    pub fn root(&self) -> Hash {
        self.tree.root()
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Rows in index order.
    pub fn leaves(&self) -> impl Iterator<Item = &Leaf> {
        self.leaves.values()
    }

    pub fn leaf(&self, index: u64) -> Option<&Leaf> {
        self.leaves.get(&index)
    }

    /// Sum of all amounts in the table.
    pub fn total(&self) -> Amount {
        self.total
    }

    /// Proof for a row. Returns `None` unless the exact row is in the table.
    pub fn proof(&self, index: u64, account: &Address, amount: Amount) -> Option<MerkleProof> {
        self.tree.proof(&leaf_hash(index, account, amount))
    }

    /// Proof for the row stored at `index`.
    pub fn proof_for_index(&self, index: u64) -> Option<(Leaf, MerkleProof)> {
        let leaf = *self.leaves.get(&index)?;
        let proof = self.proof(leaf.index, &leaf.account, leaf.amount)?;
        Some((leaf, proof))
    }

    /// Check a row against an arbitrary root.
    pub fn verify_proof(
        root: &Hash,
        index: u64,
        account: &Address,
        amount: Amount,
        proof: &[Hash],
    ) -> bool {
        let leaf = leaf_hash(index, account, amount);
        MerkleTree::verify(root, &leaf, &MerkleProof::new(proof.to_vec()))
    }
}
