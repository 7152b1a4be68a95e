//! RewardCraft Balance Tree
//!
//! Deterministic Merkle tree over `(index, account, amount)` leaves.
//!
//! The `BalanceTree` is used by the publisher (to build the root and one
//! proof per account) and by the distributor (to verify claims). Inner
//! nodes hash the two children in sorted order, so a proof is just the
//! sibling list and carries no left/right positions.

pub mod balance;
pub mod merkle;

pub use balance::{leaf_hash, BalanceTree};
pub use merkle::{hash_pair, MerkleProof, MerkleTree};

/// Errors from tree construction.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("Empty balance table")]
    EmptyTable,

    #[error("Duplicate leaf index {0}")]
    DuplicateIndex(u64),

    #[error("Balance table total overflows")]
    TotalOverflow,
}

pub type Result<T> = std::result::Result<T, TreeError>;
