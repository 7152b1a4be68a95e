//! RewardCraft Publisher
//!
//! Off-chain side of a distribution. Takes the absolute balance table for
//! an epoch, keeps every account on a stable leaf index across epochs,
//! commits the table to a `BalanceTree` and produces the proposal and the
//! JSON document claimants fetch their proofs from.
//!
//! Leaf amounts are cumulative, so the publisher refuses any table that
//! would lower an account's amount. Accounts missing from a later table
//! keep their previous amount.

mod distribution;
mod history;

pub use distribution::{ClaimEntry, DecodedClaim, Distribution, DistributionDocument};
pub use history::{HistoryEntry, HistoryEvent};

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info, warn};

use rewardcraft_core::{short_hex, Address, Amount, EpochId, Leaf};
use rewardcraft_tree::{BalanceTree, TreeError};

use history::HistoryLog;

#[derive(Error, Debug)]
pub enum PublisherError {
    #[error("Amount for {account} would decrease from {previous} to {proposed}")]
    NonIncreasingAmount {
        account: String,
        previous: Amount,
        proposed: Amount,
    },

    #[error("Account {0} appears more than once in the table")]
    DuplicateAccount(String),

    #[error("Invalid distribution document: {0}")]
    InvalidDocument(String),

    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PublisherError>;

/// Tracks leaf indices and cumulative amounts across published epochs.
#[derive(Debug, Default)]
pub struct Publisher {
    /// Account -> leaf index, assigned in first-seen order
    indices: HashMap<Address, u64>,
    /// Leaf index -> latest published row
    rows: BTreeMap<u64, Leaf>,
    history: HistoryLog,
}

impl Publisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from the last published document.
    pub fn from_document(document: &DistributionDocument) -> Result<Self> {
        let mut publisher = Self::new();
        for claim in document.decode_claims()? {
            if publisher.indices.insert(claim.account, claim.index).is_some() {
                return Err(PublisherError::DuplicateAccount(short_hex(&claim.account)));
            }
            publisher
                .rows
                .insert(claim.index, Leaf::new(claim.index, claim.account, claim.amount));
        }
        info!("Resumed publisher with {} accounts", publisher.rows.len());
        Ok(publisher)
    }

    pub fn index_of(&self, account: &Address) -> Option<u64> {
        self.indices.get(account).copied()
    }

    /// Latest published cumulative amount for `account`.
    pub fn amount_of(&self, account: &Address) -> Amount {
        self.index_of(account)
            .and_then(|index| self.rows.get(&index))
            .map_or(0, |leaf| leaf.amount)
    }

    pub fn account_count(&self) -> usize {
        self.rows.len()
    }

    /// Build the distribution for `table` without recording it.
    pub fn build(&self, table: &[(Address, Amount)], epoch: EpochId) -> Result<Distribution> {
        let (tree, _) = self.merge(table)?;
        Ok(Distribution::new(epoch, tree))
    }

    /// Build the distribution for `table` and make it the new baseline.
    pub fn publish(&mut self, table: &[(Address, Amount)], epoch: EpochId) -> Result<Distribution> {
        let (tree, carried_forward) = self.merge(table)?;
        let distribution = Distribution::new(epoch, tree);

        for leaf in &distribution.leaves {
            self.indices.insert(leaf.account, leaf.index);
            self.rows.insert(leaf.index, *leaf);
        }
        self.history.append(HistoryEvent::DistributionPublished {
            epoch,
            root: distribution.root,
            total: distribution.total,
            accounts: distribution.leaves.len(),
            carried_forward,
        });

        info!(
            "Published epoch {} root {} ({} accounts, total {}, {} carried forward)",
            epoch,
            short_hex(&distribution.root),
            distribution.leaves.len(),
            distribution.total,
            carried_forward,
        );
        Ok(distribution)
    }

    /// Merge `table` over the current baseline.
    fn merge(&self, table: &[(Address, Amount)]) -> Result<(BalanceTree, usize)> {
        let mut rows = self.rows.clone();
        let mut seen: HashMap<Address, u64> = HashMap::with_capacity(table.len());
        let mut next_index = rows.keys().next_back().map_or(0, |last| last + 1);

        for (account, amount) in table {
            if seen.contains_key(account) {
                return Err(PublisherError::DuplicateAccount(short_hex(account)));
            }
            let index = match self.indices.get(account) {
                Some(index) => *index,
                None => {
                    let index = next_index;
                    next_index += 1;
                    index
                }
            };
            seen.insert(*account, index);

            let previous = rows.get(&index).map_or(0, |leaf| leaf.amount);
            if *amount < previous {
                warn!(
                    "Rejected table: {} would drop from {} to {}",
                    short_hex(account),
                    previous,
                    amount,
                );
                return Err(PublisherError::NonIncreasingAmount {
                    account: short_hex(account),
                    previous,
                    proposed: *amount,
                });
            }
            rows.insert(index, Leaf::new(index, *account, *amount));
        }

        let carried_forward = rows.len() - seen.len();
        debug!(
            "Merged table of {} rows ({} carried forward)",
            table.len(),
            carried_forward,
        );

        let tree = BalanceTree::from_leaves(rows.into_values().collect())?;
        Ok((tree, carried_forward))
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Next sequence number to be assigned.
    pub fn history_height(&self) -> u64 {
        self.history.next_seq
    }

    pub fn history_since(&self, seq: u64) -> &[HistoryEntry] {
        self.history.since(seq)
    }

    /// Append unflushed history entries to a JSONL file.
    pub fn flush_history(&mut self, path: &Path) -> Result<usize> {
        self.history.flush(path)
    }

    /// Load a JSONL history file. Damaged lines are logged and skipped.
    pub fn load_history(path: &Path) -> Result<Vec<HistoryEntry>> {
        HistoryLog::load(path)
    }

    /// Replace the history log with entries loaded at startup.
    pub fn set_history(&mut self, entries: Vec<HistoryEntry>) {
        self.history = HistoryLog::from_entries(entries);
    }
}
