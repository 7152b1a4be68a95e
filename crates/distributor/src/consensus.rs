//! Threshold root consensus
//!
//! Updaters vote for the root of epoch `distribution_count() + 1`. A root is
//! finalized when `threshold` distinct updaters have proposed it. Votes are
//! kept per updater for the open epoch only and cleared on finalization.
//!
//! Tallies take an `is_voter` predicate: a stored vote only counts while its
//! author still holds the updater role.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use rewardcraft_core::{Address, Amount, EpochId, Hash, RootProposal, ZERO_HASH};

use crate::{DistributorError, Result};

/// A finalized distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Epoch {
    pub id: EpochId,
    pub root: Hash,
    pub uri: String,
    /// Updater whose vote reached the threshold
    pub finalized_by: Address,
    /// Cumulative distribution total (funded distributors only)
    pub total: Option<Amount>,
}

/// Result of an accepted proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProposalOutcome {
    /// Vote recorded, threshold not yet reached
    Pending { epoch: EpochId, votes: usize },
    /// Vote completed the quorum
    Finalized(Epoch),
}

#[derive(Debug, Clone)]
pub struct RootConsensus {
    threshold: usize,
    /// Finalized epochs; `epochs[i].id == i + 1`
    epochs: Vec<Epoch>,
    /// Every root that has ever been finalized
    previous_roots: HashSet<Hash>,
    /// Votes for the open epoch
    proposals: BTreeMap<Address, Hash>,
}

impl RootConsensus {
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            epochs: Vec::new(),
            previous_roots: HashSet::new(),
            proposals: BTreeMap::new(),
        }
    }

    pub(crate) fn from_parts(
        threshold: usize,
        epochs: Vec<Epoch>,
        proposals: BTreeMap<Address, Hash>,
    ) -> Self {
        let previous_roots = epochs.iter().map(|e| e.root).collect();
        Self {
            threshold,
            epochs,
            previous_roots,
            proposals,
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Takes effect from the next proposal; existing votes are kept.
    pub fn set_threshold(&mut self, threshold: usize) {
        self.threshold = threshold;
    }

    pub fn distribution_count(&self) -> EpochId {
        self.epochs.len() as EpochId
    }

    /// Root of the latest finalized epoch, or the zero hash.
    pub fn current_root(&self) -> Hash {
        self.epochs.last().map_or(ZERO_HASH, |e| e.root)
    }

    pub fn latest(&self) -> Option<&Epoch> {
        self.epochs.last()
    }

    pub fn epoch(&self, id: EpochId) -> Option<&Epoch> {
        let index = id.checked_sub(1)?;
        self.epochs.get(usize::try_from(index).ok()?)
    }

    pub fn epochs(&self) -> &[Epoch] {
        &self.epochs
    }

    pub fn is_previous_root(&self, root: &Hash) -> bool {
        self.previous_roots.contains(root)
    }

    /// Votes cast for the open epoch.
    pub fn pending(&self) -> &BTreeMap<Address, Hash> {
        &self.proposals
    }

    /// Votes for `root` in the open epoch from updaters accepted by `is_voter`.
    pub fn votes_for(&self, root: &Hash, is_voter: impl Fn(&Address) -> bool) -> usize {
        self.proposals
            .iter()
            .filter(|(updater, r)| *r == root && is_voter(updater))
            .count()
    }

    /// Validate a proposal without recording it.
    ///
    /// Returns the tally `proposal.root` would have once the vote is counted.
    pub fn check(
        &self,
        updater: &Address,
        proposal: &RootProposal,
        is_voter: impl Fn(&Address) -> bool,
    ) -> Result<usize> {
        let expected = self.distribution_count() + 1;
        if proposal.epoch != expected {
            return Err(DistributorError::WrongEpoch {
                expected,
                got: proposal.epoch,
            });
        }
        if self.previous_roots.contains(&proposal.root) {
            return Err(DistributorError::PreviousRoot);
        }
        if self.proposals.contains_key(updater) {
            return Err(DistributorError::AlreadySubmitted);
        }
        Ok(self.votes_for(&proposal.root, is_voter) + 1)
    }

    /// Record a vote that already passed `check`.
    pub fn commit(
        &mut self,
        updater: Address,
        proposal: RootProposal,
        is_voter: impl Fn(&Address) -> bool,
    ) -> ProposalOutcome {
        self.proposals.insert(updater, proposal.root);
        let votes = self.votes_for(&proposal.root, |u| *u == updater || is_voter(u));

        if votes < self.threshold {
            return ProposalOutcome::Pending {
                epoch: proposal.epoch,
                votes,
            };
        }

        let epoch = Epoch {
            id: proposal.epoch,
            root: proposal.root,
            uri: proposal.uri,
            finalized_by: updater,
            total: proposal.total,
        };
        self.previous_roots.insert(epoch.root);
        self.epochs.push(epoch.clone());
        self.proposals.clear();
        ProposalOutcome::Finalized(epoch)
    }
}
