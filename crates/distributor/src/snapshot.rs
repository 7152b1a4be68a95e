//! Distributor persistence
//!
//! The engine state (not the token or governance collaborators) serializes
//! to a JSON document with hex-encoded keys. Files are written atomically
//! via a temporary sibling and rename.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use rewardcraft_core::{parse_hex32, Amount, DistributorConfig, PayoutMode, Role, TokenId};

use crate::claims::ClaimLedger;
use crate::consensus::{Epoch, RootConsensus};
use crate::debt::DebtAccount;
use crate::distributor::MerkleDistributor;
use crate::events::EventLog;
use crate::governance::Governance;
use crate::receipts::{EpochReceiptLedger, Receipt};
use crate::token::Token;
use crate::{DistributorError, Result};

/// Serializable distributor state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributorState {
    pub address: String,
    pub admin: String,
    pub update_threshold: usize,
    #[serde(default)]
    pub payout: PayoutMode,
    pub epochs: Vec<EpochState>,
    /// Votes for the open epoch: updater -> root
    #[serde(default)]
    pub proposals: BTreeMap<String, String>,
    /// Cumulative amount paid per leaf index
    #[serde(default)]
    pub claimed: BTreeMap<u64, Amount>,
    #[serde(default)]
    pub debt_total: Amount,
    #[serde(default)]
    pub distribution_total: Amount,
    /// Receipts in global enumeration order
    #[serde(default)]
    pub receipts: Vec<ReceiptState>,
    /// Per-owner enumeration order
    #[serde(default)]
    pub owned: BTreeMap<String, Vec<TokenId>>,
    /// (owner, operator) approvals
    #[serde(default)]
    pub operators: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochState {
    pub id: u64,
    pub root: String,
    pub uri: String,
    pub finalized_by: String,
    #[serde(default)]
    pub total: Option<Amount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptState {
    pub token_id: TokenId,
    pub owner: String,
    pub uri: String,
    #[serde(default)]
    pub approved: Option<String>,
}

fn parse_key(value: &str, what: &str) -> Result<[u8; 32]> {
    parse_hex32(value).ok_or_else(|| {
        DistributorError::SerializationError(format!("invalid {} in snapshot: {}", what, value))
    })
}

impl<T: Token, G: Governance> MerkleDistributor<T, G> {
    /// Capture the engine state.
    pub fn snapshot(&self) -> DistributorState {
        let epochs = self
            .consensus
            .epochs()
            .iter()
            .map(|e| EpochState {
                id: e.id,
                root: hex::encode(e.root),
                uri: e.uri.clone(),
                finalized_by: hex::encode(e.finalized_by),
                total: e.total,
            })
            .collect();

        let proposals = self
            .consensus
            .pending()
            .iter()
            .map(|(updater, root)| (hex::encode(updater), hex::encode(root)))
            .collect();

        let receipts = self
            .receipts
            .all_tokens
            .iter()
            .filter_map(|id| self.receipts.tokens.get(id))
            .map(|r| ReceiptState {
                token_id: r.token_id,
                owner: hex::encode(r.owner),
                uri: r.uri.clone(),
                approved: r.approved.map(hex::encode),
            })
            .collect();

        let owned = self
            .receipts
            .owned
            .iter()
            .map(|(owner, ids)| (hex::encode(owner), ids.clone()))
            .collect();

        let operators = self
            .receipts
            .operators
            .iter()
            .map(|(owner, operator)| (hex::encode(owner), hex::encode(operator)))
            .collect();

        DistributorState {
            address: hex::encode(self.config.address),
            admin: hex::encode(self.config.admin),
            update_threshold: self.consensus.threshold(),
            payout: self.config.payout,
            epochs,
            proposals,
            claimed: self.claims.claimed.clone(),
            debt_total: self.debt.debt_total,
            distribution_total: self.debt.distribution_total,
            receipts,
            owned,
            operators,
        }
    }

    /// Rebuild a distributor from a snapshot and its collaborators.
    ///
    /// The event log starts empty.
    pub fn restore(state: DistributorState, token: T, governance: G) -> Result<Self> {
        let config = DistributorConfig {
            address: parse_key(&state.address, "address")?,
            admin: parse_key(&state.admin, "admin")?,
            update_threshold: state.update_threshold,
            payout: state.payout,
        };
        config.validate(governance.role_member_count(Role::Updater))?;

        let mut epochs = Vec::with_capacity(state.epochs.len());
        for (i, e) in state.epochs.into_iter().enumerate() {
            if e.id != i as u64 + 1 {
                return Err(DistributorError::SerializationError(format!(
                    "epoch {} out of sequence at position {}",
                    e.id, i
                )));
            }
            epochs.push(Epoch {
                id: e.id,
                root: parse_key(&e.root, "epoch root")?,
                uri: e.uri,
                finalized_by: parse_key(&e.finalized_by, "finalizer")?,
                total: e.total,
            });
        }

        let mut proposals = BTreeMap::new();
        for (updater, root) in &state.proposals {
            proposals.insert(parse_key(updater, "updater")?, parse_key(root, "proposed root")?);
        }

        let mut receipts = EpochReceiptLedger::new();
        for r in state.receipts {
            receipts.all_tokens.push(r.token_id);
            receipts.tokens.insert(
                r.token_id,
                Receipt {
                    token_id: r.token_id,
                    owner: parse_key(&r.owner, "receipt owner")?,
                    uri: r.uri,
                    approved: r.approved.as_deref().map(|a| parse_key(a, "approval")).transpose()?,
                },
            );
        }
        let mut owned = HashMap::new();
        for (owner, ids) in state.owned {
            owned.insert(parse_key(&owner, "owner")?, ids);
        }
        receipts.owned = owned;
        let mut operators = BTreeSet::new();
        for (owner, operator) in &state.operators {
            operators.insert((parse_key(owner, "owner")?, parse_key(operator, "operator")?));
        }
        receipts.operators = operators;

        let distributor = Self {
            consensus: RootConsensus::from_parts(config.update_threshold, epochs, proposals),
            config,
            token,
            governance,
            receipts,
            claims: ClaimLedger {
                claimed: state.claimed,
            },
            debt: DebtAccount {
                debt_total: state.debt_total,
                distribution_total: state.distribution_total,
            },
            events: EventLog::new(),
        };

        info!(
            "Restored distributor: {} epochs, {} pending votes, {} settled indices",
            distributor.distribution_count(),
            distributor.pending_proposals().len(),
            distributor.claims.settled_count(),
        );
        Ok(distributor)
    }

    /// Save the engine state as JSON (tmp + rename).
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.snapshot())
            .map_err(|e| DistributorError::SerializationError(e.to_string()))?;

        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &json)?;
        std::fs::rename(&tmp_path, path)?;

        debug!(
            "Saved distributor state ({} epochs) to {}",
            self.distribution_count(),
            path.display(),
        );
        Ok(())
    }

    pub fn load_from_file(path: &Path, token: T, governance: G) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let state: DistributorState = serde_json::from_str(&contents)
            .map_err(|e| DistributorError::SerializationError(e.to_string()))?;
        Self::restore(state, token, governance)
    }
}
