//! Published distributions and their JSON documents

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use rewardcraft_core::{parse_hex32, short_hex, to_hex32, Address, Amount, EpochId, Hash, Leaf, RootProposal};
use rewardcraft_tree::{BalanceTree, MerkleProof};

use crate::{PublisherError, Result};

/// A committed balance table, ready to be proposed.
#[derive(Debug, Clone)]
pub struct Distribution {
    /// Epoch this table is intended for
    pub epoch: EpochId,
    pub root: Hash,
    /// Sum of all cumulative amounts
    pub total: Amount,
    /// Rows in index order
    pub leaves: Vec<Leaf>,
    tree: BalanceTree,
}

impl Distribution {
    pub(crate) fn new(epoch: EpochId, tree: BalanceTree) -> Self {
        Self {
            epoch,
            root: tree.root(),
            total: tree.total(),
            leaves: tree.leaves().copied().collect(),
            tree,
        }
    }

    /// Metadata pointer: `<hex root>.json`.
    pub fn uri(&self) -> String {
        format!("{}.json", hex::encode(self.root))
    }

    /// Proposal for this distribution, carrying the cumulative total.
    ///
    /// Minting distributors ignore the total.
    pub fn proposal(&self) -> RootProposal {
        RootProposal::funded(self.root, self.uri(), self.epoch, self.total)
    }

    pub fn leaf_for(&self, account: &Address) -> Option<&Leaf> {
        self.leaves.iter().find(|leaf| leaf.account == *account)
    }

    /// Leaf and inclusion proof for `account`.
    pub fn proof_for(&self, account: &Address) -> Option<(Leaf, MerkleProof)> {
        let leaf = *self.leaf_for(account)?;
        let proof = self.tree.proof(leaf.index, &leaf.account, leaf.amount)?;
        Some((leaf, proof))
    }

    pub fn document(&self) -> DistributionDocument {
        let claims = self
            .leaves
            .iter()
            .filter_map(|leaf| {
                let proof = self.tree.proof(leaf.index, &leaf.account, leaf.amount)?;
                Some((
                    to_hex32(&leaf.account),
                    ClaimEntry {
                        index: leaf.index,
                        amount: leaf.amount.to_string(),
                        proof: proof.siblings.iter().map(to_hex32).collect(),
                    },
                ))
            })
            .collect();

        DistributionDocument {
            merkle_root: to_hex32(&self.root),
            token_total: self.total.to_string(),
            claims,
        }
    }

    /// Write the document to `dir/<uri>` (tmp + rename). Returns the path.
    pub fn write_document(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(self.uri());
        let json = serde_json::to_string_pretty(&self.document())?;

        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &json)?;
        std::fs::rename(&tmp_path, &path)?;

        info!(
            "Wrote distribution document for epoch {} (root {}) to {}",
            self.epoch,
            short_hex(&self.root),
            path.display(),
        );
        Ok(path)
    }
}

/// Off-chain balance table served at a distribution's URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionDocument {
    pub merkle_root: String,
    /// Decimal string
    pub token_total: String,
    /// Keyed by 0x-prefixed account
    pub claims: BTreeMap<String, ClaimEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimEntry {
    pub index: u64,
    /// Decimal string
    pub amount: String,
    pub proof: Vec<String>,
}

/// A claim decoded from a document, in the shape `claim` takes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedClaim {
    pub index: u64,
    pub account: Address,
    pub amount: Amount,
    pub proof: Vec<Hash>,
}

impl DistributionDocument {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn root(&self) -> Result<Hash> {
        parse_hex32(&self.merkle_root)
            .ok_or_else(|| PublisherError::InvalidDocument(format!("merkleRoot {}", self.merkle_root)))
    }

    pub fn total(&self) -> Result<Amount> {
        parse_amount(&self.token_total)
    }

    /// Decode every claim, ordered by index.
    pub fn decode_claims(&self) -> Result<Vec<DecodedClaim>> {
        let mut claims = Vec::with_capacity(self.claims.len());
        for (account, entry) in &self.claims {
            let account = parse_hex32(account)
                .ok_or_else(|| PublisherError::InvalidDocument(format!("account {}", account)))?;
            let proof = entry
                .proof
                .iter()
                .map(|p| {
                    parse_hex32(p).ok_or_else(|| PublisherError::InvalidDocument(format!("proof node {}", p)))
                })
                .collect::<Result<Vec<_>>>()?;
            claims.push(DecodedClaim {
                index: entry.index,
                account,
                amount: parse_amount(&entry.amount)?,
                proof,
            });
        }
        claims.sort_by_key(|c| c.index);
        Ok(claims)
    }

    /// Decoded claim for one account.
    pub fn claim_for(&self, account: &Address) -> Result<Option<DecodedClaim>> {
        Ok(self
            .decode_claims()?
            .into_iter()
            .find(|c| c.account == *account))
    }
}

fn parse_amount(value: &str) -> Result<Amount> {
    value
        .parse()
        .map_err(|_| PublisherError::InvalidDocument(format!("amount {}", value)))
}
