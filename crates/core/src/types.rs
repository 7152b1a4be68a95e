use serde::{Deserialize, Serialize};

/// 32-byte Merkle commitment (tree root, leaf or inner node)
pub type Hash = [u8; 32];

/// 32-byte account identifier
pub type Address = [u8; 32];

/// Token amount. Balance tables carry 18-decimal values, so `u64` is too small.
pub type Amount = u128;

/// Sequential distribution epoch (1-based once finalized)
pub type EpochId = u64;

/// Epoch receipt token id (always equal to the epoch it records)
pub type TokenId = u64;

/// The "no root" sentinel: the live root before any epoch finalizes
pub const ZERO_HASH: Hash = [0u8; 32];

/// The null account (never a valid owner or payee)
pub const ZERO_ADDRESS: Address = [0u8; 32];

/// A single row of a balance table committed into the tree.
///
/// `amount` is the cumulative total ever claimable for `index`, not the
/// increment for one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Leaf {
    pub index: u64,
    pub account: Address,
    pub amount: Amount,
}

impl Leaf {
    pub fn new(index: u64, account: Address, amount: Amount) -> Self {
        Self { index, account, amount }
    }
}

/// A root submission from one updater for the next epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootProposal {
    /// Proposed Merkle root
    pub root: Hash,
    /// Metadata pointer for the full balance table (conventionally `<root>.json`)
    pub uri: String,
    /// Must be `distribution_count() + 1`
    pub epoch: EpochId,
    /// New cumulative distribution total (funded distributors only)
    pub total: Option<Amount>,
}

impl RootProposal {
    /// Proposal for a minting distributor.
    pub fn new(root: Hash, uri: impl Into<String>, epoch: EpochId) -> Self {
        Self {
            root,
            uri: uri.into(),
            epoch,
            total: None,
        }
    }

    /// Proposal for a funded distributor, carrying the cumulative total.
    pub fn funded(root: Hash, uri: impl Into<String>, epoch: EpochId, total: Amount) -> Self {
        Self {
            root,
            uri: uri.into(),
            epoch,
            total: Some(total),
        }
    }
}

/// Capabilities checked through the governance collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// May change the threshold, the governance collaborator and grant roles
    Admin,
    /// May propose roots
    Updater,
    /// May settle claims on behalf of any account
    Distributor,
    /// Carried for parity with the deployment inputs; grants nothing here
    Slasher,
}

impl Role {
    /// Canonical role name used in error messages
    pub fn name(&self) -> &'static str {
        match self {
            Self::Admin => "DEFAULT_ADMIN_ROLE",
            Self::Updater => "UPDATER_ROLE",
            Self::Distributor => "DISTRIBUTOR_ROLE",
            Self::Slasher => "SLASHER_ROLE",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// First 8 bytes of a hash or address as hex, for log lines.
pub fn short_hex(bytes: &[u8; 32]) -> String {
    hex::encode(&bytes[..8])
}

/// Parse a 32-byte hex value, with or without a `0x` prefix.
pub fn parse_hex32(s: &str) -> Option<[u8; 32]> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s).ok()?;
    if bytes.len() != 32 {
        return None;
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Some(out)
}

/// Hex-encode a 32-byte value with a `0x` prefix.
pub fn to_hex32(bytes: &[u8; 32]) -> String {
    format!("0x{}", hex::encode(bytes))
}
