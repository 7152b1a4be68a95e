//! RewardCraft Distributor
//!
//! Threshold Merkle-root consensus and claim settlement.
//!
//! ## Distribution Flow
//!
//! 1. **Publish**: an off-chain publisher commits an absolute balance table
//!    to a `BalanceTree` and hosts the table at `<root>.json`.
//! 2. **Propose**: authorized updaters independently call `propose_root` for
//!    epoch `distribution_count() + 1`.
//! 3. **Finalize**: once `update_threshold` distinct updaters agree on the
//!    same root, the root goes live, an epoch receipt is minted to the
//!    updater whose vote completed the quorum and (funded mode) the debt
//!    account checks the distributor can cover the new obligations.
//! 4. **Claim**: accounts, their collectors or a distributor settle leaves
//!    against the live root. Each index pays out at most its cumulative
//!    amount over the distributor's lifetime.

mod claims;
mod consensus;
mod debt;
mod distributor;
mod events;
mod governance;
mod receipts;
mod snapshot;
mod token;

pub use claims::{resolve_payee, ClaimLedger};
pub use consensus::{Epoch, ProposalOutcome, RootConsensus};
pub use debt::DebtAccount;
pub use distributor::MerkleDistributor;
pub use events::{DistributorEvent, EventLog, EventRecord};
pub use governance::{Governance, GovernanceError, RoleRegistry};
pub use receipts::{EpochReceiptLedger, Receipt, ReceiptError};
pub use snapshot::{DistributorState, EpochState, ReceiptState};
pub use token::{MemoryToken, Token, TokenError};

use rewardcraft_core::{Amount, ConfigError, EpochId, Role};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DistributorError {
    #[error("Caller must have {0}")]
    MissingRole(Role),

    #[error("Can only update next distribution")]
    WrongEpoch { expected: EpochId, got: EpochId },

    #[error("Cannot update to a previous merkle root")]
    PreviousRoot,

    #[error("Updater already submitted new root")]
    AlreadySubmitted,

    #[error("Funded distribution requires a total amount")]
    MissingTotal,

    #[error("Distribution would leave contract underfunded")]
    Underfunded { required: Amount, available: Amount },

    #[error("Distribution total cannot decrease")]
    TotalDecreased { previous: Amount, proposed: Amount },

    #[error("Invalid proof")]
    InvalidProof,

    #[error("Nothing claimable")]
    NothingClaimable,

    #[error("Cannot collect rewards")]
    CannotCollect,

    #[error("Claim exceeds outstanding debt")]
    DebtUnderflow,

    #[error("Update threshold must be non-zero")]
    ZeroThreshold,

    #[error("threshold > updaters")]
    UnreachableThreshold { threshold: usize, updaters: usize },

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Governance error: {0}")]
    Governance(#[from] GovernanceError),

    #[error("Receipt error: {0}")]
    Receipt(#[from] ReceiptError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type Result<T> = std::result::Result<T, DistributorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_missing_role() {
        let err = DistributorError::MissingRole(Role::Updater);
        assert_eq!(err.to_string(), "Caller must have UPDATER_ROLE");
        let err = DistributorError::MissingRole(Role::Admin);
        assert_eq!(err.to_string(), "Caller must have DEFAULT_ADMIN_ROLE");
    }

    #[test]
    fn test_error_display_sequencing() {
        let err = DistributorError::WrongEpoch { expected: 1, got: 2 };
        assert_eq!(err.to_string(), "Can only update next distribution");
        assert_eq!(
            DistributorError::AlreadySubmitted.to_string(),
            "Updater already submitted new root"
        );
        assert_eq!(
            DistributorError::PreviousRoot.to_string(),
            "Cannot update to a previous merkle root"
        );
    }

    #[test]
    fn test_error_display_claims() {
        assert_eq!(DistributorError::InvalidProof.to_string(), "Invalid proof");
        assert_eq!(DistributorError::NothingClaimable.to_string(), "Nothing claimable");
        assert_eq!(DistributorError::CannotCollect.to_string(), "Cannot collect rewards");
    }

    #[test]
    fn test_error_display_solvency() {
        let err = DistributorError::Underfunded { required: 100, available: 80 };
        assert_eq!(err.to_string(), "Distribution would leave contract underfunded");
    }

    #[test]
    fn test_error_display_threshold() {
        assert_eq!(
            DistributorError::ZeroThreshold.to_string(),
            "Update threshold must be non-zero"
        );
        let err = DistributorError::UnreachableThreshold { threshold: 2, updaters: 1 };
        assert_eq!(err.to_string(), "threshold > updaters");
    }

    #[test]
    fn test_error_from_token() {
        let err: DistributorError = TokenError::NotMinter.into();
        assert!(matches!(err, DistributorError::Token(TokenError::NotMinter)));
    }
}
