//! Epoch receipts
//!
//! One non-fungible receipt per finalized epoch, minted to the updater whose
//! vote completed the quorum. Token id equals the epoch id. Receipts are
//! enumerable globally and per owner, and transferable through the usual
//! owner / approved / operator rules.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use rewardcraft_core::{Address, TokenId, ZERO_ADDRESS};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReceiptError {
    #[error("owner query for nonexistent token")]
    NonexistentToken(TokenId),

    #[error("URI query for nonexistent token")]
    NonexistentUri(TokenId),

    #[error("token {0} already minted")]
    AlreadyMinted(TokenId),

    #[error("balance query for the zero address")]
    ZeroAddressQuery,

    #[error("transfer to the zero address")]
    TransferToZero,

    #[error("global index out of bounds")]
    GlobalIndexOutOfBounds,

    #[error("owner index out of bounds")]
    OwnerIndexOutOfBounds,

    #[error("approval to current owner")]
    ApprovalToOwner,

    #[error("approve caller is not owner nor approved for all")]
    NotOwnerNorOperator,

    #[error("approve to caller")]
    ApproveToCaller,

    #[error("transfer caller is not owner nor approved")]
    NotOwnerNorApproved,

    #[error("transfer of token that is not own")]
    WrongOwner,
}

pub type Result<T> = std::result::Result<T, ReceiptError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub token_id: TokenId,
    pub owner: Address,
    pub uri: String,
    pub approved: Option<Address>,
}

#[derive(Debug, Clone, Default)]
pub struct EpochReceiptLedger {
    pub(crate) tokens: BTreeMap<TokenId, Receipt>,
    /// Global enumeration order
    pub(crate) all_tokens: Vec<TokenId>,
    /// Per-owner enumeration order
    pub(crate) owned: HashMap<Address, Vec<TokenId>>,
    /// (owner, operator) pairs
    pub(crate) operators: BTreeSet<(Address, Address)>,
}

impl EpochReceiptLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that `mint(to, token_id, ..)` would succeed.
    pub fn check_mint(&self, to: &Address, token_id: TokenId) -> Result<()> {
        if *to == ZERO_ADDRESS {
            return Err(ReceiptError::TransferToZero);
        }
        if self.tokens.contains_key(&token_id) {
            return Err(ReceiptError::AlreadyMinted(token_id));
        }
        Ok(())
    }

    pub fn mint(&mut self, to: Address, token_id: TokenId, uri: impl Into<String>) -> Result<()> {
        self.check_mint(&to, token_id)?;
        self.tokens.insert(
            token_id,
            Receipt {
                token_id,
                owner: to,
                uri: uri.into(),
                approved: None,
            },
        );
        self.all_tokens.push(token_id);
        self.owned.entry(to).or_default().push(token_id);
        Ok(())
    }

    pub fn receipt(&self, token_id: TokenId) -> Option<&Receipt> {
        self.tokens.get(&token_id)
    }

    pub fn owner_of(&self, token_id: TokenId) -> Result<Address> {
        self.get(token_id).map(|r| r.owner)
    }

    pub fn token_uri(&self, token_id: TokenId) -> Result<&str> {
        self.tokens
            .get(&token_id)
            .map(|r| r.uri.as_str())
            .ok_or(ReceiptError::NonexistentUri(token_id))
    }

    pub fn balance_of(&self, owner: &Address) -> Result<usize> {
        if *owner == ZERO_ADDRESS {
            return Err(ReceiptError::ZeroAddressQuery);
        }
        Ok(self.owned.get(owner).map_or(0, |ids| ids.len()))
    }

    pub fn total_supply(&self) -> usize {
        self.all_tokens.len()
    }

    pub fn token_by_index(&self, index: usize) -> Result<TokenId> {
        self.all_tokens
            .get(index)
            .copied()
            .ok_or(ReceiptError::GlobalIndexOutOfBounds)
    }

    pub fn token_of_owner_by_index(&self, owner: &Address, index: usize) -> Result<TokenId> {
        self.owned
            .get(owner)
            .and_then(|ids| ids.get(index))
            .copied()
            .ok_or(ReceiptError::OwnerIndexOutOfBounds)
    }

    pub fn approve(&mut self, caller: &Address, to: Address, token_id: TokenId) -> Result<()> {
        let owner = self.owner_of(token_id)?;
        if to == owner {
            return Err(ReceiptError::ApprovalToOwner);
        }
        if *caller != owner && !self.is_approved_for_all(&owner, caller) {
            return Err(ReceiptError::NotOwnerNorOperator);
        }
        if let Some(receipt) = self.tokens.get_mut(&token_id) {
            receipt.approved = (to != ZERO_ADDRESS).then_some(to);
        }
        Ok(())
    }

    pub fn get_approved(&self, token_id: TokenId) -> Result<Option<Address>> {
        self.get(token_id).map(|r| r.approved)
    }

    pub fn set_approval_for_all(&mut self, caller: &Address, operator: Address, approved: bool) -> Result<()> {
        if *caller == operator {
            return Err(ReceiptError::ApproveToCaller);
        }
        if approved {
            self.operators.insert((*caller, operator));
        } else {
            self.operators.remove(&(*caller, operator));
        }
        Ok(())
    }

    pub fn is_approved_for_all(&self, owner: &Address, operator: &Address) -> bool {
        self.operators.contains(&(*owner, *operator))
    }

    pub fn transfer_from(
        &mut self,
        caller: &Address,
        from: &Address,
        to: Address,
        token_id: TokenId,
    ) -> Result<()> {
        let receipt = self.get(token_id)?;
        let owner = receipt.owner;
        let authorized = *caller == owner
            || receipt.approved.as_ref() == Some(caller)
            || self.is_approved_for_all(&owner, caller);
        if !authorized {
            return Err(ReceiptError::NotOwnerNorApproved);
        }
        if owner != *from {
            return Err(ReceiptError::WrongOwner);
        }
        if to == ZERO_ADDRESS {
            return Err(ReceiptError::TransferToZero);
        }

        if let Some(ids) = self.owned.get_mut(from) {
            if let Some(pos) = ids.iter().position(|id| *id == token_id) {
                ids.swap_remove(pos);
            }
            if ids.is_empty() {
                self.owned.remove(from);
            }
        }
        self.owned.entry(to).or_default().push(token_id);

        if let Some(receipt) = self.tokens.get_mut(&token_id) {
            receipt.owner = to;
            receipt.approved = None;
        }
        Ok(())
    }

    fn get(&self, token_id: TokenId) -> Result<&Receipt> {
        self.tokens
            .get(&token_id)
            .ok_or(ReceiptError::NonexistentToken(token_id))
    }
}
