//! Token collaborator
//!
//! The distributor pays through this seam: minting distributors call
//! `mint`, funded distributors `transfer` out of their own holding.

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tracing::debug;

use rewardcraft_core::{short_hex, Address, Amount, ZERO_ADDRESS};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError {
    #[error("Insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: Amount, available: Amount },

    #[error("Caller is not a minter")]
    NotMinter,

    #[error("Transfer to the zero address")]
    ZeroAddress,

    #[error("Supply overflow")]
    Overflow,
}

/// Fungible token operations the distributor relies on.
pub trait Token {
    fn balance_of(&self, account: &Address) -> Amount;

    /// Move `amount` from `from` to `to`.
    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), TokenError>;

    /// Create `amount` new tokens for `to`, authorized as `minter`.
    fn mint(&mut self, minter: &Address, to: &Address, amount: Amount) -> Result<(), TokenError>;
}

/// In-memory token ledger with a minter allowlist.
#[derive(Debug, Clone, Default)]
pub struct MemoryToken {
    balances: HashMap<Address, Amount>,
    minters: HashSet<Address>,
    total_supply: Amount,
}

impl MemoryToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token whose only minter is `minter`.
    pub fn with_minter(minter: Address) -> Self {
        let mut token = Self::new();
        token.grant_minter(minter);
        token
    }

    pub fn grant_minter(&mut self, account: Address) {
        self.minters.insert(account);
    }

    pub fn revoke_minter(&mut self, account: &Address) {
        self.minters.remove(account);
    }

    pub fn is_minter(&self, account: &Address) -> bool {
        self.minters.contains(account)
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }
}

impl Token for MemoryToken {
    fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), TokenError> {
        if *to == ZERO_ADDRESS {
            return Err(TokenError::ZeroAddress);
        }
        let available = self.balance_of(from);
        if available < amount {
            return Err(TokenError::InsufficientBalance { needed: amount, available });
        }
        if from == to {
            return Ok(());
        }

        self.balances.insert(*from, available - amount);
        let entry = self.balances.entry(*to).or_insert(0);
        *entry = entry.checked_add(amount).ok_or(TokenError::Overflow)?;

        debug!(
            "Transferred {} from {} to {}",
            amount,
            short_hex(from),
            short_hex(to),
        );
        Ok(())
    }

    fn mint(&mut self, minter: &Address, to: &Address, amount: Amount) -> Result<(), TokenError> {
        if !self.minters.contains(minter) {
            return Err(TokenError::NotMinter);
        }
        if *to == ZERO_ADDRESS {
            return Err(TokenError::ZeroAddress);
        }
        let supply = self.total_supply.checked_add(amount).ok_or(TokenError::Overflow)?;
        let balance = self.balance_of(to).checked_add(amount).ok_or(TokenError::Overflow)?;

        self.total_supply = supply;
        self.balances.insert(*to, balance);

        debug!("Minted {} to {}", amount, short_hex(to));
        Ok(())
    }
}
