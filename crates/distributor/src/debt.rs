//! Funded-mode debt tracking
//!
//! `debt_total` is what has been promised through finalized roots and not
//! yet paid out. A new root may only finalize if the distributor's token
//! holding covers the outstanding debt plus the increase in the cumulative
//! distribution total.

use rewardcraft_core::Amount;

use crate::{DistributorError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebtAccount {
    pub(crate) debt_total: Amount,
    pub(crate) distribution_total: Amount,
}

impl DebtAccount {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debt_total(&self) -> Amount {
        self.debt_total
    }

    /// Cumulative total of the latest finalized distribution.
    pub fn distribution_total(&self) -> Amount {
        self.distribution_total
    }

    /// Holding not yet committed to any finalized distribution.
    pub fn available(&self, holding: Amount) -> Amount {
        holding.saturating_sub(self.debt_total)
    }

    /// Check that `holding` can cover finalizing a distribution with
    /// cumulative total `total`. Returns the new debt it adds.
    pub fn check_finalization(&self, total: Amount, holding: Amount) -> Result<Amount> {
        if total < self.distribution_total {
            return Err(DistributorError::TotalDecreased {
                previous: self.distribution_total,
                proposed: total,
            });
        }
        let delta = total - self.distribution_total;
        let available = self.available(holding);
        if available < delta {
            return Err(DistributorError::Underfunded {
                required: delta,
                available,
            });
        }
        Ok(delta)
    }

    /// Apply a finalization that passed `check_finalization`.
    pub fn finalize(&mut self, total: Amount, delta: Amount) {
        self.distribution_total = total;
        self.debt_total = self.debt_total.saturating_add(delta);
    }

    pub fn check_settle(&self, amount: Amount) -> Result<()> {
        if amount > self.debt_total {
            return Err(DistributorError::DebtUnderflow);
        }
        Ok(())
    }

    /// Reduce debt by a paid claim.
    pub fn settle(&mut self, amount: Amount) -> Result<()> {
        self.check_settle(amount)?;
        self.debt_total -= amount;
        Ok(())
    }
}
