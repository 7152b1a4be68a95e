//! The distributor engine
//!
//! `MerkleDistributor` ties root consensus, claim records, epoch receipts and
//! (in funded mode) the debt account to a token and a governance
//! collaborator. Every mutating operation validates completely before it
//! touches state, so a returned error always leaves the distributor as it
//! was.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use rewardcraft_core::{
    short_hex, Address, Amount, DistributorConfig, EpochId, Hash, PayoutMode, Role, RootProposal,
    TokenId,
};

use crate::claims::{resolve_payee, ClaimLedger};
use crate::consensus::{Epoch, ProposalOutcome, RootConsensus};
use crate::debt::DebtAccount;
use crate::events::{DistributorEvent, EventLog, EventRecord};
use crate::governance::Governance;
use crate::receipts::EpochReceiptLedger;
use crate::token::Token;
use crate::{DistributorError, Result};

pub struct MerkleDistributor<T: Token, G: Governance> {
    pub(crate) config: DistributorConfig,
    pub(crate) token: T,
    pub(crate) governance: G,
    pub(crate) consensus: RootConsensus,
    pub(crate) receipts: EpochReceiptLedger,
    pub(crate) claims: ClaimLedger,
    /// Only moves in `PayoutMode::Funded`
    pub(crate) debt: DebtAccount,
    pub(crate) events: EventLog,
}

impl<T: Token, G: Governance> MerkleDistributor<T, G> {
    /// Create a distributor with no finalized epochs.
    ///
    /// Fails if the configured threshold cannot be met by the updaters
    /// `governance` currently knows about.
    pub fn new(config: DistributorConfig, token: T, governance: G) -> Result<Self> {
        config.validate(governance.role_member_count(Role::Updater))?;

        info!(
            "Distributor {} created (threshold={}, payout={:?})",
            short_hex(&config.address),
            config.update_threshold,
            config.payout,
        );

        Ok(Self {
            consensus: RootConsensus::new(config.update_threshold),
            config,
            token,
            governance,
            receipts: EpochReceiptLedger::new(),
            claims: ClaimLedger::new(),
            debt: DebtAccount::new(),
            events: EventLog::new(),
        })
    }

    // ==================== Root Proposals ====================

    /// Vote for the root of the next epoch.
    ///
    /// The vote that brings a root to the threshold finalizes it: the root
    /// goes live, an epoch receipt is minted to `caller` and, for a funded
    /// distributor, the increase in the cumulative total is added to debt.
    pub fn propose_root(&mut self, caller: &Address, proposal: RootProposal) -> Result<ProposalOutcome> {
        self.require_role(Role::Updater, caller)?;

        let total = match self.config.payout {
            PayoutMode::Funded => Some(proposal.total.ok_or(DistributorError::MissingTotal)?),
            PayoutMode::Mint => {
                if proposal.total.is_some() {
                    debug!("Ignoring distribution total on minting distributor");
                }
                None
            }
        };

        let governance = &self.governance;
        let is_updater = |u: &Address| governance.has_role(Role::Updater, u);
        let votes = self.consensus.check(caller, &proposal, is_updater)?;
        let finalizes = votes >= self.consensus.threshold();

        let mut debt_delta = None;
        if finalizes {
            self.receipts.check_mint(caller, proposal.epoch)?;
            if let Some(total) = total {
                let holding = self.token_balance();
                match self.debt.check_finalization(total, holding) {
                    Ok(delta) => debt_delta = Some((total, delta)),
                    Err(e) => {
                        warn!(
                            "Rejected root {} for epoch {}: {}",
                            short_hex(&proposal.root),
                            proposal.epoch,
                            e,
                        );
                        return Err(e);
                    }
                }
            }
        }

        let root = proposal.root;
        let epoch_id = proposal.epoch;
        let governance = &self.governance;
        let outcome = self.consensus.commit(*caller, RootProposal { total, ..proposal }, |u| {
            governance.has_role(Role::Updater, u)
        });

        self.events.emit(DistributorEvent::RootProposed {
            updater: *caller,
            epoch: epoch_id,
            root,
            votes,
        });

        match &outcome {
            ProposalOutcome::Pending { votes, .. } => {
                debug!(
                    "Updater {} voted for root {} in epoch {} ({}/{})",
                    short_hex(caller),
                    short_hex(&root),
                    epoch_id,
                    votes,
                    self.consensus.threshold(),
                );
            }
            ProposalOutcome::Finalized(epoch) => {
                if let Some((total, delta)) = debt_delta {
                    self.debt.finalize(total, delta);
                }
                self.receipts.mint(*caller, epoch.id, epoch.uri.clone())?;
                self.events.emit(DistributorEvent::RootFinalized {
                    epoch: epoch.id,
                    root: epoch.root,
                    uri: epoch.uri.clone(),
                    finalized_by: *caller,
                });
                info!(
                    "Finalized epoch {} with root {} (uri: {}, debt: {})",
                    epoch.id,
                    short_hex(&epoch.root),
                    epoch.uri,
                    self.debt.debt_total(),
                );
            }
        }

        Ok(outcome)
    }

    // ==================== Claims ====================

    /// Settle a leaf of the live root. Returns the amount paid.
    ///
    /// `amount` is the cumulative total for `index`; only the part not yet
    /// paid is settled.
    pub fn claim(
        &mut self,
        caller: &Address,
        index: u64,
        account: &Address,
        amount: Amount,
        proof: &[Hash],
    ) -> Result<Amount> {
        let payee = resolve_payee(&self.governance, caller, account)?;
        let root = self.consensus.current_root();
        self.claims.verify(&root, index, account, amount, proof)?;
        let payout = self.claims.claimable(index, amount)?;

        match self.config.payout {
            PayoutMode::Mint => {
                self.token.mint(&self.config.address, &payee, payout)?;
            }
            PayoutMode::Funded => {
                self.debt.check_settle(payout)?;
                self.token.transfer(&self.config.address, &payee, payout)?;
                self.debt.settle(payout)?;
            }
        }
        self.claims.record(index, amount);

        self.events.emit(DistributorEvent::Claimed {
            index,
            account: *account,
            payee,
            amount: payout,
        });
        info!(
            "Claimed {} for index {} (account {}, paid to {})",
            payout,
            index,
            short_hex(account),
            short_hex(&payee),
        );

        Ok(payout)
    }

    // ==================== Administration ====================

    /// Change the number of agreeing updaters required to finalize.
    pub fn set_update_threshold(&mut self, caller: &Address, threshold: usize) -> Result<()> {
        self.require_role(Role::Admin, caller)?;
        if threshold == 0 {
            return Err(DistributorError::ZeroThreshold);
        }
        let updaters = self.governance.role_member_count(Role::Updater);
        if threshold > updaters {
            return Err(DistributorError::UnreachableThreshold { threshold, updaters });
        }

        let old = self.consensus.threshold();
        self.consensus.set_threshold(threshold);
        self.config.update_threshold = threshold;
        self.events.emit(DistributorEvent::ThresholdChanged { old, new: threshold });
        info!("Update threshold changed {} -> {}", old, threshold);
        Ok(())
    }

    /// Replace the governance collaborator, returning the old one.
    pub fn set_governance(&mut self, caller: &Address, governance: G) -> Result<G> {
        self.require_role(Role::Admin, caller)?;
        let old = std::mem::replace(&mut self.governance, governance);
        self.events.emit(DistributorEvent::GovernanceChanged);
        info!("Governance replaced by {}", short_hex(caller));
        Ok(old)
    }

    // ==================== Epoch Receipts ====================

    pub fn receipts(&self) -> &EpochReceiptLedger {
        &self.receipts
    }

    pub fn owner_of(&self, token_id: TokenId) -> Result<Address> {
        Ok(self.receipts.owner_of(token_id)?)
    }

    pub fn token_uri(&self, token_id: TokenId) -> Result<&str> {
        Ok(self.receipts.token_uri(token_id)?)
    }

    pub fn approve(&mut self, caller: &Address, to: Address, token_id: TokenId) -> Result<()> {
        Ok(self.receipts.approve(caller, to, token_id)?)
    }

    pub fn set_approval_for_all(&mut self, caller: &Address, operator: Address, approved: bool) -> Result<()> {
        Ok(self.receipts.set_approval_for_all(caller, operator, approved)?)
    }

    pub fn transfer_from(
        &mut self,
        caller: &Address,
        from: &Address,
        to: Address,
        token_id: TokenId,
    ) -> Result<()> {
        self.receipts.transfer_from(caller, from, to, token_id)?;
        self.events.emit(DistributorEvent::ReceiptTransferred {
            token_id,
            from: *from,
            to,
        });
        debug!(
            "Receipt {} transferred {} -> {}",
            token_id,
            short_hex(from),
            short_hex(&to),
        );
        Ok(())
    }

    // ==================== Queries ====================

    pub fn config(&self) -> &DistributorConfig {
        &self.config
    }

    pub fn address(&self) -> &Address {
        &self.config.address
    }

    pub fn current_root(&self) -> Hash {
        self.consensus.current_root()
    }

    /// Whether `root` was finalized in any epoch.
    pub fn previous_merkle_root(&self, root: &Hash) -> bool {
        self.consensus.is_previous_root(root)
    }

    pub fn distribution_count(&self) -> EpochId {
        self.consensus.distribution_count()
    }

    pub fn update_threshold(&self) -> usize {
        self.consensus.threshold()
    }

    pub fn epoch(&self, id: EpochId) -> Option<&Epoch> {
        self.consensus.epoch(id)
    }

    /// Votes cast so far for the open epoch.
    pub fn pending_proposals(&self) -> &BTreeMap<Address, Hash> {
        self.consensus.pending()
    }

    pub fn claimed_amount(&self, index: u64) -> Amount {
        self.claims.claimed_amount(index)
    }

    pub fn is_claimed(&self, index: u64) -> bool {
        self.claims.is_claimed(index)
    }

    pub fn debt_total(&self) -> Amount {
        self.debt.debt_total()
    }

    pub fn distribution_total(&self) -> Amount {
        self.debt.distribution_total()
    }

    /// Token holding not committed to finalized distributions.
    pub fn balance(&self) -> Amount {
        self.debt.available(self.token_balance())
    }

    /// Raw token holding of the distributor account.
    pub fn token_balance(&self) -> Amount {
        self.token.balance_of(&self.config.address)
    }

    pub fn events_since(&self, seq: u64) -> &[EventRecord] {
        self.events.since(seq)
    }

    // ==================== Collaborators ====================

    pub fn token(&self) -> &T {
        &self.token
    }

    pub fn token_mut(&mut self) -> &mut T {
        &mut self.token
    }

    pub fn governance(&self) -> &G {
        &self.governance
    }

    pub fn governance_mut(&mut self) -> &mut G {
        &mut self.governance
    }

    fn require_role(&self, role: Role, caller: &Address) -> Result<()> {
        if self.governance.has_role(role, caller) {
            Ok(())
        } else {
            Err(DistributorError::MissingRole(role))
        }
    }
}
