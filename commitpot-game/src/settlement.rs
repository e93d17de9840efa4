//! Payouts, refunds and the round reset.
//!
//! Claims and refunds follow checks-effects-interactions: `settle_*` flips
//! the claimed flag and debits the pot before any funds move, and hands
//! back a [`Payout`] that `rollback` can undo if the transfer then fails.

use crate::events::GameEvent;
use crate::round::{Phase, Round};
use crate::{GameError, Result};
use commitpot_core::{AccountId, Amount, Timestamp, WithdrawPolicy};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayoutKind {
    Prize,
    Refund,
}

/// Funds owed to a participant whose entry has already been marked claimed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payout {
    pub participant: AccountId,
    pub amount: Amount,
    pub kind: PayoutKind,
    pot_debit: Amount,
}

impl Payout {
    pub fn event(&self) -> GameEvent {
        match self.kind {
            PayoutKind::Prize => GameEvent::PrizeClaimed {
                participant: self.participant.clone(),
                amount: self.amount,
            },
            PayoutKind::Refund => GameEvent::Refund {
                participant: self.participant.clone(),
                amount: self.amount,
            },
        }
    }
}

/// `floor(pot * stake / winning_stake)`, multiplied in 128 bits before dividing.
pub fn pro_rata_share(pot: Amount, stake: Amount, winning_stake: Amount) -> Result<Amount> {
    if winning_stake == Amount::ZERO {
        return Err(GameError::NoWinners);
    }

    let share = u128::from(pot.to_sat()) * u128::from(stake.to_sat())
        / u128::from(winning_stake.to_sat());

    u64::try_from(share)
        .map(Amount::from_sat)
        .map_err(|_| GameError::ArithmeticOverflow)
}

impl Round {
    /// Settle a participant's claim after reveal. Losing guesses settle for zero.
    pub(crate) fn settle_claim(&mut self, participant: &AccountId) -> Result<Payout> {
        match self.phase() {
            Phase::Revealed => {}
            Phase::Committed => return Err(GameError::NotRevealed),
            Phase::Uncommitted => return Err(GameError::NotCommitted),
        }
        let target = self.target_value().ok_or(GameError::NotRevealed)?;

        let entry = self
            .ledger
            .get(participant)
            .ok_or_else(|| GameError::NoEntry(participant.clone()))?;
        if entry.claimed {
            return Err(GameError::AlreadyClaimed(participant.clone()));
        }

        let amount = if entry.guess == target {
            let winning_stake = self.ledger.stake_on(target)?;
            pro_rata_share(self.settlement_pot, entry.stake, winning_stake)?
        } else {
            Amount::ZERO
        };

        tracing::debug!(
            "Claim by {}: guess {} vs target {}, payout {} sats",
            participant,
            entry.guess,
            target,
            amount.to_sat()
        );

        Ok(self.mark_claimed(participant, amount, PayoutKind::Prize))
    }

    /// Return a participant's stake after a missed reveal.
    pub(crate) fn settle_refund(&mut self, participant: &AccountId, now: Timestamp) -> Result<Payout> {
        if !self.is_refund_eligible(now) {
            return Err(GameError::RefundNotEligible);
        }

        let entry = self
            .ledger
            .get(participant)
            .ok_or_else(|| GameError::NoEntry(participant.clone()))?;
        if entry.claimed {
            return Err(GameError::AlreadyClaimed(participant.clone()));
        }

        let amount = entry.stake;
        Ok(self.mark_claimed(participant, amount, PayoutKind::Refund))
    }

    fn mark_claimed(&mut self, participant: &AccountId, amount: Amount, kind: PayoutKind) -> Payout {
        // Clamped so a broken invariant elsewhere cannot underflow the pot.
        let pot_debit = amount.min(self.total_pot);
        self.total_pot = self.total_pot.checked_sub(pot_debit).unwrap_or(Amount::ZERO);

        if let Some(entry) = self.ledger.get_mut(participant) {
            entry.claimed = true;
        }

        Payout {
            participant: participant.clone(),
            amount,
            kind,
            pot_debit,
        }
    }

    /// Undo `settle_claim`/`settle_refund` after a failed transfer.
    pub(crate) fn rollback(&mut self, payout: &Payout) {
        if let Some(entry) = self.ledger.get_mut(&payout.participant) {
            entry.claimed = false;
        }
        self.total_pot = self
            .total_pot
            .checked_add(payout.pot_debit)
            .unwrap_or(Amount::MAX);
    }

    /// Clear the slot for a new round. Returns how many entries were dropped;
    /// cost grows with the registry size.
    pub fn reset(&mut self, caller: &AccountId, now: Timestamp) -> Result<usize> {
        self.ensure_operator(caller)?;

        match self.phase() {
            Phase::Uncommitted => return Err(GameError::NotCommitted),
            Phase::Committed => {
                let passed = self.reveal_deadline().map_or(false, |d| now > d);
                if !passed {
                    return Err(GameError::RevealDeadlineNotPassed);
                }
            }
            Phase::Revealed => {}
        }

        let cleared_entries = self.ledger.clear();
        self.clear_round_state();

        Ok(cleared_entries)
    }

    /// Funds still owed to participants: refundable stakes while committed,
    /// unpaid winner shares once revealed.
    pub fn outstanding_obligations(&self) -> Result<Amount> {
        match self.phase() {
            Phase::Uncommitted => Ok(Amount::ZERO),
            Phase::Committed => self.ledger.unclaimed_stake(),
            Phase::Revealed => {
                let target = self.target_value().ok_or(GameError::NotRevealed)?;
                let winning_stake = self.ledger.stake_on(target)?;
                if winning_stake == Amount::ZERO {
                    return Ok(Amount::ZERO);
                }

                self.ledger
                    .iter()
                    .filter(|(_, entry)| entry.guess == target && !entry.claimed)
                    .try_fold(Amount::ZERO, |acc, (_, entry)| {
                        let share = pro_rata_share(self.settlement_pot, entry.stake, winning_stake)?;
                        acc.checked_add(share).ok_or(GameError::ArithmeticOverflow)
                    })
            }
        }
    }

    /// How much `owner_withdraw` may take from a treasury holding `balance`.
    pub fn withdrawable(&self, balance: Amount, policy: WithdrawPolicy) -> Result<Amount> {
        match policy {
            WithdrawPolicy::Unrestricted => Ok(balance),
            WithdrawPolicy::ProtectObligations => {
                let owed = self.outstanding_obligations()?;
                Ok(balance.checked_sub(owed).unwrap_or(Amount::ZERO))
            }
        }
    }
}
