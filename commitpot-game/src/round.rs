use crate::commitment::{
    verify_and_derive_target, Commitment, CommitmentScheme, Reveal, Sha256Commitment,
};
use crate::events::GameEvent;
use crate::ledger::{Entry, ParticipantLedger};
use crate::{GameError, Result};
use chrono::Duration;
use commitpot_core::{AccountId, Amount, Timestamp};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Uncommitted,
    Committed,
    Revealed,
}

/// Operator's parameters for one round.
#[derive(Debug, Clone)]
pub struct RoundParams {
    pub commitment: Commitment,
    pub guess_period: Duration,
    pub reveal_period: Duration,
    pub min_stake: Amount,
}

impl RoundParams {
    pub fn new(
        commitment: Commitment,
        guess_period: Duration,
        reveal_period: Duration,
        min_stake: Amount,
    ) -> Self {
        Self {
            commitment,
            guess_period,
            reveal_period,
            min_stake,
        }
    }
}

/// The single round slot. Every method takes the operation's `now` and
/// either applies its whole effect or returns an error having changed nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    id: Uuid,
    operator: AccountId,
    phase: Phase,
    commitment: Option<Commitment>,
    committed_at: Option<Timestamp>,
    guess_deadline: Option<Timestamp>,
    reveal_deadline: Option<Timestamp>,
    min_stake: Amount,
    /// Running balance: stakes in, payouts and refunds out.
    pub(crate) total_pot: Amount,
    /// Pot frozen at reveal; every pro-rata share is computed against it.
    pub(crate) settlement_pot: Amount,
    target_value: Option<u8>,
    pub(crate) ledger: ParticipantLedger,
}

impl Round {
    pub fn new(operator: AccountId) -> Self {
        Self {
            id: Uuid::new_v4(),
            operator,
            phase: Phase::Uncommitted,
            commitment: None,
            committed_at: None,
            guess_deadline: None,
            reveal_deadline: None,
            min_stake: Amount::ZERO,
            total_pot: Amount::ZERO,
            settlement_pot: Amount::ZERO,
            target_value: None,
            ledger: ParticipantLedger::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn operator(&self) -> &AccountId {
        &self.operator
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn commitment(&self) -> Option<&Commitment> {
        self.commitment.as_ref()
    }

    pub fn guess_deadline(&self) -> Option<Timestamp> {
        self.guess_deadline
    }

    pub fn reveal_deadline(&self) -> Option<Timestamp> {
        self.reveal_deadline
    }

    pub fn min_stake(&self) -> Amount {
        self.min_stake
    }

    pub fn total_pot(&self) -> Amount {
        self.total_pot
    }

    pub fn settlement_pot(&self) -> Amount {
        self.settlement_pot
    }

    pub fn target_value(&self) -> Option<u8> {
        self.target_value
    }

    pub fn entry(&self, participant: &AccountId) -> Option<&Entry> {
        self.ledger.get(participant)
    }

    pub fn ledger(&self) -> &ParticipantLedger {
        &self.ledger
    }

    pub fn registry_len(&self) -> usize {
        self.ledger.len()
    }

    pub(crate) fn ensure_operator(&self, caller: &AccountId) -> Result<()> {
        if *caller != self.operator {
            return Err(GameError::NotOperator);
        }
        Ok(())
    }

    /// Open the round: store the commitment and fix both deadlines.
    pub fn commit(
        &mut self,
        caller: &AccountId,
        params: RoundParams,
        now: Timestamp,
    ) -> Result<GameEvent> {
        self.ensure_operator(caller)?;

        if self.phase != Phase::Uncommitted {
            return Err(GameError::AlreadyCommitted);
        }

        if params.guess_period <= Duration::zero() || params.reveal_period <= Duration::zero() {
            return Err(GameError::InvalidPeriod);
        }

        let guess_deadline = now
            .checked_add_signed(params.guess_period)
            .ok_or(GameError::InvalidPeriod)?;
        let reveal_deadline = guess_deadline
            .checked_add_signed(params.reveal_period)
            .ok_or(GameError::InvalidPeriod)?;

        self.ledger.clear();
        self.phase = Phase::Committed;
        self.commitment = Some(params.commitment);
        self.committed_at = Some(now);
        self.guess_deadline = Some(guess_deadline);
        self.reveal_deadline = Some(reveal_deadline);
        self.min_stake = params.min_stake;
        self.total_pot = Amount::ZERO;
        self.settlement_pot = Amount::ZERO;
        self.target_value = None;

        Ok(GameEvent::Committed {
            commitment: params.commitment,
            guess_deadline,
            reveal_deadline,
            min_stake: params.min_stake,
        })
    }

    pub fn is_guessing_open(&self, now: Timestamp) -> bool {
        self.phase == Phase::Committed && self.guess_deadline.map_or(false, |d| now <= d)
    }

    pub fn is_reveal_window_open(&self, now: Timestamp) -> bool {
        self.phase == Phase::Committed && self.reveal_deadline.map_or(false, |d| now <= d)
    }

    /// Committed but never revealed, and the reveal deadline has passed.
    pub fn is_refund_eligible(&self, now: Timestamp) -> bool {
        self.phase == Phase::Committed && self.reveal_deadline.map_or(false, |d| now > d)
    }

    /// The only way an entry enters the ledger.
    pub fn register_guess(
        &mut self,
        participant: AccountId,
        guess: u8,
        stake: Amount,
        now: Timestamp,
    ) -> Result<GameEvent> {
        if self.phase != Phase::Committed {
            return Err(GameError::NotCommitted);
        }

        let deadline = self.guess_deadline.ok_or(GameError::NotCommitted)?;
        if now > deadline {
            return Err(GameError::GuessWindowClosed);
        }

        if stake == Amount::ZERO || stake < self.min_stake {
            return Err(GameError::StakeTooLow {
                stake: stake.to_sat(),
                min_stake: self.min_stake.to_sat(),
            });
        }

        let total_pot = self
            .total_pot
            .checked_add(stake)
            .ok_or(GameError::ArithmeticOverflow)?;

        self.ledger.insert(
            participant.clone(),
            Entry {
                guess,
                stake,
                claimed: false,
            },
        )?;
        self.total_pot = total_pot;

        Ok(GameEvent::GuessPlaced {
            participant,
            guess,
            stake,
        })
    }

    /// Take back a registration whose stake never arrived.
    pub(crate) fn rollback_guess(&mut self, participant: &AccountId) {
        if let Some(entry) = self.ledger.remove_latest(participant) {
            self.total_pot = self
                .total_pot
                .checked_sub(entry.stake)
                .unwrap_or(Amount::ZERO);
        }
    }

    /// Every check a reveal must pass before reveal-time entropy is read:
    /// caller, phase, deadline and the secret itself.
    pub(crate) fn check_reveal(
        &self,
        caller: &AccountId,
        reveal: &Reveal,
        now: Timestamp,
    ) -> Result<Commitment> {
        self.ensure_operator(caller)?;

        match self.phase {
            Phase::Revealed => return Err(GameError::AlreadyRevealed),
            Phase::Uncommitted => return Err(GameError::NotCommitted),
            Phase::Committed => {}
        }

        let deadline = self.reveal_deadline.ok_or(GameError::NotCommitted)?;
        if now > deadline {
            return Err(GameError::RevealWindowClosed);
        }

        let commitment = self.commitment.ok_or(GameError::NotCommitted)?;
        if !Sha256Commitment::verify(&commitment, &reveal.secret, reveal.salt) {
            return Err(GameError::SecretMismatch);
        }
        Ok(commitment)
    }

    /// Check the reveal against the commitment and fix the target value.
    pub fn reveal(
        &mut self,
        caller: &AccountId,
        reveal: &Reveal,
        extra_entropy: &[u8],
        now: Timestamp,
    ) -> Result<GameEvent> {
        let commitment = self.check_reveal(caller, reveal, now)?;
        let target_value = verify_and_derive_target(reveal, &commitment, extra_entropy)?;

        self.target_value = Some(target_value);
        self.settlement_pot = self.total_pot;
        self.phase = Phase::Revealed;

        Ok(GameEvent::Revealed {
            secret: reveal.secret.clone(),
            salt: reveal.salt,
            target_value,
        })
    }

    /// Back to `Uncommitted` with nothing carried over. Entries are cleared by the caller.
    pub(crate) fn clear_round_state(&mut self) {
        self.phase = Phase::Uncommitted;
        self.commitment = None;
        self.committed_at = None;
        self.guess_deadline = None;
        self.reveal_deadline = None;
        self.min_stake = Amount::ZERO;
        self.total_pot = Amount::ZERO;
        self.settlement_pot = Amount::ZERO;
        self.target_value = None;
    }

    pub fn info(&self) -> RoundInfo {
        RoundInfo {
            id: self.id,
            operator: self.operator.clone(),
            phase: self.phase,
            commitment: self.commitment,
            committed_at: self.committed_at,
            guess_deadline: self.guess_deadline,
            reveal_deadline: self.reveal_deadline,
            min_stake: self.min_stake,
            total_pot: self.total_pot,
            settlement_pot: self.settlement_pot,
            target_value: self.target_value,
            participant_count: self.ledger.len(),
        }
    }
}

/// Round info for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundInfo {
    pub id: Uuid,
    pub operator: AccountId,
    pub phase: Phase,
    pub commitment: Option<Commitment>,
    pub committed_at: Option<Timestamp>,
    pub guess_deadline: Option<Timestamp>,
    pub reveal_deadline: Option<Timestamp>,
    pub min_stake: Amount,
    pub total_pot: Amount,
    pub settlement_pot: Amount,
    pub target_value: Option<u8>,
    pub participant_count: usize,
}
