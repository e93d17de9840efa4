use crate::commitment::Reveal;
use crate::events::GameEvent;
use crate::ledger::Entry;
use crate::round::{Phase, Round, RoundInfo, RoundParams};
use crate::settlement::Payout;
use crate::{GameError, Result};
use commitpot_core::{AccountId, Amount, Clock, EntropySource, Treasury, WithdrawPolicy};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, MutexGuard};
use uuid::Uuid;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// One round slot driven against a host treasury, clock and entropy source.
///
/// The round sits behind a single async mutex held for the whole of each
/// operation, including the funds transfer, so no call ever observes another
/// half-applied.
pub struct BettingGame {
    round: Mutex<Round>,
    treasury: Arc<dyn Treasury>,
    clock: Arc<dyn Clock>,
    entropy: Arc<dyn EntropySource>,
    events: broadcast::Sender<GameEvent>,
    withdraw_policy: WithdrawPolicy,
}

impl BettingGame {
    pub fn new(
        operator: AccountId,
        treasury: Arc<dyn Treasury>,
        clock: Arc<dyn Clock>,
        entropy: Arc<dyn EntropySource>,
    ) -> Self {
        Self::from_round(Round::new(operator), treasury, clock, entropy)
    }

    /// Resume from a persisted snapshot.
    pub fn from_round(
        round: Round,
        treasury: Arc<dyn Treasury>,
        clock: Arc<dyn Clock>,
        entropy: Arc<dyn EntropySource>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            round: Mutex::new(round),
            treasury,
            clock,
            entropy,
            events,
            withdraw_policy: WithdrawPolicy::default(),
        }
    }

    pub fn with_withdraw_policy(mut self, policy: WithdrawPolicy) -> Self {
        self.withdraw_policy = policy;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }

    pub fn treasury(&self) -> &Arc<dyn Treasury> {
        &self.treasury
    }

    fn publish(&self, event: GameEvent) {
        tracing::debug!("Publishing {} event", event.kind());
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    async fn lock(&self) -> MutexGuard<'_, Round> {
        self.round.lock().await
    }

    /// Funds moved between the pot and itself would be counted twice.
    fn ensure_not_pot(&self, account: &AccountId) -> Result<()> {
        if account == self.treasury.pot_account() {
            return Err(GameError::PotAccount(account.clone()));
        }
        Ok(())
    }

    pub async fn commit(&self, caller: &AccountId, params: RoundParams) -> Result<()> {
        let mut round = self.lock().await;
        let now = self.clock.now();

        let event = round.commit(caller, params, now)?;

        tracing::info!(
            "Round {} committed; guessing until {:?}, reveal until {:?}",
            round.id(),
            round.guess_deadline(),
            round.reveal_deadline()
        );
        self.publish(event);
        Ok(())
    }

    /// Register a guess and collect its stake into the pot.
    pub async fn register_guess(
        &self,
        participant: &AccountId,
        guess: u8,
        stake: Amount,
    ) -> Result<()> {
        self.ensure_not_pot(participant)?;
        let mut round = self.lock().await;
        let now = self.clock.now();

        let event = round.register_guess(participant.clone(), guess, stake, now)?;

        if let Err(e) = self.treasury.collect(participant, stake).await {
            round.rollback_guess(participant);
            tracing::warn!(
                "Stake collection from {} failed, registration rolled back: {}",
                participant,
                e
            );
            return Err(GameError::transfer_failed(e.to_string()));
        }

        tracing::info!(
            "Participant {} guessed {} with {} sats in round {}",
            participant,
            guess,
            stake.to_sat(),
            round.id()
        );
        self.publish(event);
        Ok(())
    }

    /// Reveal the committed secret. Returns the derived target value.
    pub async fn reveal(&self, caller: &AccountId, reveal: Reveal) -> Result<u8> {
        let mut round = self.lock().await;
        let now = self.clock.now();

        round.check_reveal(caller, &reveal, now)?;
        let extra_entropy = self.entropy.entropy().await?;
        let event = round.reveal(caller, &reveal, &extra_entropy, now)?;
        let target = round.target_value().ok_or(GameError::NotRevealed)?;

        tracing::info!(
            "Round {} revealed: target {}, pot {} sats",
            round.id(),
            target,
            round.settlement_pot().to_sat()
        );
        self.publish(event);
        Ok(target)
    }

    /// Settle a participant after reveal. Returns the amount paid (zero for a losing guess).
    pub async fn claim(&self, participant: &AccountId) -> Result<Amount> {
        let mut round = self.lock().await;

        let payout = round.settle_claim(participant)?;
        self.pay_out(&mut round, payout).await
    }

    /// Return a participant's stake once the reveal deadline passed without a reveal.
    pub async fn refund(&self, participant: &AccountId) -> Result<Amount> {
        let mut round = self.lock().await;
        let now = self.clock.now();

        let payout = round.settle_refund(participant, now)?;
        self.pay_out(&mut round, payout).await
    }

    /// The entry is already marked claimed when this runs; a failed transfer undoes it.
    async fn pay_out(&self, round: &mut Round, payout: Payout) -> Result<Amount> {
        if let Err(e) = self.treasury.transfer(&payout.participant, payout.amount).await {
            round.rollback(&payout);
            tracing::warn!(
                "Transfer of {} sats to {} failed, claim rolled back: {}",
                payout.amount.to_sat(),
                payout.participant,
                e
            );
            return Err(GameError::transfer_failed(e.to_string()));
        }

        tracing::info!(
            "{:?} of {} sats paid to {} in round {}",
            payout.kind,
            payout.amount.to_sat(),
            payout.participant,
            round.id()
        );
        let amount = payout.amount;
        self.publish(payout.event());
        Ok(amount)
    }

    /// Clear the slot for the next round. Returns how many entries were dropped.
    pub async fn reset(&self, caller: &AccountId) -> Result<usize> {
        let mut round = self.lock().await;
        let now = self.clock.now();

        let cleared_entries = round.reset(caller, now)?;

        tracing::info!("Round {} reset, {} entries cleared", round.id(), cleared_entries);
        self.publish(GameEvent::RoundReset { cleared_entries });
        Ok(cleared_entries)
    }

    /// Operator withdrawal from the pot, bounded by the withdraw policy.
    pub async fn owner_withdraw(&self, caller: &AccountId, amount: Amount) -> Result<Amount> {
        let round = self.lock().await;
        round.ensure_operator(caller)?;
        self.ensure_not_pot(caller)?;

        let balance = self.treasury.balance().await?;
        let available = round.withdrawable(balance, self.withdraw_policy)?;
        if amount > available {
            tracing::warn!(
                "Withdrawal of {} sats refused, {} sats available under {:?}",
                amount.to_sat(),
                available.to_sat(),
                self.withdraw_policy
            );
            return Err(GameError::InsufficientBalance {
                need: amount.to_sat(),
                available: available.to_sat(),
            });
        }

        self.treasury
            .transfer(caller, amount)
            .await
            .map_err(|e| GameError::transfer_failed(e.to_string()))?;

        tracing::info!("Operator {} withdrew {} sats", caller, amount.to_sat());
        self.publish(GameEvent::OwnerWithdrawal { amount });
        Ok(amount)
    }

    pub async fn id(&self) -> Uuid {
        self.lock().await.id()
    }

    pub async fn info(&self) -> RoundInfo {
        self.lock().await.info()
    }

    pub async fn phase(&self) -> Phase {
        self.lock().await.phase()
    }

    pub async fn entry(&self, participant: &AccountId) -> Option<Entry> {
        self.lock().await.entry(participant).cloned()
    }

    /// Entries in registration order.
    pub async fn entries(&self) -> Vec<(AccountId, Entry)> {
        self.lock()
            .await
            .ledger()
            .iter()
            .map(|(id, entry)| (id.clone(), entry.clone()))
            .collect()
    }

    pub async fn registry_len(&self) -> usize {
        self.lock().await.registry_len()
    }

    pub async fn is_guessing_open(&self) -> bool {
        let round = self.lock().await;
        round.is_guessing_open(self.clock.now())
    }

    pub async fn is_reveal_window_open(&self) -> bool {
        let round = self.lock().await;
        round.is_reveal_window_open(self.clock.now())
    }

    pub async fn is_refund_eligible(&self) -> bool {
        let round = self.lock().await;
        round.is_refund_eligible(self.clock.now())
    }

    pub async fn outstanding_obligations(&self) -> Result<Amount> {
        self.lock().await.outstanding_obligations()
    }

    /// Copy of the round state for persistence.
    pub async fn snapshot(&self) -> Round {
        self.lock().await.clone()
    }
}

impl std::fmt::Debug for BettingGame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BettingGame")
            .field("treasury", self.treasury.pot_account())
            .field("withdraw_policy", &self.withdraw_policy)
            .finish()
    }
}
