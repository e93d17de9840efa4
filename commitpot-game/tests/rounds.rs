use async_trait::async_trait;
use chrono::{Duration, Utc};
use commitpot_core::{
    AccountId, Amount, CoreError, ManualClock, MemoryTreasury, SequenceEntropy, Treasury,
    WithdrawPolicy,
};
use commitpot_game::{
    BettingGame, CommitmentScheme, GameError, GameEvent, Phase, Reveal, RoundParams,
    Sha256Commitment,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn account(id: &str) -> AccountId {
    AccountId::new(id).unwrap()
}

fn sats(n: u64) -> Amount {
    Amount::from_sat(n)
}

/// Target the engine will derive on its first reveal (entropy counter starts at 0).
fn expected_target() -> u8 {
    Sha256Commitment::derive_target(b"7", 42, &0u64.to_be_bytes())
}

/// Wraps a memory treasury and refuses payouts while `fail` is set.
struct FlakyTreasury {
    inner: MemoryTreasury,
    fail: AtomicBool,
}

#[async_trait]
impl Treasury for FlakyTreasury {
    fn pot_account(&self) -> &AccountId {
        self.inner.pot_account()
    }

    async fn collect(&self, from: &AccountId, amount: Amount) -> commitpot_core::Result<String> {
        self.inner.collect(from, amount).await
    }

    async fn transfer(&self, to: &AccountId, amount: Amount) -> commitpot_core::Result<String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CoreError::internal("ledger unavailable"));
        }
        self.inner.transfer(to, amount).await
    }

    async fn balance(&self) -> commitpot_core::Result<Amount> {
        self.inner.balance().await
    }
}

struct Harness {
    game: BettingGame,
    clock: Arc<ManualClock>,
    treasury: Arc<FlakyTreasury>,
}

impl Harness {
    fn new() -> Self {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let treasury = Arc::new(FlakyTreasury {
            inner: MemoryTreasury::new(account("pot")),
            fail: AtomicBool::new(false),
        });
        for name in ["alice", "bob", "carol"] {
            treasury.inner.credit(&account(name), sats(1_000));
        }

        let game = BettingGame::new(
            account("operator"),
            treasury.clone(),
            clock.clone(),
            Arc::new(SequenceEntropy::new(0)),
        );

        Self {
            game,
            clock,
            treasury,
        }
    }

    async fn commit(&self) {
        self.game
            .commit(
                &account("operator"),
                RoundParams::new(
                    Sha256Commitment::commit(b"7", 42),
                    Duration::seconds(100),
                    Duration::seconds(50),
                    sats(10),
                ),
            )
            .await
            .unwrap();
    }

    fn balance(&self, name: &str) -> Amount {
        self.treasury.inner.balance_of(&account(name))
    }
}

#[tokio::test]
async fn test_winner_takes_pot_and_loser_is_settled() {
    let h = Harness::new();
    let mut events = h.game.subscribe();
    let target = expected_target();

    h.commit().await;
    h.game
        .register_guess(&account("alice"), target, sats(30))
        .await
        .unwrap();
    h.game
        .register_guess(&account("bob"), target.wrapping_add(1), sats(70))
        .await
        .unwrap();
    assert_eq!(h.game.info().await.total_pot, sats(100));
    assert_eq!(h.treasury.balance().await.unwrap(), sats(100));

    h.clock.advance(Duration::seconds(101));
    assert!(!h.game.is_guessing_open().await);
    assert!(h.game.is_reveal_window_open().await);

    let revealed = h
        .game
        .reveal(&account("operator"), Reveal::new("7", 42))
        .await
        .unwrap();
    assert_eq!(revealed, target);
    assert_eq!(h.game.phase().await, Phase::Revealed);

    assert_eq!(h.game.claim(&account("alice")).await.unwrap(), sats(100));
    assert_eq!(h.game.claim(&account("bob")).await.unwrap(), Amount::ZERO);

    assert_eq!(h.balance("alice"), sats(1_070));
    assert_eq!(h.balance("bob"), sats(930));
    assert_eq!(h.game.info().await.total_pot, Amount::ZERO);
    assert!(h.game.entry(&account("bob")).await.unwrap().claimed);

    let kinds: Vec<&str> = std::iter::from_fn(|| events.try_recv().ok())
        .map(|event| event.kind())
        .collect();
    assert_eq!(
        kinds,
        vec!["Committed", "GuessPlaced", "GuessPlaced", "Revealed", "PrizeClaimed", "PrizeClaimed"]
    );
}

#[tokio::test]
async fn test_losing_claim_publishes_zero_payout() {
    let h = Harness::new();
    let target = expected_target();
    h.commit().await;
    h.game
        .register_guess(&account("bob"), target.wrapping_add(3), sats(70))
        .await
        .unwrap();
    h.game
        .reveal(&account("operator"), Reveal::new("7", 42))
        .await
        .unwrap();

    let mut events = h.game.subscribe();
    assert_eq!(h.game.claim(&account("bob")).await.unwrap(), Amount::ZERO);
    assert_eq!(
        events.try_recv().unwrap(),
        GameEvent::PrizeClaimed {
            participant: account("bob"),
            amount: Amount::ZERO,
        }
    );
    assert!(matches!(
        h.game.claim(&account("bob")).await,
        Err(GameError::AlreadyClaimed(_))
    ));
}

#[tokio::test]
async fn test_missed_reveal_refunds_exactly_once() {
    let h = Harness::new();
    h.commit().await;
    h.game
        .register_guess(&account("alice"), 7, sats(30))
        .await
        .unwrap();

    assert!(matches!(
        h.game.refund(&account("alice")).await,
        Err(GameError::RefundNotEligible)
    ));

    h.clock.advance(Duration::seconds(151));
    assert!(h.game.is_refund_eligible().await);
    assert!(matches!(
        h.game.reveal(&account("operator"), Reveal::new("7", 42)).await,
        Err(GameError::RevealWindowClosed)
    ));

    assert_eq!(h.game.refund(&account("alice")).await.unwrap(), sats(30));
    assert_eq!(h.balance("alice"), sats(1_000));
    assert_eq!(h.game.info().await.total_pot, Amount::ZERO);

    assert!(matches!(
        h.game.refund(&account("alice")).await,
        Err(GameError::AlreadyClaimed(_))
    ));
    assert!(matches!(
        h.game.claim(&account("alice")).await,
        Err(GameError::NotRevealed)
    ));
    assert_eq!(h.balance("alice"), sats(1_000));
}

#[tokio::test]
async fn test_failed_transfer_rolls_back_claim() {
    let h = Harness::new();
    let target = expected_target();
    h.commit().await;
    h.game
        .register_guess(&account("alice"), target, sats(40))
        .await
        .unwrap();
    h.game
        .reveal(&account("operator"), Reveal::new("7", 42))
        .await
        .unwrap();

    h.treasury.fail.store(true, Ordering::SeqCst);
    assert!(matches!(
        h.game.claim(&account("alice")).await,
        Err(GameError::TransferFailed(_))
    ));
    assert!(!h.game.entry(&account("alice")).await.unwrap().claimed);
    assert_eq!(h.game.info().await.total_pot, sats(40));

    h.treasury.fail.store(false, Ordering::SeqCst);
    assert_eq!(h.game.claim(&account("alice")).await.unwrap(), sats(40));
    assert_eq!(h.balance("alice"), sats(1_000));
}

#[tokio::test]
async fn test_unfunded_registration_is_rolled_back() {
    let h = Harness::new();
    h.commit().await;

    assert!(matches!(
        h.game.register_guess(&account("dave"), 1, sats(10)).await,
        Err(GameError::TransferFailed(_))
    ));
    assert_eq!(h.game.registry_len().await, 0);
    assert_eq!(h.game.info().await.total_pot, Amount::ZERO);

    // the failed attempt does not count as a guess
    h.treasury.inner.credit(&account("dave"), sats(10));
    h.game
        .register_guess(&account("dave"), 1, sats(10))
        .await
        .unwrap();
    assert_eq!(h.game.registry_len().await, 1);
}

#[tokio::test]
async fn test_concurrent_claims_pay_each_winner_once() {
    let h = Arc::new(Harness::new());
    let target = expected_target();
    h.commit().await;
    for (name, stake) in [("alice", 10), ("bob", 20), ("carol", 30)] {
        h.game
            .register_guess(&account(name), target, sats(stake))
            .await
            .unwrap();
    }
    h.game
        .reveal(&account("operator"), Reveal::new("7", 42))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..3 {
        for name in ["alice", "bob", "carol"] {
            let h = h.clone();
            handles.push(tokio::spawn(async move {
                h.game.claim(&account(name)).await
            }));
        }
    }

    let mut paid = Amount::ZERO;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(amount) => paid += amount,
            Err(GameError::AlreadyClaimed(_)) => rejected += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(paid, sats(60));
    assert_eq!(rejected, 6);
    assert_eq!(h.treasury.balance().await.unwrap(), Amount::ZERO);
}

#[tokio::test]
async fn test_reset_then_fresh_round() {
    let h = Harness::new();
    h.commit().await;
    h.game
        .register_guess(&account("alice"), 5, sats(30))
        .await
        .unwrap();

    assert!(matches!(
        h.game.reset(&account("operator")).await,
        Err(GameError::RevealDeadlineNotPassed)
    ));
    h.game
        .reveal(&account("operator"), Reveal::new("7", 42))
        .await
        .unwrap();

    assert!(matches!(
        h.game.reset(&account("alice")).await,
        Err(GameError::NotOperator)
    ));
    assert_eq!(h.game.reset(&account("operator")).await.unwrap(), 1);

    let info = h.game.info().await;
    assert_eq!(info.phase, Phase::Uncommitted);
    assert_eq!(info.participant_count, 0);
    assert_eq!(info.total_pot, Amount::ZERO);
    assert!(h.game.entry(&account("alice")).await.is_none());

    h.commit().await;
    h.game
        .register_guess(&account("alice"), 9, sats(30))
        .await
        .unwrap();
    assert_eq!(h.game.registry_len().await, 1);
    assert_eq!(h.game.info().await.total_pot, sats(30));
}

#[tokio::test]
async fn test_owner_withdraw_protects_obligations() {
    let h = Harness::new();
    let target = expected_target();
    h.commit().await;
    h.game
        .register_guess(&account("alice"), target, sats(30))
        .await
        .unwrap();
    h.game
        .register_guess(&account("bob"), target.wrapping_add(1), sats(70))
        .await
        .unwrap();

    // stakes are refundable while committed
    assert!(matches!(
        h.game.owner_withdraw(&account("operator"), sats(1)).await,
        Err(GameError::InsufficientBalance { need: 1, available: 0 })
    ));
    assert!(matches!(
        h.game.owner_withdraw(&account("alice"), sats(1)).await,
        Err(GameError::NotOperator)
    ));

    h.game
        .reveal(&account("operator"), Reveal::new("7", 42))
        .await
        .unwrap();
    assert_eq!(h.game.outstanding_obligations().await.unwrap(), sats(100));

    h.game.claim(&account("alice")).await.unwrap();
    assert_eq!(h.game.outstanding_obligations().await.unwrap(), Amount::ZERO);
    assert!(matches!(
        h.game.owner_withdraw(&account("operator"), sats(1)).await,
        Err(GameError::InsufficientBalance { .. })
    ));
}

#[tokio::test]
async fn test_unrestricted_withdraw_can_strand_winners() {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let treasury = Arc::new(MemoryTreasury::new(account("pot")));
    treasury.credit(&account("alice"), sats(50));
    let game = BettingGame::new(
        account("operator"),
        treasury.clone(),
        clock,
        Arc::new(SequenceEntropy::new(0)),
    )
    .with_withdraw_policy(WithdrawPolicy::Unrestricted);

    game.commit(
        &account("operator"),
        RoundParams::new(
            Sha256Commitment::commit(b"7", 42),
            Duration::seconds(100),
            Duration::seconds(50),
            sats(10),
        ),
    )
    .await
    .unwrap();
    game.register_guess(&account("alice"), expected_target(), sats(50))
        .await
        .unwrap();
    game.reveal(&account("operator"), Reveal::new("7", 42))
        .await
        .unwrap();

    assert_eq!(
        game.owner_withdraw(&account("operator"), sats(50)).await.unwrap(),
        sats(50)
    );
    assert!(matches!(
        game.claim(&account("alice")).await,
        Err(GameError::TransferFailed(_))
    ));
    assert!(!game.entry(&account("alice")).await.unwrap().claimed);
}

#[tokio::test]
async fn test_pot_account_cannot_play_or_withdraw() {
    let h = Harness::new();
    h.treasury.inner.credit(&account("pot"), sats(100));
    h.commit().await;
    h.game
        .register_guess(&account("alice"), 2, sats(100))
        .await
        .unwrap();

    assert!(matches!(
        h.game.register_guess(&account("pot"), 2, sats(100)).await,
        Err(GameError::PotAccount(_))
    ));
    assert_eq!(h.game.registry_len().await, 1);
    assert_eq!(h.game.info().await.total_pot, sats(100));
    assert_eq!(h.treasury.balance().await.unwrap(), sats(200));

    let pot_run = BettingGame::new(
        account("pot"),
        h.treasury.clone(),
        h.clock.clone(),
        Arc::new(SequenceEntropy::new(0)),
    )
    .with_withdraw_policy(WithdrawPolicy::Unrestricted);
    assert!(matches!(
        pot_run.owner_withdraw(&account("pot"), sats(50)).await,
        Err(GameError::PotAccount(_))
    ));
    assert_eq!(h.treasury.balance().await.unwrap(), sats(200));
}

#[tokio::test]
async fn test_stake_overflow_leaves_round_unchanged() {
    let h = Harness::new();
    h.treasury.inner.credit(&account("whale"), Amount::MAX);
    h.commit().await;
    h.game
        .register_guess(&account("alice"), 4, sats(30))
        .await
        .unwrap();

    assert!(matches!(
        h.game.register_guess(&account("whale"), 4, Amount::MAX).await,
        Err(GameError::ArithmeticOverflow)
    ));
    assert_eq!(h.game.registry_len().await, 1);
    assert!(h.game.entry(&account("whale")).await.is_none());
    assert_eq!(h.game.info().await.total_pot, sats(30));
    assert_eq!(h.balance("whale"), Amount::MAX);
    assert_eq!(h.treasury.balance().await.unwrap(), sats(30));
}

#[tokio::test]
async fn test_rejected_reveals_change_nothing() {
    let h = Harness::new();
    h.commit().await;
    h.game
        .register_guess(&account("alice"), 4, sats(30))
        .await
        .unwrap();

    assert!(matches!(
        h.game.reveal(&account("alice"), Reveal::new("7", 42)).await,
        Err(GameError::NotOperator)
    ));
    assert!(matches!(
        h.game.reveal(&account("operator"), Reveal::new("8", 42)).await,
        Err(GameError::SecretMismatch)
    ));

    let info = h.game.info().await;
    assert_eq!(info.phase, Phase::Committed);
    assert_eq!(info.total_pot, sats(30));
    assert_eq!(info.settlement_pot, Amount::ZERO);
    assert_eq!(info.target_value, None);

    // the rejected caller did not consume the reveal-time entropy
    let target = h
        .game
        .reveal(&account("operator"), Reveal::new("7", 42))
        .await
        .unwrap();
    assert_eq!(target, expected_target());
    assert_eq!(h.game.info().await.settlement_pot, sats(30));
}
