pub mod account;
pub mod round;

pub use account::{handle_account_command, AccountCommands};
pub use round::{
    claim_prize, commit_round, init_round, place_guess, refund_stake, reset_round, reveal_secret,
    show_commitment, show_entries, show_events, show_status, withdraw,
};

use anyhow::{anyhow, Context as _, Result};
use commitpot_core::storage::{EventStore, RoundStore};
use commitpot_core::{
    AccountId, GameConfig, LedgerHeightEntropy, SqliteTreasury, Storage, SystemClock,
};
use commitpot_game::{BettingGame, GameEvent, Round};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Everything a command needs: the SQLite ledger and the loaded config.
pub struct Context {
    storage: Arc<Storage>,
    config: GameConfig,
}

impl Context {
    pub async fn open(data_dir: &Path) -> Result<Self> {
        let config = GameConfig::load_or_default(data_dir)
            .await
            .context("Failed to load commitpot.json")?;
        let storage = Arc::new(Storage::new(&data_dir.join("commitpot.db")).await?);

        Ok(Self { storage, config })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn treasury(&self) -> Result<SqliteTreasury> {
        Ok(SqliteTreasury::new(
            self.config.pot_account()?,
            self.storage.clone(),
        ))
    }

    pub fn build_game(&self, round: Round) -> Result<BettingGame> {
        let game = BettingGame::from_round(
            round,
            Arc::new(self.treasury()?),
            Arc::new(SystemClock::new()),
            Arc::new(LedgerHeightEntropy::new(self.storage.clone())),
        )
        .with_withdraw_policy(self.config.withdraw_policy);
        Ok(game)
    }

    pub async fn load_round(&self) -> Result<Option<Round>> {
        Ok(RoundStore::new(&self.storage).load_latest().await?)
    }

    pub async fn load_game(&self) -> Result<BettingGame> {
        let round = self
            .load_round()
            .await?
            .ok_or_else(|| anyhow!("No round found. Use 'commitpot init <operator>' first"))?;
        self.build_game(round)
    }

    /// Save the round snapshot and drain published events into the log.
    pub async fn persist(
        &self,
        game: &BettingGame,
        events: &mut broadcast::Receiver<GameEvent>,
    ) -> Result<()> {
        let round = game.snapshot().await;
        RoundStore::new(&self.storage).save(round.id(), &round).await?;

        let event_store = EventStore::new(&self.storage);
        let mut logged = 0;
        while let Ok(event) = events.try_recv() {
            event_store.append(round.id(), event.kind(), &event).await?;
            logged += 1;
        }

        tracing::debug!("Persisted round {} with {} new events", round.id(), logged);

        Ok(())
    }
}

pub fn parse_account(id: &str) -> Result<AccountId> {
    Ok(AccountId::new(id)?)
}
