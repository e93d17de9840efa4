use crate::error::{CoreError, Result};
use crate::types::AccountId;
use bitcoin::Amount;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "commitpot.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub default_guess_period_secs: i64,
    pub default_reveal_period_secs: i64,
    pub default_min_stake: Amount,
    pub pot_account: String,
    pub withdraw_policy: WithdrawPolicy,
}

/// What the operator may take out of the pot with `owner_withdraw`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WithdrawPolicy {
    /// Only funds not owed to unclaimed winners or pending refunds.
    ProtectObligations,
    /// Anything the pot holds.
    Unrestricted,
}

impl Default for WithdrawPolicy {
    fn default() -> Self {
        Self::ProtectObligations
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            default_guess_period_secs: 3600, // 1 hour
            default_reveal_period_secs: 1800,
            default_min_stake: Amount::from_sat(1_000),
            pot_account: "pot".to_string(),
            withdraw_policy: WithdrawPolicy::default(),
        }
    }
}

impl GameConfig {
    /// Reads `commitpot.json` from `data_dir`, falling back to defaults.
    pub async fn load_or_default(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE_NAME);
        let config = if tokio::fs::try_exists(&path).await? {
            let content = tokio::fs::read_to_string(&path).await?;
            serde_json::from_str(&content)?
        } else {
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    pub async fn save(&self, data_dir: &Path) -> Result<()> {
        self.validate()?;
        tokio::fs::create_dir_all(data_dir).await?;
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(data_dir.join(CONFIG_FILE_NAME), content).await?;
        Ok(())
    }

    pub fn pot_account(&self) -> Result<AccountId> {
        AccountId::new(self.pot_account.clone())
    }

    pub fn guess_period(&self) -> Result<Duration> {
        period_from_secs(self.default_guess_period_secs, "Guess")
    }

    pub fn reveal_period(&self) -> Result<Duration> {
        period_from_secs(self.default_reveal_period_secs, "Reveal")
    }

    pub fn validate(&self) -> Result<()> {
        self.guess_period()?;
        self.reveal_period()?;

        if self.default_min_stake == Amount::ZERO {
            return Err(CoreError::config("Min stake must be greater than 0"));
        }

        if self.pot_account.trim().is_empty() {
            return Err(CoreError::config("Pot account cannot be empty"));
        }

        Ok(())
    }
}

/// Positive period in seconds that chrono can represent.
pub fn period_from_secs(secs: i64, name: &str) -> Result<Duration> {
    if secs <= 0 {
        return Err(CoreError::config(format!("{} period must be greater than 0", name)));
    }

    Duration::try_seconds(secs).ok_or_else(|| {
        CoreError::config(format!("{} period of {} seconds is out of range", name, secs))
    })
}
