//! Funds held on behalf of a round. The pot is an ordinary ledger account;
//! stakes move into it on registration and prizes/refunds move out of it.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryTreasury;
pub use sqlite::SqliteTreasury;

use crate::error::Result;
use crate::types::AccountId;
use async_trait::async_trait;
use bitcoin::Amount;

#[async_trait]
pub trait Treasury: Send + Sync {
    /// Account holding the pot.
    fn pot_account(&self) -> &AccountId;

    /// Move `amount` from `from` into the pot. Returns the transfer id.
    async fn collect(&self, from: &AccountId, amount: Amount) -> Result<String>;

    /// Move `amount` out of the pot to `to`. Returns the transfer id.
    /// Either both balances change or neither does.
    async fn transfer(&self, to: &AccountId, amount: Amount) -> Result<String>;

    /// Funds currently held in the pot.
    async fn balance(&self) -> Result<Amount>;
}
