//! commitpot core - the hosting environment a guessing round runs against.
//!
//! Provides account identities, satoshi amounts, a monotonic clock, a
//! reveal-time entropy source, the pot treasury and SQLite persistence.

pub mod config;
pub mod error;
pub mod host;
pub mod storage;
pub mod treasury;
pub mod types;

pub use config::{period_from_secs, GameConfig, WithdrawPolicy};
pub use error::{CoreError, Result};
pub use host::{Clock, EntropySource, LedgerHeightEntropy, ManualClock, SequenceEntropy, SystemClock};
pub use storage::Storage;
pub use treasury::{MemoryTreasury, SqliteTreasury, Treasury};
pub use types::{AccountBalance, AccountId, Timestamp, TransferRecord};

pub use ::bitcoin::Amount;
