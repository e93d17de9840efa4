pub mod account_store;
pub mod event_store;
pub mod round_store;

pub use account_store::AccountStore;
pub use event_store::{EventStore, StoredEvent};
pub use round_store::RoundStore;

use crate::error::{CoreError, Result};
use bitcoin::Amount;
use rusqlite::Connection;
use std::path::Path;
use tokio::sync::Mutex;

pub struct Storage {
    conn: Mutex<Connection>,
}

impl Storage {
    pub async fn new(db_path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CoreError::internal(format!("Failed to create directory: {}", e)))?;
        }

        let conn = Connection::open(db_path)?;
        Self::with_connection(conn).await
    }

    pub async fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn).await
    }

    async fn with_connection(conn: Connection) -> Result<Self> {
        let storage = Self {
            conn: Mutex::new(conn),
        };

        storage.init_schema().await?;
        Ok(storage)
    }

    async fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().await;

        // Ledger accounts, including the pot
        conn.execute(
            "CREATE TABLE IF NOT EXISTS accounts (
                id TEXT PRIMARY KEY,
                balance INTEGER NOT NULL CHECK (balance >= 0),
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS transfers (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT UNIQUE NOT NULL,
                from_account TEXT NOT NULL,
                to_account TEXT NOT NULL,
                amount INTEGER NOT NULL,
                timestamp INTEGER NOT NULL
            )",
            [],
        )?;

        // Single round slot, stored as a JSON snapshot
        conn.execute(
            "CREATE TABLE IF NOT EXISTS rounds (
                id TEXT PRIMARY KEY,
                snapshot TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS events (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                round_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                payload TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    pub async fn get_connection(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }

    /// Number of ledger writes recorded so far.
    pub async fn height(&self) -> Result<u64> {
        let conn = self.conn.lock().await;
        let height: i64 = conn.query_row(
            "SELECT (SELECT COUNT(*) FROM transfers) + (SELECT COUNT(*) FROM events)",
            [],
            |row| row.get(0),
        )?;
        Ok(height.max(0) as u64)
    }
}

pub(crate) fn amount_to_sql(amount: Amount) -> Result<i64> {
    i64::try_from(amount.to_sat())
        .map_err(|_| CoreError::internal(format!("amount {} does not fit in storage", amount)))
}

pub(crate) fn amount_from_sql(value: i64) -> Amount {
    Amount::from_sat(value.max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_schema_created_on_disk() {
        let temp_dir = tempdir().unwrap();
        let storage = Storage::new(&temp_dir.path().join("nested").join("commitpot.db"))
            .await
            .unwrap();

        assert_eq!(storage.height().await.unwrap(), 0);
    }
}
