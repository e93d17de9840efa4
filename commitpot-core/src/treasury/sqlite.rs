use crate::error::{CoreError, Result};
use crate::storage::account_store::{balance_in, set_balance_in};
use crate::storage::{amount_from_sql, amount_to_sql, Storage};
use crate::treasury::Treasury;
use crate::types::{AccountId, TransferRecord};
use async_trait::async_trait;
use bitcoin::Amount;
use chrono::{DateTime, Utc};
use rusqlite::params;
use std::sync::Arc;
use uuid::Uuid;

/// Treasury whose pot lives in the `accounts` table. Each move runs in one
/// SQLite transaction covering both balances and the transfer record.
pub struct SqliteTreasury {
    pot: AccountId,
    storage: Arc<Storage>,
}

impl SqliteTreasury {
    pub fn new(pot: AccountId, storage: Arc<Storage>) -> Self {
        Self { pot, storage }
    }

    async fn move_funds(&self, from: &AccountId, to: &AccountId, amount: Amount) -> Result<String> {
        if from == to {
            return Err(CoreError::invalid_account(format!(
                "cannot move funds from {} to itself",
                from
            )));
        }

        let mut conn = self.storage.get_connection().await;
        let tx = conn.transaction()?;

        let available = balance_in(&tx, from)?;
        let remaining = available
            .checked_sub(amount)
            .ok_or(CoreError::InsufficientFunds {
                need: amount.to_sat(),
                available: available.to_sat(),
            })?;
        let credited = balance_in(&tx, to)?
            .checked_add(amount)
            .ok_or_else(|| CoreError::internal("account balance overflow"))?;

        set_balance_in(&tx, from, remaining)?;
        set_balance_in(&tx, to, credited)?;

        let id = Uuid::new_v4().to_string();
        tx.execute(
            "INSERT INTO transfers (id, from_account, to_account, amount, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id,
                from.as_str(),
                to.as_str(),
                amount_to_sql(amount)?,
                Utc::now().timestamp()
            ],
        )?;

        tx.commit()?;

        tracing::debug!("Moved {} sats from {} to {}: {}", amount.to_sat(), from, to, id);
        Ok(id)
    }

    /// Transfers touching the given account, newest first.
    pub async fn history(&self, account: &AccountId) -> Result<Vec<TransferRecord>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(
            "SELECT id, from_account, to_account, amount, timestamp FROM transfers
             WHERE from_account = ?1 OR to_account = ?1 ORDER BY seq DESC",
        )?;

        let rows = stmt.query_map(params![account.as_str()], |row| {
            let id: String = row.get(0)?;
            let from: String = row.get(1)?;
            let to: String = row.get(2)?;
            let amount: i64 = row.get(3)?;
            let timestamp: i64 = row.get(4)?;
            Ok((id, from, to, amount, timestamp))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, from, to, amount, timestamp) = row?;
            records.push(TransferRecord {
                id,
                from: AccountId::new(from)?,
                to: AccountId::new(to)?,
                amount: amount_from_sql(amount),
                timestamp: DateTime::from_timestamp(timestamp, 0).unwrap_or_else(Utc::now),
            });
        }

        Ok(records)
    }
}

#[async_trait]
impl Treasury for SqliteTreasury {
    fn pot_account(&self) -> &AccountId {
        &self.pot
    }

    async fn collect(&self, from: &AccountId, amount: Amount) -> Result<String> {
        if amount == Amount::ZERO {
            return Ok(String::new());
        }
        self.move_funds(from, &self.pot, amount).await
    }

    async fn transfer(&self, to: &AccountId, amount: Amount) -> Result<String> {
        if amount == Amount::ZERO {
            return Ok(String::new());
        }
        self.move_funds(&self.pot, to, amount).await
    }

    async fn balance(&self) -> Result<Amount> {
        let conn = self.storage.get_connection().await;
        balance_in(&conn, &self.pot)
    }
}
