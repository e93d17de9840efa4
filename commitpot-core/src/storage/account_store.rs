use crate::error::{CoreError, Result};
use crate::storage::{amount_from_sql, amount_to_sql, Storage};
use crate::types::{AccountBalance, AccountId};
use bitcoin::Amount;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

pub struct AccountStore<'a> {
    storage: &'a Storage,
}

impl<'a> AccountStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub async fn balance(&self, account: &AccountId) -> Result<Amount> {
        let conn = self.storage.get_connection().await;
        balance_in(&conn, account)
    }

    /// Adds funds to an account from outside the ledger.
    pub async fn credit(&self, account: &AccountId, amount: Amount) -> Result<Amount> {
        let mut conn = self.storage.get_connection().await;
        let tx = conn.transaction()?;
        let current = balance_in(&tx, account)?;
        let updated = current
            .checked_add(amount)
            .ok_or_else(|| CoreError::internal("account balance overflow"))?;
        set_balance_in(&tx, account, updated)?;
        tx.commit()?;

        tracing::info!("Credited {} sats to {}", amount.to_sat(), account);
        Ok(updated)
    }

    pub async fn list(&self) -> Result<Vec<AccountBalance>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare("SELECT id, balance FROM accounts ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| {
            let id: String = row.get(0)?;
            let balance: i64 = row.get(1)?;
            Ok((id, balance))
        })?;

        let mut accounts = Vec::new();
        for row in rows {
            let (id, balance) = row?;
            accounts.push(AccountBalance {
                account: AccountId::new(id)?,
                balance: amount_from_sql(balance),
            });
        }

        Ok(accounts)
    }
}

/// Balance of an account; unknown accounts hold nothing.
pub(crate) fn balance_in(conn: &Connection, account: &AccountId) -> Result<Amount> {
    let balance: Option<i64> = conn
        .query_row(
            "SELECT balance FROM accounts WHERE id = ?1",
            params![account.as_str()],
            |row| row.get(0),
        )
        .optional()?;

    Ok(balance.map(amount_from_sql).unwrap_or(Amount::ZERO))
}

pub(crate) fn set_balance_in(conn: &Connection, account: &AccountId, balance: Amount) -> Result<()> {
    conn.execute(
        "INSERT INTO accounts (id, balance, created_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET balance = excluded.balance",
        params![account.as_str(), amount_to_sql(balance)?, Utc::now().timestamp()],
    )?;
    Ok(())
}
