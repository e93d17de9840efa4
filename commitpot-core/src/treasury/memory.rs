use crate::error::{CoreError, Result};
use crate::treasury::Treasury;
use crate::types::{AccountId, TransferRecord};
use async_trait::async_trait;
use bitcoin::Amount;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Ledger {
    balances: HashMap<AccountId, Amount>,
    transfers: Vec<TransferRecord>,
}

impl Ledger {
    fn balance_of(&self, account: &AccountId) -> Amount {
        self.balances.get(account).copied().unwrap_or(Amount::ZERO)
    }

    fn apply(&mut self, from: &AccountId, to: &AccountId, amount: Amount) -> Result<String> {
        if from == to {
            return Err(CoreError::invalid_account(format!(
                "cannot move funds from {} to itself",
                from
            )));
        }

        let available = self.balance_of(from);
        let remaining = available
            .checked_sub(amount)
            .ok_or(CoreError::InsufficientFunds {
                need: amount.to_sat(),
                available: available.to_sat(),
            })?;
        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or_else(|| CoreError::internal("account balance overflow"))?;

        self.balances.insert(from.clone(), remaining);
        self.balances.insert(to.clone(), credited);

        let id = Uuid::new_v4().to_string();
        self.transfers.push(TransferRecord {
            id: id.clone(),
            from: from.clone(),
            to: to.clone(),
            amount,
            timestamp: Utc::now(),
        });
        Ok(id)
    }
}

/// Treasury backed by an in-process ledger.
#[derive(Debug)]
pub struct MemoryTreasury {
    pot: AccountId,
    ledger: Mutex<Ledger>,
}

impl MemoryTreasury {
    pub fn new(pot: AccountId) -> Self {
        Self {
            pot,
            ledger: Mutex::new(Ledger::default()),
        }
    }

    pub fn credit(&self, account: &AccountId, amount: Amount) {
        let mut ledger = self.ledger.lock();
        let balance = ledger.balance_of(account);
        let credited = balance.checked_add(amount).unwrap_or(Amount::MAX);
        ledger.balances.insert(account.clone(), credited);
    }

    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.ledger.lock().balance_of(account)
    }

    pub fn transfers(&self) -> Vec<TransferRecord> {
        self.ledger.lock().transfers.clone()
    }
}

#[async_trait]
impl Treasury for MemoryTreasury {
    fn pot_account(&self) -> &AccountId {
        &self.pot
    }

    async fn collect(&self, from: &AccountId, amount: Amount) -> Result<String> {
        if amount == Amount::ZERO {
            return Ok(String::new());
        }
        self.ledger.lock().apply(from, &self.pot, amount)
    }

    async fn transfer(&self, to: &AccountId, amount: Amount) -> Result<String> {
        if amount == Amount::ZERO {
            return Ok(String::new());
        }
        self.ledger.lock().apply(&self.pot, to, amount)
    }

    async fn balance(&self) -> Result<Amount> {
        Ok(self.ledger.lock().balance_of(&self.pot))
    }
}
