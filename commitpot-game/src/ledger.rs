use crate::{GameError, Result};
use commitpot_core::{AccountId, Amount};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A participant's single guess for the round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub guess: u8,
    pub stake: Amount,
    /// Flips false -> true once, on claim or refund.
    pub claimed: bool,
}

/// Entries keyed by participant, plus the ordered registry used to
/// enumerate them. Both are only ever updated together.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParticipantLedger {
    entries: HashMap<AccountId, Entry>,
    registry: Vec<AccountId>,
}

impl ParticipantLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, participant: &AccountId) -> Option<&Entry> {
        self.entries.get(participant)
    }

    pub fn contains(&self, participant: &AccountId) -> bool {
        self.entries.contains_key(participant)
    }

    /// Registry length, i.e. number of distinct registered participants.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn registry(&self) -> &[AccountId] {
        &self.registry
    }

    /// Entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&AccountId, &Entry)> + '_ {
        self.registry
            .iter()
            .filter_map(move |id| self.entries.get(id).map(|entry| (id, entry)))
    }

    pub(crate) fn insert(&mut self, participant: AccountId, entry: Entry) -> Result<()> {
        if self.entries.contains_key(&participant) {
            return Err(GameError::DuplicateGuess(participant));
        }

        self.registry.push(participant.clone());
        self.entries.insert(participant, entry);
        Ok(())
    }

    /// Undo the most recent `insert`, when its funds could not be collected.
    pub(crate) fn remove_latest(&mut self, participant: &AccountId) -> Option<Entry> {
        if self.registry.last() != Some(participant) {
            return None;
        }
        self.registry.pop();
        self.entries.remove(participant)
    }

    pub(crate) fn get_mut(&mut self, participant: &AccountId) -> Option<&mut Entry> {
        self.entries.get_mut(participant)
    }

    /// Drops every entry; returns how many were removed.
    pub(crate) fn clear(&mut self) -> usize {
        let removed = self.registry.len();
        self.registry.clear();
        self.entries.clear();
        removed
    }

    /// Total stake placed on `guess`, walking the registry.
    pub fn stake_on(&self, guess: u8) -> Result<Amount> {
        self.iter()
            .filter(|(_, entry)| entry.guess == guess)
            .try_fold(Amount::ZERO, |acc, (_, entry)| acc.checked_add(entry.stake))
            .ok_or(GameError::ArithmeticOverflow)
    }

    pub fn unclaimed_stake(&self) -> Result<Amount> {
        self.iter()
            .filter(|(_, entry)| !entry.claimed)
            .try_fold(Amount::ZERO, |acc, (_, entry)| acc.checked_add(entry.stake))
            .ok_or(GameError::ArithmeticOverflow)
    }
}
