use crate::commitment::Commitment;
use commitpot_core::{AccountId, Amount, Timestamp};
use serde::{Deserialize, Serialize};

/// Published after a state transition commits, for off-core observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameEvent {
    Committed {
        commitment: Commitment,
        guess_deadline: Timestamp,
        reveal_deadline: Timestamp,
        min_stake: Amount,
    },
    GuessPlaced {
        participant: AccountId,
        guess: u8,
        stake: Amount,
    },
    Revealed {
        #[serde(with = "hex::serde")]
        secret: Vec<u8>,
        salt: u64,
        target_value: u8,
    },
    /// Zero amount for a losing guess.
    PrizeClaimed {
        participant: AccountId,
        amount: Amount,
    },
    Refund {
        participant: AccountId,
        amount: Amount,
    },
    RoundReset {
        cleared_entries: usize,
    },
    OwnerWithdrawal {
        amount: Amount,
    },
}

impl GameEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            GameEvent::Committed { .. } => "Committed",
            GameEvent::GuessPlaced { .. } => "GuessPlaced",
            GameEvent::Revealed { .. } => "Revealed",
            GameEvent::PrizeClaimed { .. } => "PrizeClaimed",
            GameEvent::Refund { .. } => "Refund",
            GameEvent::RoundReset { .. } => "RoundReset",
            GameEvent::OwnerWithdrawal { .. } => "OwnerWithdrawal",
        }
    }
}
