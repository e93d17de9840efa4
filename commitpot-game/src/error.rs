use commitpot_core::AccountId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GameError>;

/// Every failure is scoped to one call and leaves the round unchanged.
#[derive(Error, Debug)]
pub enum GameError {
    #[error("Caller is not the round operator")]
    NotOperator,

    #[error("Round already committed")]
    AlreadyCommitted,

    #[error("Round not committed")]
    NotCommitted,

    #[error("Round already revealed")]
    AlreadyRevealed,

    #[error("Round not revealed yet")]
    NotRevealed,

    #[error("Round is not eligible for refunds")]
    RefundNotEligible,

    #[error("Guess window closed")]
    GuessWindowClosed,

    #[error("Reveal window closed")]
    RevealWindowClosed,

    #[error("Reveal deadline has not passed")]
    RevealDeadlineNotPassed,

    #[error("Guess and reveal periods must be positive")]
    InvalidPeriod,

    #[error("Stake too low: {stake} sats, minimum {min_stake} sats")]
    StakeTooLow { stake: u64, min_stake: u64 },

    #[error("Participant {0} already placed a guess")]
    DuplicateGuess(AccountId),

    #[error("Account {0} is the pot account and cannot take part in the round")]
    PotAccount(AccountId),

    #[error("No entry for participant {0}")]
    NoEntry(AccountId),

    #[error("Participant {0} already claimed")]
    AlreadyClaimed(AccountId),

    #[error("Revealed secret does not match commitment")]
    SecretMismatch,

    #[error("Invalid commitment: {0}")]
    InvalidCommitment(String),

    #[error("No winning stake to split the pot")]
    NoWinners,

    #[error("Insufficient balance: need {need} sats, have {available} sats")]
    InsufficientBalance { need: u64, available: u64 },

    #[error("Arithmetic overflow in pot accounting")]
    ArithmeticOverflow,

    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    #[error("Core error: {0}")]
    Core(#[from] commitpot_core::CoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GameError {
    pub fn transfer_failed(msg: impl Into<String>) -> Self {
        Self::TransferFailed(msg.into())
    }
}
