//! Single-round commit-reveal guessing game.
//!
//! The operator commits to a hidden value, participants stake on a guess in
//! `0..=255` before the guess deadline, the operator reveals, and correct
//! guesses split the pot pro-rata by stake. If the reveal never comes,
//! every participant can take their stake back.

pub mod commitment;
pub mod error;
pub mod events;
pub mod game;
pub mod ledger;
pub mod round;
pub mod settlement;

pub use commitment::{
    verify_and_derive_target, Commitment, CommitmentScheme, Reveal, Sha256Commitment,
};
pub use error::{GameError, Result};
pub use events::GameEvent;
pub use game::BettingGame;
pub use ledger::{Entry, ParticipantLedger};
pub use round::{Phase, Round, RoundInfo, RoundParams};
pub use settlement::{pro_rata_share, Payout, PayoutKind};
