use crate::{GameError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const COMMITMENT_LEN: usize = 32;

/// Trait for commitment schemes binding an operator to a secret
pub trait CommitmentScheme {
    fn commit(secret: &[u8], salt: u64) -> Commitment;

    fn verify(commitment: &Commitment, secret: &[u8], salt: u64) -> bool {
        Self::commit(secret, salt) == *commitment
    }

    /// Target value judged against every guess, mixing in reveal-time entropy.
    fn derive_target(secret: &[u8], salt: u64, extra_entropy: &[u8]) -> u8;
}

/// Published hash of `secret || salt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commitment(#[serde(with = "hex::serde")] [u8; COMMITMENT_LEN]);

impl Commitment {
    pub fn from_bytes(bytes: [u8; COMMITMENT_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; COMMITMENT_LEN] {
        &self.0
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for Commitment {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let s = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; COMMITMENT_LEN];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| GameError::InvalidCommitment(format!("{}: {}", s, e)))?;
        Ok(Self(bytes))
    }
}

/// A revealed secret together with its salt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reveal {
    #[serde(with = "hex::serde")]
    pub secret: Vec<u8>,
    pub salt: u64,
}

impl Reveal {
    pub fn new(secret: impl Into<Vec<u8>>, salt: u64) -> Self {
        Self {
            secret: secret.into(),
            salt,
        }
    }
}
