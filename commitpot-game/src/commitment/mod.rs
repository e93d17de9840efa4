pub mod scheme;

pub use scheme::{Commitment, CommitmentScheme, Reveal, COMMITMENT_LEN};

use crate::{GameError, Result};
use sha2::{Digest, Sha256};

/// SHA-256 over `secret || salt (8 bytes, big-endian)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Commitment;

impl Sha256Commitment {
    fn preimage_hasher(secret: &[u8], salt: u64) -> Sha256 {
        let mut hasher = Sha256::new();
        hasher.update(secret);
        hasher.update(salt.to_be_bytes());
        hasher
    }
}

impl CommitmentScheme for Sha256Commitment {
    fn commit(secret: &[u8], salt: u64) -> Commitment {
        let digest = Self::preimage_hasher(secret, salt).finalize();
        let mut bytes = [0u8; COMMITMENT_LEN];
        bytes.copy_from_slice(&digest);
        Commitment::from_bytes(bytes)
    }

    fn derive_target(secret: &[u8], salt: u64, extra_entropy: &[u8]) -> u8 {
        let mut hasher = Self::preimage_hasher(secret, salt);
        hasher.update(extra_entropy);
        let digest = hasher.finalize();
        // lowest-order byte of the big-endian digest
        digest[COMMITMENT_LEN - 1]
    }
}

/// Checks a reveal against the stored commitment and derives the target value.
/// Pure: no round state is touched here.
pub fn verify_and_derive_target(
    reveal: &Reveal,
    commitment: &Commitment,
    extra_entropy: &[u8],
) -> Result<u8> {
    if !Sha256Commitment::verify(commitment, &reveal.secret, reveal.salt) {
        return Err(GameError::SecretMismatch);
    }

    Ok(Sha256Commitment::derive_target(
        &reveal.secret,
        reveal.salt,
        extra_entropy,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commitment_binds_secret_and_salt() {
        let commitment = Sha256Commitment::commit(b"7", 42);

        assert!(Sha256Commitment::verify(&commitment, b"7", 42));
        assert!(!Sha256Commitment::verify(&commitment, b"7", 43));
        assert!(!Sha256Commitment::verify(&commitment, b"8", 42));
    }

    #[test]
    fn test_verify_and_derive_target() {
        let commitment = Sha256Commitment::commit(b"7", 42);
        let reveal = Reveal::new("7", 42);

        let target = verify_and_derive_target(&reveal, &commitment, &9u64.to_be_bytes()).unwrap();
        assert_eq!(
            target,
            Sha256Commitment::derive_target(b"7", 42, &9u64.to_be_bytes())
        );

        let wrong = Reveal::new("7", 41);
        assert!(matches!(
            verify_and_derive_target(&wrong, &commitment, &[]),
            Err(GameError::SecretMismatch)
        ));
    }

    #[test]
    fn test_target_depends_on_entropy() {
        let targets: std::collections::HashSet<u8> = (0u64..64)
            .map(|height| Sha256Commitment::derive_target(b"secret", 1, &height.to_be_bytes()))
            .collect();
        assert!(targets.len() > 1);
    }

    #[test]
    fn test_commitment_hex_round_trip() {
        let commitment = Sha256Commitment::commit(b"7", 42);
        let text = commitment.to_string();
        assert_eq!(text.len(), 64);
        assert_eq!(text.parse::<Commitment>().unwrap(), commitment);
        assert_eq!(format!("0x{}", text).parse::<Commitment>().unwrap(), commitment);
        assert!("abcd".parse::<Commitment>().is_err());
    }
}
