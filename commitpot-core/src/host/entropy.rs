use crate::error::Result;
use crate::storage::Storage;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Value supplied by the host at reveal time and unknown at commit time.
#[async_trait]
pub trait EntropySource: Send + Sync {
    async fn entropy(&self) -> Result<Vec<u8>>;
}

/// In-memory sequence counter, bumped on every read.
#[derive(Debug, Default)]
pub struct SequenceEntropy {
    next: AtomicU64,
}

impl SequenceEntropy {
    pub fn new(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }
}

#[async_trait]
impl EntropySource for SequenceEntropy {
    async fn entropy(&self) -> Result<Vec<u8>> {
        let value = self.next.fetch_add(1, Ordering::SeqCst);
        Ok(value.to_be_bytes().to_vec())
    }
}

/// Height of the SQLite ledger (recorded transfers plus events). Every
/// registration moves the height, so it plays the part of a block height.
pub struct LedgerHeightEntropy {
    storage: Arc<Storage>,
}

impl LedgerHeightEntropy {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl EntropySource for LedgerHeightEntropy {
    async fn entropy(&self) -> Result<Vec<u8>> {
        let height = self.storage.height().await?;
        tracing::debug!("Ledger height entropy: {}", height);
        Ok(height.to_be_bytes().to_vec())
    }
}
