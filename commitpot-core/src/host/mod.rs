//! Services the hosting environment supplies to a round: a monotonic clock
//! and an entropy source that only becomes known at reveal time.

pub mod clock;
pub mod entropy;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entropy::{EntropySource, LedgerHeightEntropy, SequenceEntropy};
