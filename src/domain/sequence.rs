//! Per-day order sequence counters
//!
//! A counter exists for every date on which at least one order number was
//! issued. Counters only ever move forward and are never deleted, so the
//! counter table doubles as the audit trail of issued order numbers.

use crate::domain::order_number::{DateKey, SequenceNumber};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures of the atomic read-and-increment step
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    /// All 999999 numbers of the partition have been issued
    #[error("Order sequence exhausted for {partition}")]
    SequenceExhausted { partition: DateKey },

    /// The counter row could not be locked in time (lock timeout, deadlock)
    #[error("Timed out waiting for the order sequence counter of {partition}")]
    ContentionTimeout { partition: DateKey },

    /// The counter store could not be reached
    #[error("Order sequence store unavailable: {0}")]
    StorageUnavailable(String),
}

impl AllocationError {
    /// Whether the whole allocate-and-insert unit may be attempted again
    pub fn is_retryable(&self) -> bool {
        matches!(self, AllocationError::ContentionTimeout { .. })
    }
}

/// Audit view of one partition's counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceCounter {
    pub partition: DateKey,
    pub last_sequence: SequenceNumber,
}

/// Durable store of per-day counters
///
/// `next_sequence` must be a single atomic read-modify-write: concurrent
/// callers for the same partition never observe the same prior value, and
/// the first call for a partition creates its counter at 1 without racing
/// other first callers. Calls for different partitions must not contend.
#[async_trait]
pub trait SequenceStore: Send + Sync {
    /// Issue the next sequence number for `partition`
    async fn next_sequence(&self, partition: DateKey) -> Result<SequenceNumber, AllocationError>;

    /// Highest number issued so far, `None` if the partition was never used
    async fn last_sequence(
        &self,
        partition: DateKey,
    ) -> Result<Option<SequenceNumber>, AllocationError>;

    /// All counters, oldest partition first
    async fn counters(&self) -> Result<Vec<SequenceCounter>, AllocationError>;
}
