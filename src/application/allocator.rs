//! Public order identifier allocation
//!
//! The allocator turns a creation timestamp into a `YYYYMMDD-XXXXXX`
//! identifier: the timestamp's calendar date in the configured partition
//! timezone, followed by the next sequence number of that date. Uniqueness
//! and ordering come entirely from the store's atomic increment.

use crate::application::retry::RetryPolicy;
use crate::domain::order_number::{DateKey, PartitionTimezone, PublicOrderId};
use crate::domain::sequence::{AllocationError, SequenceCounter, SequenceStore};
use crate::infrastructure::log_messages;
use crate::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, error, instrument, warn};

#[derive(Debug)]
pub struct OrderIdAllocator<S> {
    store: S,
    timezone: PartitionTimezone,
}

impl<S: SequenceStore> OrderIdAllocator<S> {
    pub fn new(store: S, timezone: PartitionTimezone) -> Self {
        Self { store, timezone }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn timezone(&self) -> PartitionTimezone {
        self.timezone
    }

    /// Partition an order created at `created_at` belongs to
    pub fn partition_for(&self, created_at: DateTime<Utc>) -> Result<DateKey> {
        Ok(DateKey::from_timestamp(created_at, self.timezone)?)
    }

    /// Issue the next identifier for an order created at `created_at`
    ///
    /// Every successful call returns an identifier no other call has
    /// returned, and within one partition a later call always returns a
    /// larger sequence number.
    #[instrument(skip(self))]
    pub async fn allocate(&self, created_at: DateTime<Utc>) -> Result<PublicOrderId> {
        let partition = self.partition_for(created_at)?;

        match self.store.next_sequence(partition).await {
            Ok(sequence) => {
                let public_id = PublicOrderId::new(partition, sequence);
                debug!(%public_id, "{}", log_messages::allocation::ALLOCATED);
                Ok(public_id)
            }
            Err(err) => {
                match &err {
                    AllocationError::SequenceExhausted { .. } => {
                        error!(%partition, "{}", log_messages::allocation::EXHAUSTED)
                    }
                    AllocationError::StorageUnavailable(reason) => {
                        error!(%partition, %reason, "{}", log_messages::allocation::STORE_UNAVAILABLE)
                    }
                    AllocationError::ContentionTimeout { .. } => {
                        warn!(%partition, "{}", log_messages::allocation::LOCK_TIMED_OUT)
                    }
                }
                Err(err.into())
            }
        }
    }

    /// `allocate`, repeated on contention as `policy` allows
    pub async fn allocate_with_retry(
        &self,
        created_at: DateTime<Utc>,
        policy: &RetryPolicy,
    ) -> Result<PublicOrderId> {
        policy.run(|| self.allocate(created_at)).await
    }

    /// Identifier issued most recently in `partition`, if any
    pub async fn last_issued(&self, partition: DateKey) -> Result<Option<PublicOrderId>> {
        let last = self.store.last_sequence(partition).await?;
        Ok(last.map(|sequence| PublicOrderId::new(partition, sequence)))
    }

    /// Every partition's counter, oldest first
    pub async fn counters(&self) -> Result<Vec<SequenceCounter>> {
        Ok(self.store.counters().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_number::SequenceNumber;
    use crate::infrastructure::memory::MemorySequenceStore;
    use crate::Error;
    use chrono::TimeZone;

    fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
            .unwrap()
    }

    fn allocator() -> OrderIdAllocator<MemorySequenceStore> {
        OrderIdAllocator::new(MemorySequenceStore::new(), PartitionTimezone::utc())
    }

    #[tokio::test]
    async fn first_order_of_the_day_gets_sequence_one() {
        let allocator = allocator();

        let id = allocator.allocate(at(2025, 7, 31, 9, 0)).await.unwrap();

        assert_eq!(id.to_string(), "20250731-000001");
    }

    #[tokio::test]
    async fn sequence_increments_within_a_day() {
        let allocator = allocator();

        let first = allocator.allocate(at(2025, 7, 31, 9, 0)).await.unwrap();
        let second = allocator.allocate(at(2025, 7, 31, 23, 59)).await.unwrap();

        assert_eq!(second.to_string(), "20250731-000002");
        assert!(first < second);
    }

    #[tokio::test]
    async fn each_day_starts_its_own_sequence() {
        let allocator = allocator();

        allocator.allocate(at(2025, 7, 31, 9, 0)).await.unwrap();
        allocator.allocate(at(2025, 7, 31, 10, 0)).await.unwrap();
        let next_day = allocator.allocate(at(2025, 8, 1, 0, 0)).await.unwrap();

        assert_eq!(next_day.to_string(), "20250801-000001");
    }

    #[tokio::test]
    async fn partition_uses_the_configured_timezone() {
        let tokyo = PartitionTimezone::from_offset_minutes(9 * 60).unwrap();
        let allocator = OrderIdAllocator::new(MemorySequenceStore::new(), tokyo);

        // 2025-07-31 20:00 UTC is already August 1st in UTC+09:00
        let id = allocator.allocate(at(2025, 7, 31, 20, 0)).await.unwrap();

        assert_eq!(id.to_string(), "20250801-000001");
    }

    #[tokio::test]
    async fn exhausted_partition_is_rejected_without_reuse() {
        let partition = DateKey::from_ymd(2025, 7, 31).unwrap();
        let store = MemorySequenceStore::new()
            .with_last_sequence(partition, SequenceNumber::try_new(999_998).unwrap());
        let allocator = OrderIdAllocator::new(store, PartitionTimezone::utc());

        let last = allocator.allocate(at(2025, 7, 31, 12, 0)).await.unwrap();
        assert_eq!(last.to_string(), "20250731-999999");

        let err = allocator.allocate(at(2025, 7, 31, 12, 1)).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Allocation(AllocationError::SequenceExhausted { .. })
        ));

        // Other days are unaffected
        let tomorrow = allocator.allocate(at(2025, 8, 1, 0, 0)).await.unwrap();
        assert_eq!(tomorrow.to_string(), "20250801-000001");
    }

    #[tokio::test]
    async fn last_issued_reports_the_counter() {
        let allocator = allocator();
        let partition = DateKey::from_ymd(2025, 7, 31).unwrap();

        assert_eq!(allocator.last_issued(partition).await.unwrap(), None);

        allocator.allocate(at(2025, 7, 31, 9, 0)).await.unwrap();
        allocator.allocate(at(2025, 7, 31, 9, 1)).await.unwrap();

        let last = allocator.last_issued(partition).await.unwrap().unwrap();
        assert_eq!(last.to_string(), "20250731-000002");

        let counters = allocator.counters().await.unwrap();
        assert_eq!(counters.len(), 1);
        assert_eq!(counters[0].last_sequence.value(), 2);
    }

    #[tokio::test]
    async fn allocate_with_retry_succeeds_on_an_uncontended_store() {
        let allocator = allocator();

        let id = allocator
            .allocate_with_retry(at(2025, 7, 31, 9, 0), &RetryPolicy::default())
            .await
            .unwrap();

        assert_eq!(id.sequence(), SequenceNumber::first());
    }
}
