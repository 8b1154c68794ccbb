//! In-process implementations of the storage ports
//!
//! Used for tests, benchmarks and single-process deployments. Nothing here is
//! durable across restarts.

use crate::domain::identifiers::{OrderId, UserId};
use crate::domain::order::{Order, OrderDraft, OrderStatus};
use crate::domain::order_number::{DateKey, PublicOrderId, SequenceNumber};
use crate::domain::repository::{OrderStore, StoreError};
use crate::domain::sequence::{AllocationError, SequenceCounter, SequenceStore};
use crate::domain::validation_constants::order_number::MAX_SEQUENCE;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Per-day counters held in memory
///
/// The map lock is only taken to find or create a partition's counter; the
/// increment itself is a compare-and-swap on that partition's atomic, so
/// allocations for different days never wait on each other.
#[derive(Debug, Default)]
pub struct MemorySequenceStore {
    partitions: RwLock<HashMap<DateKey, Arc<AtomicU32>>>,
}

impl MemorySequenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a partition at a known last sequence, e.g. after an import
    pub fn with_last_sequence(self, partition: DateKey, last: SequenceNumber) -> Self {
        self.partitions
            .write()
            .insert(partition, Arc::new(AtomicU32::new(last.value())));
        self
    }

    fn counter(&self, partition: DateKey) -> Arc<AtomicU32> {
        if let Some(counter) = self.partitions.read().get(&partition) {
            return Arc::clone(counter);
        }
        let mut partitions = self.partitions.write();
        Arc::clone(
            partitions
                .entry(partition)
                .or_insert_with(|| Arc::new(AtomicU32::new(0))),
        )
    }

    fn increment(&self, partition: DateKey) -> Result<SequenceNumber, AllocationError> {
        let counter = self.counter(partition);
        let previous = counter
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                (last < MAX_SEQUENCE).then_some(last + 1)
            })
            .map_err(|_| AllocationError::SequenceExhausted { partition })?;

        SequenceNumber::try_new(previous + 1)
            .map_err(|_| AllocationError::SequenceExhausted { partition })
    }
}

#[async_trait]
impl SequenceStore for MemorySequenceStore {
    async fn next_sequence(&self, partition: DateKey) -> Result<SequenceNumber, AllocationError> {
        self.increment(partition)
    }

    async fn last_sequence(
        &self,
        partition: DateKey,
    ) -> Result<Option<SequenceNumber>, AllocationError> {
        let last = self
            .partitions
            .read()
            .get(&partition)
            .map(|counter| counter.load(Ordering::Acquire));
        Ok(last.and_then(|value| SequenceNumber::try_new(value).ok()))
    }

    async fn counters(&self) -> Result<Vec<SequenceCounter>, AllocationError> {
        let mut counters: Vec<SequenceCounter> = self
            .partitions
            .read()
            .iter()
            .filter_map(|(partition, counter)| {
                SequenceNumber::try_new(counter.load(Ordering::Acquire))
                    .ok()
                    .map(|last_sequence| SequenceCounter {
                        partition: *partition,
                        last_sequence,
                    })
            })
            .collect();
        counters.sort_by_key(|counter| counter.partition);
        Ok(counters)
    }
}

/// Orders held in memory, keyed by public identifier
#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    sequences: MemorySequenceStore,
    orders: RwLock<BTreeMap<PublicOrderId, Order>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sequences(sequences: MemorySequenceStore) -> Self {
        Self {
            sequences,
            orders: RwLock::default(),
        }
    }

    pub fn sequences(&self) -> &MemorySequenceStore {
        &self.sequences
    }

    fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.public_id.cmp(&a.public_id))
        });
        orders
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    #[instrument(skip(self, draft), fields(user_id = %draft.user_id))]
    async fn insert_order(
        &self,
        partition: DateKey,
        draft: OrderDraft,
    ) -> Result<Order, StoreError> {
        let sequence = self.sequences.increment(partition)?;
        let public_id = PublicOrderId::new(partition, sequence);
        let order = draft.into_order(OrderId::generate(), public_id);

        let mut orders = self.orders.write();
        if orders.contains_key(&public_id) {
            return Err(StoreError::Storage(format!(
                "duplicate order number {public_id}"
            )));
        }
        orders.insert(public_id, order.clone());
        debug!(%public_id, "order stored");

        Ok(order)
    }

    async fn find_order(&self, public_id: PublicOrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.read().get(&public_id).cloned())
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, StoreError> {
        let orders = self
            .orders
            .read()
            .values()
            .filter(|order| order.belongs_to(user_id))
            .cloned()
            .collect();
        Ok(Self::newest_first(orders))
    }

    async fn all_orders(&self) -> Result<Vec<Order>, StoreError> {
        let orders = self.orders.read().values().cloned().collect();
        Ok(Self::newest_first(orders))
    }

    async fn transition_status(
        &self,
        public_id: PublicOrderId,
        expected: OrderStatus,
        next: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<Order, StoreError> {
        let mut orders = self.orders.write();
        let order = orders
            .get_mut(&public_id)
            .ok_or(StoreError::NotFound(public_id))?;

        if order.status != expected {
            return Err(StoreError::StaleStatus {
                public_id,
                expected,
            });
        }
        order.status = next;
        order.updated_at = at;

        Ok(order.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cart::{Cart, ProductSnapshot};
    use crate::domain::types::{Price, ProductName, Quantity};
    use rust_decimal::Decimal;

    fn day(d: u32) -> DateKey {
        DateKey::from_ymd(2025, 7, d).unwrap()
    }

    fn draft(user_id: UserId) -> OrderDraft {
        let mut cart = Cart::new(user_id);
        cart.add_product(
            ProductSnapshot::new(
                ProductName::try_new("Tea".to_string()).unwrap(),
                Price::try_new(Decimal::new(500, 2)).unwrap(),
            ),
            Quantity::one(),
        )
        .unwrap();
        OrderDraft::from_cart(&cart, Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn first_allocation_of_a_day_is_one() {
        let store = MemorySequenceStore::new();
        assert_eq!(store.last_sequence(day(31)).await.unwrap(), None);

        assert_eq!(store.next_sequence(day(31)).await.unwrap().value(), 1);
        assert_eq!(store.next_sequence(day(31)).await.unwrap().value(), 2);
        assert_eq!(
            store.last_sequence(day(31)).await.unwrap().map(|s| s.value()),
            Some(2)
        );
    }

    #[tokio::test]
    async fn partitions_count_independently() {
        let store = MemorySequenceStore::new();
        store.next_sequence(day(30)).await.unwrap();
        store.next_sequence(day(30)).await.unwrap();

        assert_eq!(store.next_sequence(day(31)).await.unwrap().value(), 1);
        assert_eq!(store.next_sequence(day(30)).await.unwrap().value(), 3);
    }

    #[tokio::test]
    async fn exhausted_partition_stays_exhausted() {
        let store =
            MemorySequenceStore::new().with_last_sequence(day(31), SequenceNumber::last());

        for _ in 0..3 {
            assert_eq!(
                store.next_sequence(day(31)).await,
                Err(AllocationError::SequenceExhausted { partition: day(31) })
            );
        }
        assert_eq!(
            store.last_sequence(day(31)).await.unwrap(),
            Some(SequenceNumber::last())
        );
    }

    #[tokio::test]
    async fn counters_are_listed_oldest_first() {
        let store = MemorySequenceStore::new();
        store.next_sequence(day(31)).await.unwrap();
        store.next_sequence(day(29)).await.unwrap();
        store.next_sequence(day(29)).await.unwrap();

        let counters = store.counters().await.unwrap();
        let summary: Vec<_> = counters
            .iter()
            .map(|c| (c.partition, c.last_sequence.value()))
            .collect();
        assert_eq!(summary, vec![(day(29), 2), (day(31), 1)]);
    }

    #[tokio::test]
    async fn inserted_orders_get_sequential_public_ids() {
        let store = MemoryOrderStore::new();
        let user = UserId::generate();

        let first = store.insert_order(day(31), draft(user)).await.unwrap();
        let second = store.insert_order(day(31), draft(user)).await.unwrap();

        assert_eq!(first.public_id.to_string(), "20250731-000001");
        assert_eq!(second.public_id.to_string(), "20250731-000002");
        assert_eq!(
            store.find_order(first.public_id).await.unwrap(),
            Some(first)
        );
    }

    #[tokio::test]
    async fn insert_fails_cleanly_when_exhausted() {
        let sequences =
            MemorySequenceStore::new().with_last_sequence(day(31), SequenceNumber::last());
        let store = MemoryOrderStore::with_sequences(sequences);

        let err = store
            .insert_order(day(31), draft(UserId::generate()))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            StoreError::Allocation(AllocationError::SequenceExhausted { partition: day(31) })
        );
        assert!(store.all_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn status_transition_is_compare_and_set() {
        let store = MemoryOrderStore::new();
        let order = store
            .insert_order(day(31), draft(UserId::generate()))
            .await
            .unwrap();
        let later = order.created_at + chrono::Duration::minutes(5);

        let updated = store
            .transition_status(order.public_id, OrderStatus::New, OrderStatus::Pending, later)
            .await
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Pending);
        assert_eq!(updated.updated_at, later);

        let stale = store
            .transition_status(order.public_id, OrderStatus::New, OrderStatus::Cancelled, later)
            .await;
        assert_eq!(
            stale,
            Err(StoreError::StaleStatus {
                public_id: order.public_id,
                expected: OrderStatus::New
            })
        );
    }

    #[tokio::test]
    async fn user_listing_is_newest_first_and_scoped() {
        let store = MemoryOrderStore::new();
        let alice = UserId::generate();
        let bob = UserId::generate();

        let a1 = store.insert_order(day(30), draft(alice)).await.unwrap();
        store.insert_order(day(30), draft(bob)).await.unwrap();
        let a2 = store.insert_order(day(31), draft(alice)).await.unwrap();

        let listed: Vec<_> = store
            .orders_for_user(alice)
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.public_id)
            .collect();
        assert_eq!(listed, vec![a2.public_id, a1.public_id]);
        assert_eq!(store.all_orders().await.unwrap().len(), 3);
    }
}
