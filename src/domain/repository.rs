//! Order persistence port

use crate::domain::identifiers::UserId;
use crate::domain::order::{Order, OrderDraft, OrderStatus};
use crate::domain::order_number::{DateKey, PublicOrderId};
use crate::domain::sequence::AllocationError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors from an order store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error("Order not found: {0}")]
    NotFound(PublicOrderId),

    /// The order's status changed between read and write
    #[error("Order {public_id} is no longer in status '{expected}'")]
    StaleStatus {
        public_id: PublicOrderId,
        expected: OrderStatus,
    },

    #[error("Order storage error: {0}")]
    Storage(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Allocation(err) => err.is_retryable(),
            _ => false,
        }
    }
}

/// Durable order storage
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Allocate the next public identifier in `partition` and persist the
    /// order, as one atomic unit
    ///
    /// If this returns an error no order was stored, and no number returned
    /// to any caller is ever issued again.
    async fn insert_order(&self, partition: DateKey, draft: OrderDraft)
        -> Result<Order, StoreError>;

    async fn find_order(&self, public_id: PublicOrderId) -> Result<Option<Order>, StoreError>;

    /// Orders of one customer, newest first
    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, StoreError>;

    /// Every order, newest first
    async fn all_orders(&self) -> Result<Vec<Order>, StoreError>;

    /// Move an order from `expected` to `next` if it is still in `expected`
    async fn transition_status(
        &self,
        public_id: PublicOrderId,
        expected: OrderStatus,
        next: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<Order, StoreError>;
}
