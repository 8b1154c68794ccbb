//! Order placement and lifecycle operations
//!
//! The service assigns each new order its public number inside the same unit
//! of work that stores the order, retrying the whole unit when the day's
//! counter is contended.

use crate::application::retry::RetryPolicy;
use crate::domain::cart::Cart;
use crate::domain::identifiers::UserId;
use crate::domain::order::{Order, OrderDraft, OrderRejection, OrderStatus};
use crate::domain::order_number::{DateKey, OrderNumberError, PartitionTimezone, PublicOrderId};
use crate::domain::repository::{OrderStore, StoreError};
use crate::domain::statistics::{AdminStatistics, OrderStatistics};
use crate::domain::types::ProductName;
use crate::domain::validation_constants::storage;
use crate::infrastructure::log_messages;
use chrono::{DateTime, SubsecRound, Utc};
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Times a status change is re-validated after losing a race
const STATUS_UPDATE_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("Cannot place an order from an empty cart")]
    EmptyCart,

    #[error("Product '{product}' is not available")]
    ProductUnavailable { product: ProductName },

    #[error("Order total exceeds the largest amount an order can carry")]
    TotalOutOfRange,

    #[error("Order not found: {0}")]
    NotFound(PublicOrderId),

    #[error("Order {public_id} cannot change from '{from}' to '{to}'")]
    InvalidTransition {
        public_id: PublicOrderId,
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("Order timestamp has no valid partition: {0}")]
    InvalidTimestamp(#[from] OrderNumberError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl OrderError {
    fn rejected(rejection: OrderRejection, public_id: Option<PublicOrderId>) -> Self {
        match (rejection, public_id) {
            (OrderRejection::EmptyCart, _) => OrderError::EmptyCart,
            (OrderRejection::TotalOutOfRange, _) => OrderError::TotalOutOfRange,
            (OrderRejection::ProductUnavailable { product }, _) => {
                OrderError::ProductUnavailable { product }
            }
            (OrderRejection::InvalidTransition { from, to }, Some(public_id)) => {
                OrderError::InvalidTransition {
                    public_id,
                    from,
                    to,
                }
            }
            (OrderRejection::InvalidTransition { from, to }, None) => OrderError::Store(
                StoreError::Storage(format!("unexpected transition {from} -> {to}")),
            ),
        }
    }
}

pub struct OrderService<O> {
    store: O,
    timezone: PartitionTimezone,
    retry: RetryPolicy,
}

impl<O: OrderStore> OrderService<O> {
    pub fn new(store: O, timezone: PartitionTimezone, retry: RetryPolicy) -> Self {
        Self {
            store,
            timezone,
            retry,
        }
    }

    pub fn store(&self) -> &O {
        &self.store
    }

    pub fn timezone(&self) -> PartitionTimezone {
        self.timezone
    }

    /// Turn the cart into an order and empty the cart
    ///
    /// The cart is left untouched when placing fails.
    #[instrument(skip(self, cart), fields(user_id = %cart.user_id))]
    pub async fn place_order(
        &self,
        cart: &mut Cart,
        now: DateTime<Utc>,
    ) -> Result<Order, OrderError> {
        let draft = OrderDraft::from_cart(cart, now).map_err(|rejection| {
            warn!(reason = %rejection, "{}", log_messages::orders::REJECTED);
            OrderError::rejected(rejection, None)
        })?;
        let partition = DateKey::from_timestamp(draft.created_at, self.timezone)?;

        let order = self
            .retry
            .run(|| self.store.insert_order(partition, draft.clone()))
            .await?;

        cart.clear();
        info!(
            public_id = %order.public_id,
            total = %order.order_price,
            items = order.items_count(),
            "{}",
            log_messages::orders::PLACED
        );
        Ok(order)
    }

    /// Customer confirmation of a new order, moving it to pending
    pub async fn confirm_order(
        &self,
        user_id: UserId,
        public_id: PublicOrderId,
        now: DateTime<Utc>,
    ) -> Result<Order, OrderError> {
        let order = self.order_for_user(user_id, public_id).await?;
        if order.status != OrderStatus::New {
            return Err(OrderError::InvalidTransition {
                public_id,
                from: order.status,
                to: OrderStatus::Pending,
            });
        }

        let order = self
            .change_status(order, OrderStatus::Pending, now)
            .await?;
        info!(%public_id, "{}", log_messages::orders::CONFIRMED);
        Ok(order)
    }

    /// Administrative status change
    pub async fn update_status(
        &self,
        public_id: PublicOrderId,
        next: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<Order, OrderError> {
        let order = self.order(public_id).await?;
        self.change_status(order, next, now).await
    }

    async fn change_status(
        &self,
        mut order: Order,
        next: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<Order, OrderError> {
        let public_id = order.public_id;
        let now = now.trunc_subsecs(storage::TIMESTAMP_SUBSEC_DIGITS);
        for _ in 0..STATUS_UPDATE_ATTEMPTS {
            let from = order.status;
            from.transition_to(next)
                .map_err(|rejection| OrderError::rejected(rejection, Some(public_id)))?;

            match self
                .store
                .transition_status(public_id, from, next, now)
                .await
            {
                Ok(updated) => {
                    info!(%public_id, %from, to = %next, "{}", log_messages::orders::STATUS_CHANGED);
                    return Ok(updated);
                }
                Err(StoreError::StaleStatus { .. }) => {
                    order = self.order(public_id).await?;
                }
                Err(StoreError::NotFound(id)) => return Err(OrderError::NotFound(id)),
                Err(err) => return Err(err.into()),
            }
        }

        Err(StoreError::StaleStatus {
            public_id,
            expected: order.status,
        }
        .into())
    }

    pub async fn order(&self, public_id: PublicOrderId) -> Result<Order, OrderError> {
        self.store
            .find_order(public_id)
            .await?
            .ok_or(OrderError::NotFound(public_id))
    }

    /// An order as seen by its owner; other customers' orders are not found
    pub async fn order_for_user(
        &self,
        user_id: UserId,
        public_id: PublicOrderId,
    ) -> Result<Order, OrderError> {
        let order = self.order(public_id).await?;
        if !order.belongs_to(user_id) {
            return Err(OrderError::NotFound(public_id));
        }
        Ok(order)
    }

    pub async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, OrderError> {
        Ok(self.store.orders_for_user(user_id).await?)
    }

    pub async fn all_orders(&self) -> Result<Vec<Order>, OrderError> {
        Ok(self.store.all_orders().await?)
    }

    pub async fn user_statistics(&self, user_id: UserId) -> Result<OrderStatistics, OrderError> {
        let orders = self.orders_for_user(user_id).await?;
        Ok(OrderStatistics::from_orders(&orders))
    }

    pub async fn admin_statistics(&self) -> Result<AdminStatistics, OrderError> {
        let orders = self.all_orders().await?;
        Ok(AdminStatistics::from_orders(&orders))
    }
}
