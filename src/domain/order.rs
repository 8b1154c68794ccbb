//! Orders and their lifecycle
//!
//! An order is created from a cart. Item prices are copied onto the order at
//! creation so later catalog price changes never alter what was charged.

use crate::domain::cart::Cart;
use crate::domain::identifiers::{OrderId, ProductId, UserId};
use crate::domain::order_number::PublicOrderId;
use crate::domain::types::{Price, ProductName, Quantity};
use crate::domain::validation_constants::{catalog, storage};
use chrono::{DateTime, SubsecRound, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Business rule violations in the order lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderRejection {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Product '{product}' is not available")]
    ProductUnavailable { product: ProductName },

    #[error("Order status cannot change from '{from}' to '{to}'")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Order total exceeds the largest amount an order can carry")]
    TotalOutOfRange,
}

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    New,
    Pending,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::New,
        OrderStatus::Pending,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "new",
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Human readable label for listings
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::New => "New",
            OrderStatus::Pending => "In progress",
            OrderStatus::Completed => "Completed",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::New, OrderStatus::Pending)
                | (OrderStatus::New, OrderStatus::Cancelled)
                | (OrderStatus::Pending, OrderStatus::Completed)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    pub fn transition_to(&self, next: OrderStatus) -> Result<OrderStatus, OrderRejection> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(OrderRejection::InvalidTransition {
                from: *self,
                to: next,
            })
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(OrderStatus::New),
            "pending" => Ok(OrderStatus::Pending),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            _ => Err(format!("Invalid order status: {s}")),
        }
    }
}

/// A product line on an order, priced at creation time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub product_name: ProductName,
    pub quantity: Quantity,
    pub item_price: Price,
}

impl OrderItem {
    /// Line total, `None` on overflow
    pub fn total(&self) -> Option<Decimal> {
        self.item_price.times(self.quantity)
    }
}

/// An order that has not been persisted yet and has no identifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub user_id: UserId,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub order_price: Decimal,
    pub created_at: DateTime<Utc>,
}

impl OrderDraft {
    /// Snapshot a cart into a draft order
    ///
    /// Every product must be available; prices are taken from the product's
    /// final price at this moment. `created_at` is cut to microseconds, the
    /// precision orders are stored with.
    pub fn from_cart(cart: &Cart, created_at: DateTime<Utc>) -> Result<Self, OrderRejection> {
        if cart.is_empty() {
            return Err(OrderRejection::EmptyCart);
        }

        let items = cart
            .items()
            .iter()
            .map(|line| {
                if !line.product.is_available() {
                    return Err(OrderRejection::ProductUnavailable {
                        product: line.product.name.clone(),
                    });
                }
                Ok(OrderItem {
                    product_id: line.product.id,
                    product_name: line.product.name.clone(),
                    quantity: line.quantity,
                    item_price: line.unit_price(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let order_price = sum_lines(&items)
            .filter(|total| *total < Decimal::new(catalog::MAX_ORDER_TOTAL_EXCLUSIVE, 0))
            .ok_or(OrderRejection::TotalOutOfRange)?;

        Ok(Self {
            user_id: cart.user_id,
            status: OrderStatus::New,
            items,
            order_price,
            created_at: created_at.trunc_subsecs(storage::TIMESTAMP_SUBSEC_DIGITS),
        })
    }

    /// Attach the identifiers assigned by the store
    pub fn into_order(self, id: OrderId, public_id: PublicOrderId) -> Order {
        Order {
            id,
            public_id,
            user_id: self.user_id,
            status: self.status,
            items: self.items,
            order_price: self.order_price,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

fn sum_lines(items: &[OrderItem]) -> Option<Decimal> {
    items
        .iter()
        .try_fold(Decimal::ZERO, |total, item| total.checked_add(item.total()?))
}

/// A persisted order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub public_id: PublicOrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    /// Total charged, fixed at creation
    pub order_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Sum of the item lines, `None` on overflow
    pub fn total_price(&self) -> Option<Decimal> {
        sum_lines(&self.items)
    }

    pub fn items_count(&self) -> usize {
        self.items.len()
    }

    pub fn belongs_to(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }
}
