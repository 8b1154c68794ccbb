//! Shopping cart
//!
//! The cart is owned by the catalog side of the system; orders are created
//! from it. Products are carried as snapshots so that the order workflow can
//! check availability and take a price without reaching back into the catalog.

use crate::domain::identifiers::{ProductId, UserId};
use crate::domain::types::{Price, ProductName, Quantity};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Publication state of a catalog product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    #[default]
    Available,
    OutOfStock,
    Draft,
}

/// The parts of a catalog product that ordering depends on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: ProductName,
    pub price: Price,
    pub discount_price: Option<Price>,
    pub status: ProductStatus,
}

impl ProductSnapshot {
    pub fn new(name: ProductName, price: Price) -> Self {
        Self {
            id: ProductId::generate(),
            name,
            price,
            discount_price: None,
            status: ProductStatus::Available,
        }
    }

    pub fn with_discount(mut self, discount_price: Price) -> Self {
        self.discount_price = Some(discount_price);
        self
    }

    pub fn with_status(mut self, status: ProductStatus) -> Self {
        self.status = status;
        self
    }

    /// Price a customer pays per unit
    ///
    /// A zero discount price counts as "no discount".
    pub fn final_price(&self) -> Price {
        match self.discount_price {
            Some(discount) if !discount.is_zero() => discount,
            _ => self.price,
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == ProductStatus::Available
    }
}

/// Errors raised while editing a cart
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("Quantity limit exceeded for product {product}")]
    QuantityLimitExceeded { product: ProductId },
}

/// One product line in a cart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: ProductSnapshot,
    pub quantity: Quantity,
}

impl CartItem {
    pub fn unit_price(&self) -> Price {
        self.product.final_price()
    }

    /// Line total, `None` on overflow
    pub fn total_price(&self) -> Option<Decimal> {
        self.unit_price().times(self.quantity)
    }
}

/// A customer's cart; at most one line per product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            created_at: Utc::now(),
            items: Vec::new(),
        }
    }

    /// Add a product, merging with an existing line for the same product
    pub fn add_product(
        &mut self,
        product: ProductSnapshot,
        quantity: Quantity,
    ) -> Result<(), CartError> {
        match self.items.iter_mut().find(|item| item.product.id == product.id) {
            Some(existing) => {
                existing.quantity = existing.quantity.checked_add(quantity).ok_or(
                    CartError::QuantityLimitExceeded {
                        product: product.id,
                    },
                )?;
                existing.product = product;
            }
            None => self.items.push(CartItem { product, quantity }),
        }
        Ok(())
    }

    /// Remove a product line; returns whether anything was removed
    pub fn remove_product(&mut self, product_id: ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.product.id != product_id);
        self.items.len() != before
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of the line totals, `None` on overflow
    pub fn total_price(&self) -> Option<Decimal> {
        self.items
            .iter()
            .try_fold(Decimal::ZERO, |total, item| total.checked_add(item.total_price()?))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
