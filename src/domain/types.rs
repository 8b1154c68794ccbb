//! Value types for catalog and order data
//!
//! Newtypes for money, quantities and names so that a negative price or an
//! empty order line cannot be constructed in the first place.

use crate::domain::validation_constants::catalog;
use nutype::nutype;
use rust_decimal::Decimal;

/// Monetary amount in the shop currency
///
/// Never negative, at most two decimal places and below 10^8, which is what
/// the order tables store without rounding.
#[nutype(
    validate(predicate = |amount| {
        !amount.is_sign_negative()
            && amount.round_dp(catalog::PRICE_DECIMAL_PLACES) == *amount
            && *amount < Decimal::new(catalog::MAX_PRICE_EXCLUSIVE, 0)
    }),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Serialize,
        Deserialize,
        AsRef,
        Display
    )
)]
pub struct Price(Decimal);

impl Price {
    pub fn zero() -> Self {
        Self::try_new(Decimal::ZERO).expect("Zero is a valid price")
    }

    pub fn amount(&self) -> Decimal {
        self.into_inner()
    }

    pub fn is_zero(&self) -> bool {
        self.into_inner().is_zero()
    }

    /// Price of `quantity` units, `None` on overflow
    pub fn times(&self, quantity: Quantity) -> Option<Decimal> {
        self.into_inner()
            .checked_mul(Decimal::from(quantity.into_inner()))
    }
}

/// Number of units of one product on a cart or order line
#[nutype(
    validate(predicate = |n| *n >= 1 && *n <= catalog::MAX_LINE_QUANTITY),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Serialize,
        Deserialize,
        AsRef,
        Display
    )
)]
pub struct Quantity(u32);

impl Quantity {
    pub fn one() -> Self {
        Self::try_new(1).expect("One is a valid quantity")
    }

    pub fn value(&self) -> u32 {
        self.into_inner()
    }

    /// Combined quantity of two lines, if it stays within the line limit
    pub fn checked_add(&self, other: Quantity) -> Option<Self> {
        self.into_inner()
            .checked_add(other.into_inner())
            .and_then(|sum| Self::try_new(sum).ok())
    }
}

/// Product name as shown on orders
#[nutype(
    sanitize(trim),
    validate(
        not_empty,
        predicate = |name| name.chars().count() <= catalog::MAX_PRODUCT_NAME_LENGTH
    ),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        Serialize,
        Deserialize,
        AsRef,
        Display
    )
)]
pub struct ProductName(String);
