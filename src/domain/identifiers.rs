//! Internal entity identifiers
//!
//! These keys never leave the backend; customers only ever see the
//! [`PublicOrderId`](crate::domain::order_number::PublicOrderId). Each
//! identifier is a newtype around UUID v7 so keys sort by creation time.

use nutype::nutype;
use uuid::Uuid;

/// Internal primary key of an order
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRef
))]
pub struct OrderId(Uuid);

impl OrderId {
    pub fn generate() -> Self {
        Self::new(Uuid::now_v7())
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::generate()
    }
}

/// Identifier of a registered customer
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRef
))]
pub struct UserId(Uuid);

impl UserId {
    pub fn generate() -> Self {
        Self::new(Uuid::now_v7())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::generate()
    }
}

/// Identifier of a catalog product
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRef
))]
pub struct ProductId(Uuid);

impl ProductId {
    pub fn generate() -> Self {
        Self::new(Uuid::now_v7())
    }
}

impl Default for ProductId {
    fn default() -> Self {
        Self::generate()
    }
}
