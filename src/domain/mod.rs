//! Domain types and business rules for order placement
//!
//! This module contains the core types of the storefront order workflow:
//! public order numbers, carts, orders, and the storage ports that the
//! infrastructure layer implements.

pub mod cart;
pub mod config_types;
pub mod identifiers;
pub mod order;
pub mod order_number;
pub mod repository;
pub mod sequence;
pub mod statistics;
pub mod types;
pub mod validation_constants;

pub use cart::*;
pub use identifiers::*;
pub use order::*;
pub use order_number::*;
pub use repository::*;
pub use sequence::*;
pub use statistics::*;
pub use types::*;
