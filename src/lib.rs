//! Storefront orders - order placement with sequential public order numbers
//!
//! Every order receives a human-readable identifier of the form
//! `YYYYMMDD-XXXXXX`: the calendar day it was created on and a six-digit
//! sequence number that restarts at 000001 each day. Numbers are unique,
//! strictly increasing within a day, and never reissued, even when many
//! orders are placed concurrently.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use application::{Application, OrderError, OrderIdAllocator, OrderService, RetryPolicy};
pub use domain::order_number::{DateKey, PartitionTimezone, PublicOrderId, SequenceNumber};
pub use error::{Error, Result};
