//! Infrastructure layer for the storefront order service
//!
//! This module contains the implementations of the storage ports (in memory
//! and PostgreSQL) and other infrastructure concerns.

pub mod database;
pub mod log_messages;
pub mod memory;
pub mod postgres;

pub use database::*;
pub use memory::*;
pub use postgres::*;
