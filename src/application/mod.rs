//! Application services and business logic orchestration
//!
//! This module contains the order number allocator, the order service and
//! the application bootstrap that wires them to PostgreSQL.

pub mod allocator;
pub mod app;
pub mod order_service;
pub mod retry;

pub use allocator::OrderIdAllocator;
pub use app::Application;
pub use order_service::{OrderError, OrderService};
pub use retry::{RetryPolicy, Retryable};
