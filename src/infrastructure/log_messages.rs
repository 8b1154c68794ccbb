//! Log message constants for infrastructure components
//!
//! This module centralizes the log messages used by the application and
//! infrastructure layers so their wording stays consistent.

/// Application startup and lifecycle messages
pub mod application {
    pub const STARTING: &str = "Starting storefront order service";
    pub const STARTED_SUCCESSFULLY: &str = "Order service ready";
    pub const CONNECTING_TO_DATABASE: &str = "Connecting to database";
}

/// Database-related log messages
pub mod database {
    pub const HEALTH_CHECK_FAILED: &str = "Database health check failed";
    pub const CONNECTION_ESTABLISHED: &str = "Database connection established";
    pub const MIGRATION_STARTED: &str = "Running database migrations";
    pub const MIGRATION_COMPLETED: &str = "Database migrations completed successfully";
}

/// Order number allocation messages
pub mod allocation {
    pub const ALLOCATED: &str = "Order number allocated";
    pub const EXHAUSTED: &str = "Order numbers exhausted for partition";
    pub const LOCK_TIMED_OUT: &str = "Timed out waiting for the order sequence counter";
    pub const CONTENDED: &str = "Order number allocation contended, retrying";
    pub const RETRIES_EXHAUSTED: &str = "Giving up after repeated contention";
    pub const STORE_UNAVAILABLE: &str = "Order sequence store unavailable";
}

/// Order lifecycle messages
pub mod orders {
    pub const PLACED: &str = "Order placed";
    pub const REJECTED: &str = "Order rejected";
    pub const STATUS_CHANGED: &str = "Order status changed";
    pub const CONFIRMED: &str = "Order confirmed by customer";
}

/// Configuration messages
pub mod configuration {
    pub const CONFIG_LOADED: &str = "Configuration loaded successfully";
    pub const PARTITION_TIMEZONE: &str = "Order numbers partitioned by day in";
}
