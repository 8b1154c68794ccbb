use crate::application::OrderError;
use crate::domain::order_number::OrderNumberError;
use crate::domain::sequence::AllocationError;
use thiserror::Error;

/// Storefront order service error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid order number: {0}")]
    OrderNumber(#[from] OrderNumberError),

    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error("Application error: {message}")]
    Application { message: String },
}

impl Error {
    pub fn application(message: impl Into<String>) -> Self {
        Self::Application {
            message: message.into(),
        }
    }

    /// Whether retrying the failed operation may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Allocation(err) => err.is_retryable(),
            Error::Order(OrderError::Store(err)) => err.is_retryable(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_number::DateKey;

    #[test]
    fn contention_stays_retryable_through_conversions() {
        let partition = DateKey::from_ymd(2025, 7, 31).unwrap();
        let err: Error = AllocationError::ContentionTimeout { partition }.into();
        assert!(err.is_retryable());

        let err: Error = AllocationError::SequenceExhausted { partition }.into();
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("20250731"));
    }

    #[test]
    fn application_error_keeps_message() {
        let err = Error::application("boom");
        assert_eq!(err.to_string(), "Application error: boom");
    }
}
