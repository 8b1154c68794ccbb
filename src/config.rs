use crate::application::retry::RetryPolicy;
use crate::domain::config_types::{
    DatabaseName, DatabasePassword, DatabaseUsername, Host, LockTimeoutMs, LogFormat, LogLevel,
    MaxConnections, MaxRetries, Port, UtcOffsetMinutes,
};
use crate::domain::order_number::{OrderNumberError, PartitionTimezone};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub sequence: SequenceSettings,
    pub retry: RetrySettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApplicationSettings {
    pub environment: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub host: Host,
    pub port: Port,
    pub username: DatabaseUsername,
    pub password: DatabasePassword,
    pub database_name: DatabaseName,
    pub max_connections: MaxConnections,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SequenceSettings {
    /// Offset of the timezone whose calendar day partitions order numbers
    pub utc_offset_minutes: UtcOffsetMinutes,
    pub lock_timeout_ms: LockTimeoutMs,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrySettings {
    pub max_retries: MaxRetries,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_factor: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: LogLevel,
    pub format: LogFormat,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load(Path::new("config"))
    }

    /// Load settings from `config_dir` plus `STOREFRONT__*` environment variables
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let file = |name: &str| File::from(config_dir.join(name)).required(false);

        let config = Config::builder()
            // Start with default values
            .set_default("application.environment", environment.clone())?
            .set_default("database.host", "localhost")?
            .set_default("database.port", 5432)?
            .set_default("database.username", "postgres")?
            .set_default("database.password", "password")?
            .set_default("database.database_name", "storefront")?
            .set_default("database.max_connections", 10)?
            .set_default("sequence.utc_offset_minutes", 0)?
            .set_default("sequence.lock_timeout_ms", 2000)?
            .set_default("retry.max_retries", 5)?
            .set_default("retry.initial_delay_ms", 20)?
            .set_default("retry.max_delay_ms", 1000)?
            .set_default("retry.backoff_factor", 2.0)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")?
            // Add configuration files if they exist
            .add_source(file("default"))
            .add_source(file(&environment))
            .add_source(file("local"))
            // Add environment variables with prefix
            .add_source(
                Environment::with_prefix("STOREFRONT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.database.username,
            self.database.password.as_ref(),
            self.database.host,
            self.database.port,
            self.database.database_name
        )
    }

    pub fn partition_timezone(&self) -> Result<PartitionTimezone, OrderNumberError> {
        PartitionTimezone::from_offset_minutes(self.sequence.utc_offset_minutes.into_inner())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry.max_retries.into_inner(),
            initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            backoff_factor: self.retry.backoff_factor,
        }
    }
}
