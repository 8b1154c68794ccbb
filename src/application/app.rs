use crate::application::allocator::OrderIdAllocator;
use crate::application::order_service::OrderService;
use crate::config::Settings;
use crate::domain::order_number::{DateKey, PartitionTimezone};
use crate::infrastructure::log_messages;
use crate::infrastructure::{Database, PostgresOrderStore, PostgresSequenceStore};
use crate::Result;
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, instrument};

/// Main application struct that coordinates all components
pub struct Application {
    settings: Settings,
    database: Database,
    timezone: PartitionTimezone,
    orders: OrderService<PostgresOrderStore>,
}

impl Application {
    #[instrument]
    pub async fn new() -> Result<Self> {
        Self::with_settings(Settings::new()?).await
    }

    #[instrument(skip(settings))]
    pub async fn with_settings(settings: Settings) -> Result<Self> {
        let timezone = settings.partition_timezone()?;
        info!(
            environment = %settings.application.environment,
            "{}",
            log_messages::configuration::CONFIG_LOADED
        );
        info!(%timezone, "{}", log_messages::configuration::PARTITION_TIMEZONE);

        info!(
            host = %settings.database.host,
            "{}",
            log_messages::application::CONNECTING_TO_DATABASE
        );
        let pool = PgPoolOptions::new()
            .max_connections(settings.database.max_connections.into_inner())
            .connect(&settings.database_url())
            .await?;
        info!("{}", log_messages::database::CONNECTION_ESTABLISHED);

        let database = Database::new(pool);
        database.migrate().await?;
        database.health_check().await?;

        let store = PostgresOrderStore::new(
            database.pool().clone(),
            settings.sequence.lock_timeout_ms,
        );
        let orders = OrderService::new(store, timezone, settings.retry_policy());

        Ok(Self {
            settings,
            database,
            timezone,
            orders,
        })
    }

    /// Report readiness along with today's allocation state
    #[instrument(skip(self))]
    pub async fn run(self) -> Result<()> {
        info!("{}", log_messages::application::STARTING);

        let today = DateKey::from_timestamp(Utc::now(), self.timezone)?;
        let last_issued = self.allocator().last_issued(today).await?;
        let statistics = self.orders.admin_statistics().await?;

        info!(
            partition = %today,
            last_issued = ?last_issued.map(|id| id.to_string()),
            statistics = %serde_json::to_string(&statistics)?,
            "{}",
            log_messages::application::STARTED_SUCCESSFULLY
        );

        Ok(())
    }

    /// Standalone allocator sharing the order store's counters
    pub fn allocator(&self) -> OrderIdAllocator<PostgresSequenceStore> {
        OrderIdAllocator::new(self.orders.store().sequences(), self.timezone)
    }

    pub fn orders(&self) -> &OrderService<PostgresOrderStore> {
        &self.orders
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn database(&self) -> &Database {
        &self.database
    }
}
