use anyhow::Result;
use storefront_orders::config::{LoggingSettings, Settings};
use storefront_orders::domain::config_types::LogFormat;
use storefront_orders::Application;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::new()?;
    init_tracing(&settings.logging);

    let app = Application::with_settings(settings).await?;
    app.run().await?;

    Ok(())
}

/// `RUST_LOG` wins over the configured level when set
fn init_tracing(logging: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);

    match logging.format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Pretty => subscriber.pretty().init(),
        LogFormat::Compact => subscriber.compact().init(),
    }
}
