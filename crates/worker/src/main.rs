use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dcprism_worker::config::{LogFormat, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = WorkerConfig::from_env()?;

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "dcprism_worker=info,dcprism_core=info,dcprism_db=info".into());
    match config.log_format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }

    tracing::info!(
        festivals = ?config.festival_ids,
        cache_ttl_secs = config.cache_ttl.as_secs(),
        write = config.write_nomenclatures,
        "Worker starting"
    );

    // --- Database ---
    let pool = dcprism_db::create_pool(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection pool created");

    let summary = dcprism_worker::run(&config, pool).await?;
    tracing::info!(
        festivals = summary.festivals,
        generated = summary.generated,
        failures = summary.failures,
        written = summary.written,
        "Worker finished"
    );

    Ok(())
}
