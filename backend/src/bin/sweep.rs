//! Runs the lifecycle sweep once and prints the `{success, processedCount,
//! timestamp}` summary as JSON. Exits non-zero when the sweep fails.
//!
//! Meant for external schedulers that prefer a process over the
//! `/api/v1/cron/sweep` endpoint.

use anyhow::Context;
use aurora_addict_shared::SweepResponse;
use chrono::Utc;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use aurora_addict_backend::config::AppConfig;
use aurora_addict_backend::database::Database;
use aurora_addict_backend::repositories::{ParticipationStore, PgStore};
use aurora_addict_backend::services::{EventBus, SweepConfig, SweepService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    let database = Database::new(&config.database_url, config.database_max_connections)
        .await
        .context("Failed to connect to database")?;

    let store: Arc<dyn ParticipationStore> = Arc::new(PgStore::new(database.pool().clone()));
    let sweep = SweepService::new(store, EventBus::new(), SweepConfig::from_app_config(&config));

    let now = Utc::now();
    let outcome = sweep.run_sweep(now).await;
    let response = match &outcome {
        Ok(report) => SweepResponse::completed(report.processed_count, now),
        Err(_) => SweepResponse::failed(now),
    };
    println!("{}", serde_json::to_string(&response).context("Failed to serialize sweep summary")?);

    outcome.context("Sweep failed")?;
    Ok(())
}
