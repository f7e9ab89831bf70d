use std::sync::Arc;

use anyhow::Context;

use eduadmin_api::app::{self, services::AppServices};
use eduadmin_api::config::ConsoleConfig;
use eduadmin_infra::jobs::{InMemoryJobStore, WorkerSimulator, seed_jobs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConsoleConfig::from_env();
    eduadmin_observability::tracing::init(config.log_format);
    config.warn_invalid();

    let store = InMemoryJobStore::arc();
    let seeded = seed_jobs(&store, config.seed_jobs, config.rng_seed.unwrap_or(7))
        .context("failed to seed mock jobs")?;
    tracing::info!(count = seeded.len(), "seeded mock jobs");

    let simulator = WorkerSimulator::new(store.clone(), config.outcome_policy(), config.simulator())
        .spawn()
        .context("failed to spawn worker simulator")?;

    let services = Arc::new(AppServices::new(store, config.policy));
    let router = app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await
        .context("server error")?;

    tokio::task::spawn_blocking(move || simulator.shutdown()).await?;
    Ok(())
}
