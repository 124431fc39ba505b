//! Portfolio Scout service entrypoint.
//! Loads config, starts the periodic scheduler and serves the HTTP trigger.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;

use portfolio_scout::api::{self, AppState};
use portfolio_scout::metrics::Metrics;
use portfolio_scout::scheduler::{spawn_scheduler, SchedulerCfg};
use portfolio_scout::{build_coordinator, config, init_tracing, NotifierMux};

fn bind_addr() -> Result<SocketAddr> {
    if let Ok(addr) = std::env::var("BIND_ADDR") {
        return addr.parse().with_context(|| format!("invalid BIND_ADDR {addr:?}"));
    }
    let port: u16 = match std::env::var("PORT") {
        Ok(p) => p.parse().with_context(|| format!("invalid PORT {p:?}"))?,
        Err(_) => 8000,
    };
    Ok(SocketAddr::from(([0, 0, 0, 0], port)))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    // Missing Telegram credentials are the one fatal startup condition.
    let notifier = NotifierMux::from_env().context("notification channel not configured")?;
    let metrics = Metrics::init()?;
    let cfg = config::load_default()?;

    tracing::info!(
        sources = cfg.sources.len(),
        overrides = cfg.overrides.len(),
        channels = ?notifier.channel_names(),
        "portfolio scout starting"
    );

    let coordinator = Arc::new(build_coordinator(&cfg, notifier).await?);

    let _scheduler = spawn_scheduler(
        coordinator.clone(),
        SchedulerCfg {
            initial_delay: cfg.initial_delay(),
            interval: cfg.interval(),
        },
    );

    let app = api::create_router(AppState { coordinator }).merge(metrics.router());

    let addr = bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "http trigger listening");
    axum::serve(listener, app).await.context("http server")?;
    Ok(())
}
