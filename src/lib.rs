// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod config;
pub mod coordinator;
pub mod digest;
pub mod extract;
pub mod fetch;
pub mod filter;
pub mod metrics;
pub mod notify;
pub mod scheduler;
pub mod source;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::coordinator::{RunCoordinator, RunRejected, RunReport};
pub use crate::notify::{Notifier, NotifierMux};
pub use crate::source::{Interaction, RenderMode, Source};

use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::WatchConfig;
use crate::extract::Extractor;
use crate::fetch::PageFetcher;
use crate::store::{FileSnapshot, SnapshotStore};

/// `RUST_LOG` filter (default `portfolio_scout=info,warn`); `LOG_FORMAT=json` for JSON lines.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("portfolio_scout=info,warn"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

/// `DATABASE_URL`, else `POSTGRES_URL`.
pub fn database_url_from_env() -> Option<String> {
    ["DATABASE_URL", "POSTGRES_URL"]
        .iter()
        .find_map(|k| std::env::var(k).ok().filter(|v| !v.trim().is_empty()))
}

/// Wire the production coordinator: real fetchers, Postgres (if reachable) + file store.
pub async fn build_coordinator(cfg: &WatchConfig, notifier: NotifierMux) -> Result<RunCoordinator> {
    let fetcher = PageFetcher::from_env()?;
    let store = SnapshotStore::connect(
        database_url_from_env().as_deref(),
        FileSnapshot::new(cfg.data_file.clone()),
    )
    .await;

    Ok(RunCoordinator::new(
        cfg.sources.clone(),
        Arc::new(fetcher),
        Arc::new(Extractor::new(cfg.registry())),
        store,
        notifier,
    )
    .with_inter_source_delay(cfg.inter_source_delay()))
}
