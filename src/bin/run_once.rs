//! Execute a single scrape run and print the report as JSON.
//! `--dry-run` skips the messaging channels and prints the digest instead.

use anyhow::{Context, Result};
use std::sync::Arc;

use portfolio_scout::notify::RecordingNotifier;
use portfolio_scout::{build_coordinator, config, init_tracing, NotifierMux};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let dry_run = std::env::args().skip(1).any(|a| a == "--dry-run");
    let notifier = if dry_run {
        NotifierMux::new().with(Arc::new(RecordingNotifier::default()))
    } else {
        NotifierMux::from_env().context("notification channel not configured")?
    };

    let cfg = config::load_default()?;
    let coordinator = Arc::new(build_coordinator(&cfg, notifier).await?);
    let report = coordinator.run().await?;

    if dry_run {
        println!("{}\n", report.digest);
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
