// src/scheduler.rs
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::coordinator::{RunCoordinator, RunRejected};

#[derive(Clone, Copy, Debug)]
pub struct SchedulerCfg {
    pub initial_delay: Duration,
    pub interval: Duration,
}

/// Periodic trigger. Ticks that land while a run is in flight are dropped.
pub fn spawn_scheduler(coordinator: Arc<RunCoordinator>, cfg: SchedulerCfg) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + cfg.initial_delay, cfg.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            target: "scheduler",
            initial_delay_secs = cfg.initial_delay.as_secs(),
            interval_secs = cfg.interval.as_secs(),
            "scheduler started"
        );

        loop {
            ticker.tick().await;
            match coordinator.run().await {
                Ok(report) => tracing::info!(
                    target: "scheduler",
                    new = report.total_new_deals,
                    failed = report.failures.len(),
                    "scheduled run complete"
                ),
                Err(RunRejected::AlreadyRunning) => {
                    tracing::info!(target: "scheduler", "scheduled tick skipped, run in progress")
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Extractor;
    use crate::fetch::SiteFetcher;
    use crate::notify::{NotifierMux, RecordingNotifier};
    use crate::source::Source;
    use crate::store::{FileSnapshot, SnapshotStore};

    struct OnePage;

    #[async_trait::async_trait]
    impl SiteFetcher for OnePage {
        async fn fetch(&self, _source: &Source) -> anyhow::Result<String> {
            Ok("<h2>Farcaster</h2>".into())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_run_waits_for_initial_delay_then_repeats() {
        let dir = tempfile::tempdir().unwrap();
        let rec = Arc::new(RecordingNotifier::default());
        let coord = Arc::new(RunCoordinator::new(
            vec![Source::static_page("https://a.vc/", "A")],
            Arc::new(OnePage),
            Arc::new(Extractor::default()),
            SnapshotStore::file_only(FileSnapshot::new(dir.path().join("d.txt"))),
            NotifierMux::new().with(rec.clone()),
        ));

        let handle = spawn_scheduler(
            coord.clone(),
            SchedulerCfg {
                initial_delay: Duration::from_secs(30),
                interval: Duration::from_secs(7200),
            },
        );

        time::sleep(Duration::from_secs(29)).await;
        assert!(coord.last_report().is_none());

        time::sleep(Duration::from_secs(2)).await;
        while coord.last_report().is_none() {
            tokio::task::yield_now().await;
        }
        assert_eq!(coord.last_report().unwrap().total_new_deals, 1);

        time::sleep(Duration::from_secs(7200)).await;
        while rec.messages().len() < 2 {
            tokio::task::yield_now().await;
        }
        assert!(rec.messages()[1].starts_with("📊 No new deals"));

        handle.abort();
    }
}
