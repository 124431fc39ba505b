// src/coordinator.rs
//! One run: load snapshot, walk sources in order, diff, persist, notify.
//!
//! Runs are single-flight. `try_start` hands out at most one [`RunPermit`] at a
//! time; a second caller gets [`RunRejected::AlreadyRunning`] immediately.

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::digest::{self, NewDeal, SnapshotStats};
use crate::extract::Extractor;
use crate::fetch::SiteFetcher;
use crate::notify::NotifierMux;
use crate::source::Source;
use crate::store::{LoadOrigin, PersistOutcome, SnapshotStore};

pub const DEFAULT_INTER_SOURCE_DELAY: Duration = Duration::from_secs(1);

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("scout_runs_total", "Completed scrape runs.");
        describe_counter!(
            "scout_runs_rejected_total",
            "Run requests rejected because a run was in progress."
        );
        describe_counter!(
            "scout_source_failures_total",
            "Sources whose fetch or extraction failed."
        );
        describe_counter!("scout_new_names_total", "Names seen for the first time.");
        describe_counter!(
            "scout_notify_failures_total",
            "Digest deliveries that failed, per channel."
        );
        describe_histogram!("scout_fetch_ms", "Page fetch time in milliseconds.");
        describe_gauge!("scout_last_run_ts", "Unix ts when the last run finished.");
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RunRejected {
    #[error("a run is already in progress")]
    AlreadyRunning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceCount {
    pub url: String,
    pub label: String,
    pub extracted: usize,
    pub new: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFailure {
    pub url: String,
    pub label: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub total_new_deals: usize,
    pub per_source: Vec<SourceCount>,
    pub failures: Vec<SourceFailure>,
    pub new_deals: Vec<NewDeal>,
    pub loaded_from: LoadOrigin,
    pub persistence: PersistOutcome,
    pub stats: SnapshotStats,
    pub digest: String,
    pub notified_channels: usize,
}

pub struct RunCoordinator {
    sources: Vec<Source>,
    fetcher: Arc<dyn SiteFetcher>,
    extractor: Arc<Extractor>,
    store: SnapshotStore,
    notifier: NotifierMux,
    inter_source_delay: Duration,
    running: AtomicBool,
    last_report: Mutex<Option<RunReport>>,
}

/// Proof that the holder owns the current run. Dropping it clears the flag.
pub struct RunPermit {
    coordinator: Arc<RunCoordinator>,
}

impl RunPermit {
    pub async fn run(self) -> RunReport {
        self.coordinator.execute().await
    }
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.coordinator.running.store(false, Ordering::Release);
    }
}

impl RunCoordinator {
    pub fn new(
        sources: Vec<Source>,
        fetcher: Arc<dyn SiteFetcher>,
        extractor: Arc<Extractor>,
        store: SnapshotStore,
        notifier: NotifierMux,
    ) -> Self {
        Self {
            sources,
            fetcher,
            extractor,
            store,
            notifier,
            inter_source_delay: DEFAULT_INTER_SOURCE_DELAY,
            running: AtomicBool::new(false),
            last_report: Mutex::new(None),
        }
    }

    pub fn with_inter_source_delay(mut self, delay: Duration) -> Self {
        self.inter_source_delay = delay;
        self
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn last_report(&self) -> Option<RunReport> {
        self.last_report
            .lock()
            .map(|g| g.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn try_start(self: &Arc<Self>) -> Result<RunPermit, RunRejected> {
        ensure_metrics_described();
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            counter!("scout_runs_rejected_total").increment(1);
            info!(target: "run", "run requested while another is in progress; rejected");
            return Err(RunRejected::AlreadyRunning);
        }
        Ok(RunPermit {
            coordinator: Arc::clone(self),
        })
    }

    /// Start-and-wait. Rejected immediately when a run is in flight.
    pub async fn run(self: &Arc<Self>) -> Result<RunReport, RunRejected> {
        let permit = self.try_start()?;
        Ok(permit.run().await)
    }

    /// Fetch and extract one source. Zero candidates counts as a failure so a
    /// broken page cannot wipe that source's snapshot.
    async fn scrape(&self, source: &Source) -> Result<BTreeSet<String>> {
        let html = self
            .fetcher
            .fetch(source)
            .await
            .with_context(|| format!("fetching {}", source.url))?;

        let extractor = Arc::clone(&self.extractor);
        let source_id = source.url.clone();
        let names = tokio::task::spawn_blocking(move || extractor.extract(&html, &source_id))
            .await
            .map_err(|e| anyhow!("extraction aborted: {e}"))?;

        if names.is_empty() {
            bail!("no candidate names extracted");
        }
        Ok(names.into_iter().collect())
    }

    async fn execute(&self) -> RunReport {
        let started_at = Utc::now();
        let t0 = Instant::now();

        let (mut snapshot, loaded_from) = self.store.load_all().await;
        info!(
            target: "run",
            sources = self.sources.len(),
            ?loaded_from,
            known_sources = snapshot.len(),
            "run started"
        );

        let mut per_source = Vec::new();
        let mut failures = Vec::new();
        let mut new_deals = Vec::new();

        for (i, source) in self.sources.iter().enumerate() {
            if i > 0 && !self.inter_source_delay.is_zero() {
                tokio::time::sleep(self.inter_source_delay).await;
            }
            let label = source.display_label();

            match self.scrape(source).await {
                Ok(current) => {
                    let fresh: Vec<String> = match snapshot.get(&source.url) {
                        Some(known) => current.difference(known).cloned().collect(),
                        None => current.iter().cloned().collect(),
                    };
                    info!(
                        target: "run",
                        source = %source.url,
                        extracted = current.len(),
                        new = fresh.len(),
                        "source scraped"
                    );
                    per_source.push(SourceCount {
                        url: source.url.clone(),
                        label: label.clone(),
                        extracted: current.len(),
                        new: fresh.len(),
                    });
                    new_deals.extend(fresh.into_iter().map(|name| NewDeal {
                        name,
                        label: label.clone(),
                    }));
                    snapshot.insert(source.url.clone(), current);
                }
                Err(e) => {
                    warn!(target: "run", source = %source.url, error = ?e, "source failed");
                    counter!("scout_source_failures_total").increment(1);
                    failures.push(SourceFailure {
                        url: source.url.clone(),
                        label,
                        error: format!("{e:#}"),
                    });
                }
            }
        }

        let persistence = self.store.save_all(&snapshot).await;
        let stats = SnapshotStats::of(&snapshot);
        let failed_labels: Vec<String> = failures.iter().map(|f| f.label.clone()).collect();
        let digest = digest::compose(&new_deals, stats, &failed_labels);
        let notified_channels = self.notifier.notify(&digest).await;

        counter!("scout_runs_total").increment(1);
        counter!("scout_new_names_total").increment(new_deals.len() as u64);
        gauge!("scout_last_run_ts").set(Utc::now().timestamp() as f64);

        let report = RunReport {
            started_at,
            duration_ms: t0.elapsed().as_millis() as u64,
            total_new_deals: new_deals.len(),
            per_source,
            failures,
            new_deals,
            loaded_from,
            persistence,
            stats,
            digest,
            notified_channels,
        };

        info!(
            target: "run",
            new = report.total_new_deals,
            failed = report.failures.len(),
            tracked_sources = stats.sources,
            tracked_names = stats.names,
            degraded = persistence.is_degraded(),
            duration_ms = report.duration_ms,
            "run finished"
        );

        match self.last_report.lock() {
            Ok(mut slot) => *slot = Some(report.clone()),
            Err(poisoned) => *poisoned.into_inner() = Some(report.clone()),
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::AcceptanceRegistry;
    use crate::notify::RecordingNotifier;
    use crate::store::{FileSnapshot, Snapshot};
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct StubFetcher(HashMap<String, String>);

    #[async_trait]
    impl SiteFetcher for StubFetcher {
        async fn fetch(&self, source: &Source) -> Result<String> {
            self.0
                .get(&source.url)
                .cloned()
                .ok_or_else(|| anyhow!("connection refused"))
        }
    }

    fn page(names: &[&str]) -> String {
        let items: String = names.iter().map(|n| format!("<h3>{n}</h3>")).collect();
        format!("<html><body>{items}</body></html>")
    }

    #[tokio::test]
    async fn empty_extraction_leaves_snapshot_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let file = FileSnapshot::new(dir.path().join("data.txt"));
        let mut prior = Snapshot::new();
        prior.insert(
            "https://a.vc/".into(),
            ["Foo".to_string()].into_iter().collect(),
        );
        file.save(&prior).await.unwrap();

        let fetcher = StubFetcher(HashMap::from([(
            "https://a.vc/".to_string(),
            "<html><body><p>nothing here</p></body></html>".to_string(),
        )]));
        let rec = Arc::new(RecordingNotifier::default());
        let coord = Arc::new(
            RunCoordinator::new(
                vec![Source::static_page("https://a.vc/", "A")],
                Arc::new(fetcher),
                Arc::new(Extractor::new(AcceptanceRegistry::empty())),
                SnapshotStore::file_only(file.clone()),
                NotifierMux::new().with(rec.clone()),
            )
            .with_inter_source_delay(Duration::ZERO),
        );

        let report = coord.run().await.unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].error, "no candidate names extracted");
        assert_eq!(file.load().await.unwrap(), prior);
        assert_eq!(rec.messages().len(), 1);
        assert!(!coord.is_running());
        assert!(coord.last_report().is_some());
    }

    #[tokio::test]
    async fn permit_blocks_second_start_until_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let coord = Arc::new(RunCoordinator::new(
            vec![],
            Arc::new(StubFetcher(HashMap::from([(
                "x".to_string(),
                page(&["Foo"]),
            )]))),
            Arc::new(Extractor::new(AcceptanceRegistry::empty())),
            SnapshotStore::file_only(FileSnapshot::new(dir.path().join("d.txt"))),
            NotifierMux::new(),
        ));

        let permit = coord.try_start().unwrap();
        assert!(coord.is_running());
        assert_eq!(coord.try_start().err(), Some(RunRejected::AlreadyRunning));
        drop(permit);
        assert!(!coord.is_running());
        assert!(coord.try_start().is_ok());
    }
}
