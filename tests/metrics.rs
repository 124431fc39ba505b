// tests/metrics.rs
//
// Installs the global Prometheus recorder (once per test binary) and checks
// that a run and a failed fetch publish the scout_* series.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use portfolio_scout::extract::Extractor;
use portfolio_scout::fetch::{SiteFetcher, StaticFetcher};
use portfolio_scout::metrics::Metrics;
use portfolio_scout::notify::NotifierMux;
use portfolio_scout::store::{FileSnapshot, SnapshotStore};
use portfolio_scout::{RunCoordinator, Source};

struct HalfBroken;

#[async_trait::async_trait]
impl SiteFetcher for HalfBroken {
    async fn fetch(&self, source: &Source) -> anyhow::Result<String> {
        if source.url.contains("down") {
            anyhow::bail!("HTTP 503");
        }
        Ok("<h3>Farcaster</h3>".into())
    }
}

#[tokio::test]
async fn run_publishes_expected_series() {
    let metrics = Metrics::init().expect("recorder installs once");
    let dir = tempfile::tempdir().unwrap();

    let coordinator = Arc::new(
        RunCoordinator::new(
            vec![
                Source::static_page("https://up.vc/", "Up"),
                Source::static_page("https://down.vc/", "Down"),
            ],
            Arc::new(HalfBroken),
            Arc::new(Extractor::default()),
            SnapshotStore::file_only(FileSnapshot::new(dir.path().join("d.txt"))),
            NotifierMux::new(),
        )
        .with_inter_source_delay(Duration::ZERO),
    );
    coordinator.run().await.unwrap();

    let permit = coordinator.try_start().unwrap();
    assert!(coordinator.run().await.is_err());
    drop(permit);

    // failed fetches are timed too
    let refused = Source::static_page("http://127.0.0.1:1/portfolio", "Closed");
    assert!(StaticFetcher::new().unwrap().fetch(&refused).await.is_err());

    let resp = metrics
        .router()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8_lossy(&body);

    for series in [
        "scout_runs_total 1",
        "scout_runs_rejected_total 1",
        "scout_source_failures_total 1",
        "scout_new_names_total 1",
        "scout_last_run_ts",
        "scout_fetch_ms_count{mode=\"static\"} 1",
    ] {
        assert!(text.contains(series), "missing {series} in:\n{text}");
    }
}
