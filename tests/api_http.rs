// tests/api_http.rs
//
// HTTP-level tests for the trigger Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - GET /status (before and after a run)
// - POST /run  (202 when idle, 409 while a run is in flight)
// - GET /metrics

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{self, Body},
    Router,
};
use http::{Request, StatusCode};
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use portfolio_scout::api::{self, AppState};
use portfolio_scout::extract::Extractor;
use portfolio_scout::fetch::SiteFetcher;
use portfolio_scout::metrics::Metrics;
use portfolio_scout::notify::NotifierMux;
use portfolio_scout::store::{FileSnapshot, SnapshotStore};
use portfolio_scout::{RunCoordinator, Source};

const BODY_LIMIT: usize = 1024 * 1024;

struct FixedPage;

#[async_trait::async_trait]
impl SiteFetcher for FixedPage {
    async fn fetch(&self, _source: &Source) -> anyhow::Result<String> {
        Ok("<h2>Farcaster</h2><h2>Goldsky</h2>".into())
    }
}

fn coordinator(dir: &tempfile::TempDir) -> Arc<RunCoordinator> {
    Arc::new(
        RunCoordinator::new(
            vec![Source::static_page("https://a.vc/", "Alpha")],
            Arc::new(FixedPage),
            Arc::new(Extractor::default()),
            SnapshotStore::file_only(FileSnapshot::new(dir.path().join("d.txt"))),
            NotifierMux::new(),
        )
        .with_inter_source_delay(Duration::ZERO),
    )
}

fn test_router(c: Arc<RunCoordinator>) -> Router {
    api::create_router(AppState { coordinator: c }).merge(Metrics::detached().router())
}

async fn body_json(resp: axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn health_returns_ok() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(coordinator(&dir));

    let resp = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn status_reports_idle_then_last_run() {
    let dir = tempfile::tempdir().unwrap();
    let c = coordinator(&dir);
    let app = test_router(c.clone());

    let resp = app
        .clone()
        .oneshot(Request::get("/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let v = body_json(resp).await;
    assert_eq!(v["running"], false);
    assert_eq!(v["sources"], 1);
    assert_eq!(v["primary_store"], false);
    assert!(v["last_run"].is_null());

    c.run().await.unwrap();

    let resp = app
        .oneshot(Request::get("/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let v = body_json(resp).await;
    assert_eq!(v["last_run"]["total_new_deals"], 2);
    assert_eq!(v["last_run"]["persistence"]["primary"], "unavailable");
    assert_eq!(v["last_run"]["new_deals"][0]["label"], "Alpha");
}

#[tokio::test]
async fn run_trigger_conflicts_while_busy_then_accepts() {
    let dir = tempfile::tempdir().unwrap();
    let c = coordinator(&dir);
    let app = test_router(c.clone());

    // Hold the run slot so the HTTP trigger sees a run in flight.
    let permit = c.try_start().unwrap();
    let resp = app
        .clone()
        .oneshot(Request::post("/run").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(resp).await["status"], "already_running");
    drop(permit);

    let resp = app
        .oneshot(Request::post("/run").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    assert_eq!(body_json(resp).await["status"], "started");

    // background run finishes and releases the slot
    for _ in 0..200 {
        if c.last_report().is_some() && !c.is_running() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(c.last_report().is_some());
    assert!(!c.is_running());
}

#[tokio::test]
async fn metrics_route_is_mounted() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(coordinator(&dir));

    let resp = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
