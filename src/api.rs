// src/api.rs
//! HTTP trigger surface: health, status, manual run.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::coordinator::{RunCoordinator, RunReport};

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<RunCoordinator>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/status", get(status))
        .route("/run", post(trigger_run))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct StatusResp {
    running: bool,
    sources: usize,
    primary_store: bool,
    last_run: Option<RunReport>,
}

async fn status(State(state): State<AppState>) -> Json<StatusResp> {
    let c = &state.coordinator;
    Json(StatusResp {
        running: c.is_running(),
        sources: c.sources().len(),
        primary_store: c.store().is_available(),
        last_run: c.last_report(),
    })
}

#[derive(Serialize)]
struct TriggerResp {
    status: &'static str,
}

/// 202 when a run was started in the background, 409 when one is already going.
async fn trigger_run(State(state): State<AppState>) -> (StatusCode, Json<TriggerResp>) {
    match state.coordinator.try_start() {
        Ok(permit) => {
            tokio::spawn(async move {
                let report = permit.run().await;
                tracing::info!(
                    target: "api",
                    new = report.total_new_deals,
                    failed = report.failures.len(),
                    "manual run complete"
                );
            });
            (StatusCode::ACCEPTED, Json(TriggerResp { status: "started" }))
        }
        Err(e) => {
            tracing::info!(target: "api", error = %e, "manual run rejected");
            (
                StatusCode::CONFLICT,
                Json(TriggerResp {
                    status: "already_running",
                }),
            )
        }
    }
}
