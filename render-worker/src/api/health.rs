//! `GET /health`: JSON status plus per-environment counters.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::runtime::EnvironmentSnapshot;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: i64,
    pub environments: BTreeMap<String, EnvironmentSnapshot>,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut environments = BTreeMap::new();
    if let Some(prod) = &state.prod {
        environments.insert(prod.name.clone(), prod.snapshot().await);
    }
    if let Some(dev) = &state.dev {
        environments.insert(dev.name.clone(), dev.snapshot().await);
    }

    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_seconds: (Utc::now() - state.started_at).num_seconds(),
        environments,
    })
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
