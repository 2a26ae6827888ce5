//! `GET /metrics`: Prometheus text exposition of per-environment
//! counters and uptime.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use prometheus::{Encoder, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};

use crate::AppState;

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let registry = Registry::new();

    let uptime = IntGauge::new("render_worker_uptime_seconds", "Seconds since process start")
        .expect("metric name/help are static and valid");
    uptime.set((Utc::now() - state.started_at).num_seconds());
    registry.register(Box::new(uptime.clone())).ok();

    let processed = IntGaugeVec::new(
        Opts::new("render_worker_jobs_processed_total", "Jobs processed per environment"),
        &["environment"],
    )
    .expect("metric name/help are static and valid");
    let failed = IntGaugeVec::new(
        Opts::new("render_worker_jobs_failed_total", "Jobs failed per environment"),
        &["environment"],
    )
    .expect("metric name/help are static and valid");
    let processing = IntGaugeVec::new(
        Opts::new("render_worker_is_processing", "1 if this environment currently has a job in flight"),
        &["environment"],
    )
    .expect("metric name/help are static and valid");

    for env in [&state.prod, &state.dev].into_iter().flatten() {
        let snapshot = env.snapshot().await;
        processed.with_label_values(&[&snapshot.name]).set(snapshot.total_processed as i64);
        failed.with_label_values(&[&snapshot.name]).set(snapshot.total_failed as i64);
        processing.with_label_values(&[&snapshot.name]).set(snapshot.is_processing as i64);
    }
    registry.register(Box::new(processed)).ok();
    registry.register(Box::new(failed)).ok();
    registry.register(Box::new(processing)).ok();

    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .expect("prometheus text encoding of in-process gauges cannot fail");

    (
        [(axum::http::header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/metrics", get(metrics))
}
