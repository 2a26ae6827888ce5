//! HTTP surface: operational endpoints only, no business logic.

mod health;
mod metrics;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;

use crate::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(metrics::routes())
        .fallback(fallback)
        .with_state(state)
}

async fn fallback() -> StatusCode {
    StatusCode::NOT_FOUND
}
