//! Axum router wiring.

use axum::{extract::DefaultBodyLimit, routing::get, Router};

use crate::{app_state::AppState, ops};

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.cfg().http.max_body_bytes;

    Router::new()
        .route("/metrics", get(ops::metrics).post(ops::ingest))
        .route("/v1/aggregates", get(ops::aggregates))
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
