//! HTTP endpoints.
//!
//! - `POST /metrics`       : ingest a body of StatsD lines (one per request in the common case)
//! - `GET  /metrics`       : Prometheus text format (self-metrics + aggregates)
//! - `GET  /v1/aggregates` : JSON snapshot of every aggregate
//! - `/healthz`            : liveness
//! - `/readyz`             : readiness (503 when draining)

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Serialize;

use quicmetrics_core::error::QuicMetricsError;

use crate::app_state::AppState;
use crate::ingest::{is_blank, process_line};

/// Errors reported back per request are capped; the counts stay exact.
const MAX_REPORTED_ERRORS: usize = 16;

#[derive(Debug, Default, Serialize)]
pub struct IngestSummary {
    pub accepted: usize,
    pub rejected: usize,
    pub errors: Vec<IngestLineError>,
}

#[derive(Debug, Serialize)]
pub struct IngestLineError {
    pub line: usize,
    pub code: &'static str,
    pub msg: String,
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    if state.is_draining() {
        (StatusCode::SERVICE_UNAVAILABLE, "draining")
    } else {
        (StatusCode::OK, "ready")
    }
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    let body = state
        .metrics()
        .render(&state.store().snapshot_all(), state.is_draining());

    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
        .into_response()
}

pub async fn aggregates(State(state): State<AppState>) -> Response {
    Json(state.store().snapshot_all()).into_response()
}

/// Each request body is one stream; every non-blank line is handled on its own.
pub async fn ingest(State(state): State<AppState>, body: Bytes) -> Response {
    if state.is_draining() {
        return (StatusCode::SERVICE_UNAVAILABLE, "draining").into_response();
    }
    if body.len() > state.cfg().http.max_body_bytes {
        return (StatusCode::PAYLOAD_TOO_LARGE, "body too large").into_response();
    }

    let metrics = state.metrics();
    metrics.streams_accepted.inc(&[("transport", "http")]);

    let mut summary = IngestSummary::default();
    // line numbers are physical lines of the body, blank ones included
    let lines = body
        .split(|b| *b == b'\n')
        .enumerate()
        .filter(|(_, l)| !is_blank(l));
    for (idx, line) in lines {
        match process_line(&state, "http", line).await {
            Ok(_) => summary.accepted += 1,
            Err(e) => {
                summary.rejected += 1;
                if summary.errors.len() < MAX_REPORTED_ERRORS {
                    summary.errors.push(line_error(idx, &e));
                }
            }
        }
    }

    (StatusCode::ACCEPTED, Json(summary)).into_response()
}

fn line_error(idx: usize, e: &QuicMetricsError) -> IngestLineError {
    IngestLineError {
        line: idx + 1,
        code: e.code().as_str(),
        msg: e.to_string(),
    }
}
