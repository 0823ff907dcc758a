//! Lightweight in-process self-metrics.
//!
//! Stored as atomics behind `DashMap` label vectors and rendered by the
//! `/metrics` handler together with the aggregate state.

pub mod metrics;

pub use metrics::IngestMetrics;
