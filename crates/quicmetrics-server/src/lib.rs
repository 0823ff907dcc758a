//! quicmetrics server library entry.
//!
//! Wires the config, aggregate store, observers, ingestion loop, TCP
//! transport, and HTTP surface into one server. Consumed by the binary
//! (`main.rs`) and by integration tests.

pub mod aggregate;
pub mod app_state;
pub mod config;
pub mod ingest;
pub mod obs;
pub mod observe;
pub mod ops;
pub mod router;
pub mod transport;
