//! quicmetrics core: StatsD line parsing, metric identity, and error types.
//!
//! This crate defines the wire-level contract and error surface shared by the
//! server and any embedding tool. It carries no transport or runtime
//! dependencies so it can be reused in multiple contexts.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths surface as `ParseError`/`Result` so a long-running
//! ingestion process never crashes on a malformed packet.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod statsd;

/// Shared result type.
pub use error::{ErrorCode, MergeError, ParseError, QuicMetricsError, Result};
