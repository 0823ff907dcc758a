//! Stream Ingestion Loop.
//!
//! Bytes -> lines -> `parse_bytes` -> `AggregateStore::merge` -> observers.
//! Parse and merge failures drop the offending line only; transport failures
//! end only the stream they happened on.

pub mod reader;
pub mod stream;

use quicmetrics_core::error::{QuicMetricsError, Result};
use quicmetrics_core::statsd::parse_bytes;

use crate::aggregate::AggregateSnapshot;
use crate::app_state::AppState;

pub use reader::{LineReader, ReadLineError};
pub use stream::{run_stream, StreamStats};

pub(crate) fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

/// Parse, merge and publish one line. Shared by every transport.
///
/// The merge itself never suspends; the only await is the observer fan-out,
/// which runs after the aggregate is already consistent.
pub async fn process_line(app: &AppState, transport: &str, line: &[u8]) -> Result<AggregateSnapshot> {
    let metrics = app.metrics();
    tracing::debug!(line = %String::from_utf8_lossy(line), "got line");

    let record = parse_bytes(line).map_err(|e| {
        metrics.parse_errors.inc(&[("kind", e.kind())]);
        tracing::warn!(error = %e, line = %String::from_utf8_lossy(line), "dropping malformed line");
        QuicMetricsError::from(e)
    })?;

    let snapshot = app.store().merge(record).map_err(|e| {
        metrics.merge_rejections.inc(&[("reason", "type_mismatch")]);
        tracing::warn!(error = %e, "merge rejected");
        QuicMetricsError::from(e)
    })?;

    metrics.lines_accepted.inc(&[("transport", transport)]);

    let failed = app.observers().notify(&snapshot).await;
    if failed > 0 {
        metrics.observer_failures.add(&[], failed as u64);
    }

    Ok(snapshot)
}
