use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use quicmetrics_core::error::{QuicMetricsError, Result};

use crate::app_state::AppState;
use crate::ingest::{is_blank, process_line, LineReader, ReadLineError};
use crate::obs::IngestMetrics;

/// Per-stream counters, returned when the stream closes cleanly.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StreamStats {
    pub lines: u64,
    pub merged: u64,
    pub parse_errors: u64,
    pub merge_errors: u64,
}

/// Keeps the active-stream gauge honest on every exit path, cancellation included.
struct ActiveGuard<'a> {
    metrics: &'a IngestMetrics,
    transport: &'static str,
}

impl<'a> ActiveGuard<'a> {
    fn enter(metrics: &'a IngestMetrics, transport: &'static str) -> Self {
        metrics.streams_accepted.inc(&[("transport", transport)]);
        metrics.streams_active.inc(&[("transport", transport)]);
        Self { metrics, transport }
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.metrics.streams_active.dec(&[("transport", self.transport)]);
    }
}

/// Drive one stream until end-of-data or a transport error.
///
/// Lines are processed strictly in arrival order. When `echo` is set every
/// received line is written back, terminated by `\n`, after it is processed.
pub async fn run_stream<R, W>(
    app: &AppState,
    transport: &'static str,
    reader: R,
    mut echo: Option<W>,
) -> Result<StreamStats>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let metrics = app.metrics();
    let _active = ActiveGuard::enter(&metrics, transport);

    let mut lines = LineReader::new(reader, app.cfg().ingest.max_line_bytes);
    let mut stats = StreamStats::default();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(ReadLineError::TooLong { limit }) => {
                stats.parse_errors += 1;
                metrics.parse_errors.inc(&[("kind", "line_too_long")]);
                tracing::warn!(limit, "dropping overlong line");
                continue;
            }
            Err(ReadLineError::Io(e)) => {
                metrics.transport_errors.inc(&[("transport", transport), ("op", "read")]);
                return Err(e.into());
            }
        };

        if is_blank(&line) {
            continue;
        }
        stats.lines += 1;

        match process_line(app, transport, &line).await {
            Ok(_) => stats.merged += 1,
            Err(QuicMetricsError::Parse(_)) => stats.parse_errors += 1,
            Err(QuicMetricsError::Merge(_)) => stats.merge_errors += 1,
            Err(e) => return Err(e),
        }

        if let Some(w) = echo.as_mut() {
            if let Err(e) = echo_line(w, &line).await {
                metrics.transport_errors.inc(&[("transport", transport), ("op", "write")]);
                return Err(e.into());
            }
        }
    }

    Ok(stats)
}

async fn echo_line<W: AsyncWrite + Unpin>(w: &mut W, line: &[u8]) -> std::io::Result<()> {
    w.write_all(line).await?;
    w.write_all(b"\n").await?;
    w.flush().await
}
