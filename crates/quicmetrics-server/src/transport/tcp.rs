//! TCP line-stream listener.
//!
//! Every accepted connection is one stream and gets its own task, so a slow
//! or failing peer never blocks the accept loop or another stream.

use std::future::Future;
use std::io;
use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::net::{TcpListener, TcpStream};
use tracing::Instrument;

use quicmetrics_core::error::{QuicMetricsError, Result};

use crate::app_state::AppState;
use crate::ingest::run_stream;

/// Source of inbound connections.
#[async_trait]
pub trait Accept: Send + Sync {
    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)>;
}

#[async_trait]
impl Accept for TcpListener {
    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(self).await
    }
}

/// Accept connections until `shutdown` resolves.
///
/// An accept error is returned to the caller and ends the listener; errors on
/// an accepted stream stay inside that stream's task.
pub async fn serve<A, F>(app: AppState, listener: A, shutdown: F) -> Result<()>
where
    A: Accept,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut next_id: u64 = 0;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("ingest listener stopping");
                return Ok(());
            }
            accepted = listener.accept() => {
                let (stream, peer) = accepted.map_err(|e| {
                    tracing::error!(error = %e, "ingest accept failed");
                    QuicMetricsError::Transport(format!("accept failed: {e}"))
                })?;
                next_id += 1;

                let span = tracing::info_span!("stream", %peer, id = next_id);
                tokio::spawn(handle_conn(app.clone(), stream, peer).instrument(span));
            }
        }
    }
}

async fn handle_conn(app: AppState, mut stream: TcpStream, peer: SocketAddr) {
    tracing::info!(%peer, "stream accepted");
    // borrowed halves: dropping an unused writer must not half-close the socket
    let (rd, wr) = stream.split();
    let echo = app.cfg().ingest.echo.then_some(wr);

    match run_stream(&app, "tcp", rd, echo).await {
        Ok(stats) => tracing::info!(
            lines = stats.lines,
            merged = stats.merged,
            parse_errors = stats.parse_errors,
            merge_errors = stats.merge_errors,
            "stream closed"
        ),
        Err(e) => tracing::warn!(error = %e, "stream terminated"),
    }
}
