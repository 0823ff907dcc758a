//! Transport layer.
//!
//! Accepts connections and hands each accepted byte stream to the ingestion
//! loop on its own task.

pub mod tcp;

use tokio::net::TcpListener;
use tokio::sync::watch;

use quicmetrics_core::error::{QuicMetricsError, Result};

use crate::app_state::AppState;
use crate::router;

/// Run the ingest listener and, when given, the HTTP listener until
/// `shutdown` flips to `true`.
///
/// The first listener to fail ends both and its error is returned; a
/// process without a working ingest listener must not keep answering HTTP.
pub async fn serve_all<A>(
    app: AppState,
    ingest: A,
    http: Option<TcpListener>,
    shutdown: watch::Receiver<bool>,
) -> Result<()>
where
    A: tcp::Accept,
{
    let ingest = tcp::serve(app.clone(), ingest, wait_shutdown(shutdown.clone()));

    let http = async move {
        let Some(listener) = http else {
            return Ok(());
        };
        axum::serve(listener, router::build_router(app))
            .with_graceful_shutdown(wait_shutdown(shutdown))
            .await
            .map_err(|e| QuicMetricsError::Transport(format!("http server failed: {e}")))
    };

    tokio::try_join!(ingest, http)?;
    Ok(())
}

/// Resolves once the shutdown flag is set or its sender is gone.
pub async fn wait_shutdown(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}
