//! quicmetrics server
//!
//! - TCP line-stream listener (`ingest.listen`), one task per connection
//! - HTTP surface (`http.listen`): POST/GET /metrics, /v1/aggregates, /healthz, /readyz
//! - Ctrl-C drains: readiness flips to 503, listeners stop accepting

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing_subscriber::{fmt, EnvFilter};

use quicmetrics_core::error::{QuicMetricsError, Result};
use quicmetrics_server::{app_state, config, transport};

const DEFAULT_CONFIG_PATH: &str = "quicmetrics.yaml";

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::load_from_file(&path)?;
    let ingest_addr = cfg.ingest.listen_addr()?;
    let http_addr = cfg.http.enabled.then(|| cfg.http.listen_addr()).transpose()?;

    let state = app_state::AppState::new(cfg)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    {
        let state = state.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("shutdown requested, draining");
                    state.set_draining();
                    let _ = shutdown_tx.send(true);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "cannot listen for shutdown signal");
                    // keep the sender alive so listeners are not stopped
                    std::future::pending::<()>().await;
                }
            }
        });
    }

    let ingest_listener = bind(ingest_addr).await?;
    tracing::info!(listen = %ingest_addr, "quicmetrics ingest listener starting");
    let http_listener = match http_addr {
        Some(addr) => {
            let listener = bind(addr).await?;
            tracing::info!(listen = %addr, "quicmetrics http listener starting");
            Some(listener)
        }
        None => None,
    };

    if let Err(e) = transport::serve_all(state.clone(), ingest_listener, http_listener, shutdown_rx).await {
        tracing::error!(error = %e, "listener failed, exiting");
        return Err(e);
    }

    tracing::info!(aggregates = state.store().len(), "quicmetrics stopped");
    Ok(())
}

async fn bind(addr: std::net::SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| QuicMetricsError::Transport(format!("bind {addr} failed: {e}")))
}
