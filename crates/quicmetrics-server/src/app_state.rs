//! Shared application state for the quicmetrics server.
//!
//! One instance per process, cloned into every ingestion task and HTTP
//! handler. The aggregate store lives behind a single shared handle here;
//! nothing else in the server holds aggregate state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use quicmetrics_core::error::Result;

use crate::aggregate::AggregateStore;
use crate::config::ServerConfig;
use crate::obs::IngestMetrics;
use crate::observe::{LogObserver, ObserverSet};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    store: Arc<AggregateStore>,
    observers: Arc<ObserverSet>,
    metrics: Arc<IngestMetrics>,
}

struct AppStateInner {
    cfg: ServerConfig,
    /// Set once on shutdown; never cleared.
    draining: AtomicBool,
}

impl AppState {
    /// Build application state.
    /// Returns Result so main can handle errors gracefully (no panic).
    pub fn new(cfg: ServerConfig) -> Result<Self> {
        cfg.validate()?;

        let store = Arc::new(AggregateStore::new(cfg.aggregate.on_type_mismatch));

        let observers = ObserverSet::new();
        if cfg.observers.log {
            observers.register(Arc::new(LogObserver::new()));
        }
        tracing::debug!(observers = ?observers.registered(), "observers registered");

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                draining: AtomicBool::new(false),
            }),
            store,
            observers: Arc::new(observers),
            metrics: Arc::new(IngestMetrics::default()),
        })
    }

    pub fn cfg(&self) -> &ServerConfig {
        &self.inner.cfg
    }

    pub fn store(&self) -> Arc<AggregateStore> {
        Arc::clone(&self.store)
    }

    pub fn observers(&self) -> Arc<ObserverSet> {
        Arc::clone(&self.observers)
    }

    pub fn metrics(&self) -> Arc<IngestMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::Relaxed)
    }

    pub fn set_draining(&self) {
        self.inner.draining.store(true, Ordering::Relaxed);
    }
}
