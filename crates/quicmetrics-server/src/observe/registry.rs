use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;

use quicmetrics_core::error::Result;

use crate::aggregate::AggregateSnapshot;

/// A sink for post-merge state (log line, exporter, channel, ...).
#[async_trait]
pub trait Observer: Send + Sync {
    fn name(&self) -> &'static str;
    async fn observe(&self, snapshot: AggregateSnapshot) -> Result<()>;
}

/// Registry of observers, keyed by name.
#[derive(Default)]
pub struct ObserverSet {
    observers: DashMap<&'static str, Arc<dyn Observer>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self {
            observers: DashMap::new(),
        }
    }

    /// Register an observer, replacing any previous one with the same name.
    pub fn register(&self, observer: Arc<dyn Observer>) {
        self.observers.insert(observer.name(), observer);
    }

    pub fn registered(&self) -> Vec<&'static str> {
        self.observers.iter().map(|e| *e.key()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Push a copy of `snapshot` to every observer concurrently.
    /// Failures are logged and returned as a count; they never propagate.
    pub async fn notify(&self, snapshot: &AggregateSnapshot) -> usize {
        // no shard guard may be held across the awaits below
        let observers: Vec<Arc<dyn Observer>> =
            self.observers.iter().map(|e| e.value().clone()).collect();

        let mut futs: FuturesUnordered<_> = observers
            .iter()
            .map(|o| {
                let snap = snapshot.clone();
                async move { (o.name(), o.observe(snap).await) }
            })
            .collect();

        let mut failed = 0;
        while let Some((name, res)) = futs.next().await {
            if let Err(e) = res {
                tracing::warn!(observer = name, key = %snapshot.key, error = %e, "observer failed");
                failed += 1;
            }
        }
        failed
    }
}
