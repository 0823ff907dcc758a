use async_trait::async_trait;
use tokio::sync::mpsc;

use quicmetrics_core::error::{QuicMetricsError, Result};

use crate::aggregate::AggregateSnapshot;
use crate::observe::Observer;

/// Logs every post-merge snapshot at info level.
#[derive(Default)]
pub struct LogObserver;

impl LogObserver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Observer for LogObserver {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn observe(&self, snapshot: AggregateSnapshot) -> Result<()> {
        tracing::info!(
            key = %snapshot.key,
            metric_type = %snapshot.metric_type,
            value = %snapshot.value,
            updates = snapshot.updates,
            "aggregate updated"
        );
        Ok(())
    }
}

/// Forwards snapshots into a bounded channel. Applies backpressure to the
/// ingesting stream when the receiver falls behind.
pub struct ChannelObserver {
    tx: mpsc::Sender<AggregateSnapshot>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::Sender<AggregateSnapshot>) -> Self {
        Self { tx }
    }

    /// Convenience: observer plus its receiving end.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<AggregateSnapshot>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl Observer for ChannelObserver {
    fn name(&self) -> &'static str {
        "channel"
    }

    async fn observe(&self, snapshot: AggregateSnapshot) -> Result<()> {
        self.tx
            .send(snapshot)
            .await
            .map_err(|_| QuicMetricsError::Internal("observer channel closed".into()))
    }
}
