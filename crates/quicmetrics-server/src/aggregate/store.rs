use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;

use quicmetrics_core::error::MergeError;
use quicmetrics_core::statsd::{key_for, MetricKey, MetricRecord, MetricType, MetricValue, TagSet};

use crate::config::TypeMismatchPolicy;

/// Running state for one key. Only ever touched under the map's shard lock.
#[derive(Debug)]
struct AggregateEntry {
    metric_type: MetricType,
    value: MetricValue,
    tags: TagSet,
    updates: u64,
}

impl AggregateEntry {
    fn seed(record: MetricRecord) -> Self {
        let value = match record.metric_type {
            MetricType::Counter => MetricValue::Int(record.counter_delta()),
            _ => record.value,
        };
        Self {
            metric_type: record.metric_type,
            value,
            tags: record.tags,
            updates: 1,
        }
    }

    /// Apply under the recorded type's rule, whatever type the record declares.
    fn apply(&mut self, record: &MetricRecord) {
        self.value = match self.metric_type {
            MetricType::Counter => {
                MetricValue::Int(self.value.as_i64().saturating_add(record.counter_delta()))
            }
            _ => record.value,
        };
        self.updates += 1;
    }

    fn snapshot(&self, key: &MetricKey) -> AggregateSnapshot {
        AggregateSnapshot {
            key: key.clone(),
            name: key.name().to_string(),
            metric_type: self.metric_type.clone(),
            value: self.value,
            tags: self.tags.clone(),
            updates: self.updates,
        }
    }
}

/// Immutable copy of one entry, safe to hand out past the store's lock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateSnapshot {
    pub key: MetricKey,
    pub name: String,
    #[serde(rename = "type")]
    pub metric_type: MetricType,
    pub value: MetricValue,
    /// Tags as first observed.
    pub tags: TagSet,
    /// Number of observations merged into this entry.
    pub updates: u64,
}

/// Process-wide aggregate: `MetricKey -> AggregateEntry`.
///
/// Concurrency: `merge` holds the shard write lock for the key for the whole
/// read-modify-write and never awaits, so updates to one key are linearized
/// and a cancelled caller can never leave a half-applied value. Entries are
/// never removed.
pub struct AggregateStore {
    entries: DashMap<MetricKey, AggregateEntry>,
    on_type_mismatch: TypeMismatchPolicy,
}

impl AggregateStore {
    pub fn new(on_type_mismatch: TypeMismatchPolicy) -> Self {
        Self {
            entries: DashMap::new(),
            on_type_mismatch,
        }
    }

    /// Merge one record and return the post-merge state of its key.
    pub fn merge(&self, record: MetricRecord) -> Result<AggregateSnapshot, MergeError> {
        let key = key_for(&record);

        match self.entries.entry(key) {
            Entry::Vacant(v) => {
                let r = v.insert(AggregateEntry::seed(record));
                let (key, entry) = r.pair();
                Ok(entry.snapshot(key))
            }
            Entry::Occupied(o) => {
                let mut r = o.into_ref();
                let (key, entry) = r.pair_mut();

                if entry.metric_type != record.metric_type {
                    match self.on_type_mismatch {
                        TypeMismatchPolicy::Reject => {
                            return Err(MergeError::TypeMismatch {
                                key: key.to_string(),
                                existing: entry.metric_type.clone(),
                                incoming: record.metric_type,
                            });
                        }
                        TypeMismatchPolicy::Coerce => {
                            tracing::warn!(
                                %key,
                                existing = %entry.metric_type,
                                incoming = %record.metric_type,
                                "metric type mismatch, keeping recorded type"
                            );
                        }
                    }
                }

                entry.apply(&record);
                Ok(entry.snapshot(key))
            }
        }
    }

    pub fn snapshot(&self, key: &MetricKey) -> Option<AggregateSnapshot> {
        self.entries.get(key).map(|r| r.value().snapshot(r.key()))
    }

    /// Every entry, sorted by key.
    pub fn snapshot_all(&self) -> Vec<AggregateSnapshot> {
        let mut all: Vec<AggregateSnapshot> = self
            .entries
            .iter()
            .map(|r| r.value().snapshot(r.key()))
            .collect();
        all.sort_by(|a, b| a.key.cmp(&b.key));
        all
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for AggregateStore {
    fn default() -> Self {
        Self::new(TypeMismatchPolicy::default())
    }
}
