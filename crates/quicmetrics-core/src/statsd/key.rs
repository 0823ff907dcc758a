//! Aggregation identity.
//!
//! A key is the metric name plus the tag set serialised in key order, so the
//! same tags in a different order (or with different spacing) always group
//! together. Names never contain `|` and tag keys never contain `:` or `,`,
//! which keeps the canonical form unambiguous.

use std::fmt;

use serde::{Serialize, Serializer};

use super::types::MetricRecord;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricKey {
    name: String,
    tags: String,
}

impl MetricKey {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical `k1:v1,k2:v2` form, empty when the metric has no tags.
    pub fn canonical_tags(&self) -> &str {
        &self.tags
    }
}

/// Derive the key for a record. Pure and total.
pub fn key_for(record: &MetricRecord) -> MetricKey {
    let tags = record
        .tags
        .sorted()
        .into_iter()
        .map(|(k, v)| format!("{k}:{v}"))
        .collect::<Vec<_>>()
        .join(",");

    MetricKey {
        name: record.name.clone(),
        tags,
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tags.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}|#{}", self.name, self.tags)
        }
    }
}

impl Serialize for MetricKey {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}
