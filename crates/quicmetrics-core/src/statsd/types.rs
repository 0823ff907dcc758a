//! Typed metric observations.

use std::fmt;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Metric type as declared by the `|type` segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MetricType {
    /// `c`: successive observations are summed.
    Counter,
    /// `g`: successive observations replace each other.
    Gauge,
    /// Any other recognised StatsD type (`ms`, `h`, `s`, `d`), passed through
    /// with last-write-wins semantics.
    Other(String),
}

impl MetricType {
    /// Recognised non-counter, non-gauge tokens.
    pub const PASSTHROUGH: [&'static str; 4] = ["ms", "h", "s", "d"];

    /// Resolve a type token. Returns `None` for unknown tokens.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "c" => Some(MetricType::Counter),
            "g" => Some(MetricType::Gauge),
            t if Self::PASSTHROUGH.contains(&t) => Some(MetricType::Other(t.to_string())),
            _ => None,
        }
    }

    /// Wire token.
    pub fn as_str(&self) -> &str {
        match self {
            MetricType::Counter => "c",
            MetricType::Gauge => "g",
            MetricType::Other(t) => t.as_str(),
        }
    }

    pub fn is_counter(&self) -> bool {
        matches!(self, MetricType::Counter)
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MetricType {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

/// Observed value. Counters always carry `Int`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Int(i64),
    Float(f64),
}

impl MetricValue {
    pub fn as_f64(self) -> f64 {
        match self {
            MetricValue::Int(i) => i as f64,
            MetricValue::Float(f) => f,
        }
    }

    /// Integral view; floats are rounded and saturate at the i64 bounds.
    pub fn as_i64(self) -> i64 {
        match self {
            MetricValue::Int(i) => i,
            MetricValue::Float(f) => f.round() as i64,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Int(i) => write!(f, "{i}"),
            MetricValue::Float(v) => write!(f, "{v}"),
        }
    }
}

/// Tags in first-observation order. Keys are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    pairs: Vec<(String, String)>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a tag. An existing key keeps its position and takes the new value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.pairs.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Pairs sorted by key.
    pub fn sorted(&self) -> Vec<(&str, &str)> {
        let mut v: Vec<(&str, &str)> = self.iter().collect();
        v.sort_unstable();
        v
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TagSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tags = TagSet::new();
        for (k, v) in iter {
            tags.insert(k, v);
        }
        tags
    }
}

impl Serialize for TagSet {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = s.serialize_map(Some(self.pairs.len()))?;
        for (k, v) in &self.pairs {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// One parsed observation. Immutable once built; consumed by a single merge.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub name: String,
    pub metric_type: MetricType,
    pub value: MetricValue,
    /// `|@rate` segment, `1.0` when absent.
    pub sample_rate: f64,
    pub tags: TagSet,
}

impl MetricRecord {
    /// Counter contribution after sample-rate scaling.
    pub fn counter_delta(&self) -> i64 {
        if self.sample_rate >= 1.0 {
            return self.value.as_i64();
        }
        (self.value.as_f64() / self.sample_rate).round() as i64
    }
}
