//! Ingestion self-metrics and Prometheus text rendering.
//!
//! Counter/gauge vectors with dynamic labels backed by `DashMap`. Labels are
//! flattened into sorted key vectors to keep deterministic ordering. The
//! aggregate state is rendered next to the self-metrics so one scrape sees
//! both.

use std::collections::{BTreeMap, HashSet};
use std::fmt::Write;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use dashmap::DashMap;
use quicmetrics_core::statsd::MetricType;

use crate::aggregate::AggregateSnapshot;

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

/// Map an arbitrary string onto `[a-zA-Z0-9_]` (plus `:` for metric names).
fn sanitize(s: &str, allow_colon: bool) -> String {
    let mut out: String = s
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || (allow_colon && c == ':') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

fn label_key(labels: &[(&str, &str)]) -> Vec<(String, String)> {
    let mut key: Vec<(String, String)> = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    key.sort();
    key
}

fn render_labels(key: &[(String, String)]) -> String {
    if key.is_empty() {
        return String::new();
    }
    let inner = key
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",");
    format!("{{{inner}}}")
}

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<Vec<(String, String)>, AtomicU64>,
}

impl CounterVec {
    /// Increment by 1.
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.add(labels, 1);
    }

    /// Increment by an arbitrary value.
    pub fn add(&self, labels: &[(&str, &str)], v: u64) {
        let counter = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(v, Ordering::Relaxed);
    }

    /// Current value for one label set (0 if never touched).
    pub fn get(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Sum across all label sets.
    pub fn total(&self) -> u64 {
        self.map.iter().map(|r| r.value().load(Ordering::Relaxed)).sum()
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {} counter", name);
        for r in self.map.iter() {
            let val = r.value().load(Ordering::Relaxed);
            let _ = writeln!(out, "{}{} {}", name, render_labels(r.key()), val);
        }
    }
}

#[derive(Default)]
pub struct GaugeVec {
    map: DashMap<Vec<(String, String)>, AtomicI64>,
}

impl GaugeVec {
    pub fn inc(&self, labels: &[(&str, &str)]) { self.add(labels, 1); }
    pub fn dec(&self, labels: &[(&str, &str)]) { self.add(labels, -1); }

    /// Add an arbitrary signed delta.
    pub fn add(&self, labels: &[(&str, &str)], v: i64) {
        let gauge = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicI64::new(0));
        gauge.fetch_add(v, Ordering::Relaxed);
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> i64 {
        self.map
            .get(&label_key(labels))
            .map(|g| g.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {} gauge", name);
        for r in self.map.iter() {
            let val = r.value().load(Ordering::Relaxed);
            let _ = writeln!(out, "{}{} {}", name, render_labels(r.key()), val);
        }
    }
}

/// Prefix reserved for the server's own families.
const SELF_PREFIX: &str = "quicmetrics_";

/// Reasons an aggregate is left out of the exposition.
const SKIP_RESERVED_NAME: &str = "reserved_name";
const SKIP_TYPE_CONFLICT: &str = "type_conflict";
const SKIP_LABEL_CONFLICT: &str = "label_conflict";
const SKIP_DUPLICATE_SERIES: &str = "duplicate_series";
const SKIP_REASONS: [&str; 4] = [
    SKIP_RESERVED_NAME,
    SKIP_TYPE_CONFLICT,
    SKIP_LABEL_CONFLICT,
    SKIP_DUPLICATE_SERIES,
];

#[derive(Default)]
pub struct IngestMetrics {
    pub streams_accepted: CounterVec,
    pub streams_active: GaugeVec,
    pub lines_accepted: CounterVec,
    pub parse_errors: CounterVec,
    pub merge_rejections: CounterVec,
    pub observer_failures: CounterVec,
    pub transport_errors: CounterVec,
}

impl IngestMetrics {
    /// Render self-metrics followed by the aggregate state.
    pub fn render(&self, aggregates: &[AggregateSnapshot], draining: bool) -> String {
        let mut body = String::new();
        let skipped = render_aggregates(aggregates, &mut body);

        let mut out = String::new();
        self.streams_accepted.render("quicmetrics_streams_accepted_total", &mut out);
        self.streams_active.render("quicmetrics_streams_active", &mut out);
        self.lines_accepted.render("quicmetrics_lines_accepted_total", &mut out);
        self.parse_errors.render("quicmetrics_parse_errors_total", &mut out);
        self.merge_rejections.render("quicmetrics_merge_rejections_total", &mut out);
        self.observer_failures.render("quicmetrics_observer_failures_total", &mut out);
        self.transport_errors.render("quicmetrics_transport_errors_total", &mut out);
        let _ = writeln!(out, "# TYPE quicmetrics_draining gauge\nquicmetrics_draining {}", if draining { 1 } else { 0 });

        let _ = writeln!(out, "# TYPE quicmetrics_aggregates_unexported gauge");
        for reason in SKIP_REASONS {
            let n = skipped.get(reason).copied().unwrap_or(0);
            let _ = writeln!(out, "quicmetrics_aggregates_unexported{{reason=\"{reason}\"}} {n}");
        }

        out.push_str(&body);
        out
    }
}

fn prom_type(t: &MetricType) -> &'static str {
    match t {
        MetricType::Counter => "counter",
        MetricType::Gauge => "gauge",
        MetricType::Other(_) => "untyped",
    }
}

/// Aggregates grouped by sanitised name, one `# TYPE` line per family.
///
/// Samples whose sanitised name, type or labels collide with another sample
/// or with a self-metric are left out and counted per reason. Within a family
/// the first key in key order decides the type.
fn render_aggregates(
    aggregates: &[AggregateSnapshot],
    out: &mut String,
) -> BTreeMap<&'static str, u64> {
    let mut skipped: BTreeMap<&'static str, u64> = BTreeMap::new();
    let mut skip = |reason: &'static str, snap: &AggregateSnapshot| {
        tracing::debug!(key = %snap.key, reason, "aggregate left out of exposition");
        *skipped.entry(reason).or_default() += 1;
    };

    let mut families: BTreeMap<String, (&'static str, Vec<String>)> = BTreeMap::new();
    let mut seen: HashSet<String> = HashSet::new();
    for snap in aggregates {
        let name = sanitize(&snap.name, true);
        if name.starts_with(SELF_PREFIX) {
            skip(SKIP_RESERVED_NAME, snap);
            continue;
        }

        let mut labels: Vec<(String, String)> = snap
            .tags
            .sorted()
            .into_iter()
            .map(|(k, v)| (sanitize(k, false), v.to_string()))
            .collect();
        labels.sort();
        if labels.windows(2).any(|w| w[0].0 == w[1].0) {
            skip(SKIP_LABEL_CONFLICT, snap);
            continue;
        }

        let ty = prom_type(&snap.metric_type);
        let (family_ty, series) = families
            .entry(name.clone())
            .or_insert_with(|| (ty, Vec::new()));
        if *family_ty != ty {
            skip(SKIP_TYPE_CONFLICT, snap);
            continue;
        }

        let series_id = format!("{}{}", name, render_labels(&labels));
        if !seen.insert(series_id.clone()) {
            skip(SKIP_DUPLICATE_SERIES, snap);
            continue;
        }
        series.push(format!("{series_id} {}", snap.value));
    }

    for (name, (ty, series)) in families {
        let _ = writeln!(out, "# TYPE {} {}", name, ty);
        for line in series {
            let _ = writeln!(out, "{line}");
        }
    }
    skipped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::AggregateStore;
    use quicmetrics_core::statsd::parse_line;

    #[test]
    fn sanitize_names() {
        assert_eq!(sanitize("users.online", true), "users_online");
        assert_eq!(sanitize("ns:req-count", true), "ns:req_count");
        assert_eq!(sanitize("ns:x", false), "ns_x");
        assert_eq!(sanitize("9lives", true), "_9lives");
    }

    #[test]
    fn render_includes_aggregates() {
        let store = AggregateStore::default();
        store.merge(parse_line("users.online:3|c|#country:china").unwrap()).unwrap();
        store.merge(parse_line("cpu.load:0.5|g").unwrap()).unwrap();

        let m = IngestMetrics::default();
        m.lines_accepted.add(&[("transport", "tcp")], 2);
        m.parse_errors.inc(&[("kind", "missing_name")]);

        let text = m.render(&store.snapshot_all(), false);
        assert!(text.contains("quicmetrics_lines_accepted_total{transport=\"tcp\"} 2"));
        assert!(text.contains("quicmetrics_parse_errors_total{kind=\"missing_name\"} 1"));
        assert!(text.contains("# TYPE users_online counter"));
        assert!(text.contains("users_online{country=\"china\"} 3"));
        assert!(text.contains("# TYPE cpu_load gauge"));
        assert!(text.contains("cpu_load 0.5"));
        assert!(text.contains("quicmetrics_draining 0"));
    }

    fn count(text: &str, needle: &str) -> usize {
        text.lines().filter(|l| *l == needle).count()
    }

    #[test]
    fn colliding_aggregates_are_left_out() {
        let store = AggregateStore::default();
        for line in [
            "req.count:5|c",
            "req_count:0.5|g",
            "x:1|c|#a.b:1,a_b:2",
            "quicmetrics_streams_active:9|g",
            "hits.a:1|c",
            "hits_a:2|c",
        ] {
            store.merge(parse_line(line).unwrap()).unwrap();
        }

        let m = IngestMetrics::default();
        m.streams_active.inc(&[("transport", "tcp")]);
        let text = m.render(&store.snapshot_all(), true);

        assert_eq!(count(&text, "# TYPE req_count counter"), 1);
        assert!(!text.contains("# TYPE req_count gauge"));
        assert_eq!(count(&text, "req_count 5"), 1);
        assert!(!text.contains("req_count 0.5"));

        assert!(!text.contains("a_b=\"1\",a_b=\"2\""));
        assert!(!text.lines().any(|l| l.starts_with("x{")));

        assert_eq!(count(&text, "# TYPE quicmetrics_streams_active gauge"), 1);
        assert!(!text.contains("quicmetrics_streams_active 9"));

        assert_eq!(count(&text, "hits_a 1"), 1);
        assert!(!text.contains("hits_a 2"));

        for reason in SKIP_REASONS {
            let line = format!("quicmetrics_aggregates_unexported{{reason=\"{reason}\"}} 1");
            assert_eq!(count(&text, &line), 1, "reason={reason}");
        }
        assert!(text.contains("quicmetrics_draining 1"));

        // every family is declared once
        let mut types: Vec<&str> = text.lines().filter(|l| l.starts_with("# TYPE ")).collect();
        let declared = types.len();
        types.sort_unstable();
        types.dedup();
        assert_eq!(types.len(), declared);
    }

    #[test]
    fn counter_vec_label_order_is_irrelevant() {
        let c = CounterVec::default();
        c.inc(&[("a", "1"), ("b", "2")]);
        c.inc(&[("b", "2"), ("a", "1")]);
        assert_eq!(c.get(&[("a", "1"), ("b", "2")]), 2);
        assert_eq!(c.total(), 2);
    }
}
