//! Stream Ingestion Loop behaviour over in-memory streams.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use quicmetrics_core::statsd::{key_for, parse_line, MetricValue};
use quicmetrics_server::app_state::AppState;
use quicmetrics_server::config;
use quicmetrics_server::ingest::run_stream;
use quicmetrics_server::observe::ChannelObserver;

fn state(extra: &str) -> AppState {
    let yaml = format!("version: 1\nhttp:\n  enabled: false\nobservers:\n  log: false\n{extra}");
    AppState::new(config::load_from_str(&yaml).unwrap()).unwrap()
}

fn no_echo() -> Option<tokio::io::Sink> {
    None
}

#[tokio::test]
async fn same_tags_on_one_stream_accumulate() {
    let app = state("");
    let data: &[u8] = b"users.online:1|c|#country:china,city:beijing\nusers.online:2|c|#country:china,city:beijing\n";

    let stats = run_stream(&app, "test", data, no_echo()).await.unwrap();
    assert_eq!(stats.lines, 2);
    assert_eq!(stats.merged, 2);

    let key = key_for(&parse_line("users.online:0|c|#country:china,city:beijing").unwrap());
    let snap = app.store().snapshot(&key).unwrap();
    assert_eq!(snap.value, MetricValue::Int(3));
    assert_eq!(snap.tags.get("country"), Some("china"));
    assert_eq!(snap.tags.get("city"), Some("beijing"));
    assert_eq!(snap.tags.len(), 2);
}

#[tokio::test]
async fn different_tags_stay_apart() {
    let app = state("");
    let data: &[u8] = b"users.online:1|c|#country:usa\nusers.online:2|c|#country:china\n";
    run_stream(&app, "test", data, no_echo()).await.unwrap();

    let all = app.store().snapshot_all();
    assert_eq!(all.len(), 2);
    let usa = all.iter().find(|s| s.tags.get("country") == Some("usa")).unwrap();
    let china = all.iter().find(|s| s.tags.get("country") == Some("china")).unwrap();
    assert_eq!(usa.value, MetricValue::Int(1));
    assert_eq!(china.value, MetricValue::Int(2));
}

#[tokio::test]
async fn malformed_lines_do_not_end_the_stream() {
    let app = state("");
    let data: &[u8] = b"noop\nhits:1|c\nhits:x|c\n\nhits:nope\nhits:2|c\nhits:1|zz\nhits:4|c";

    let stats = run_stream(&app, "test", data, no_echo()).await.unwrap();
    assert_eq!(stats.lines, 7);
    assert_eq!(stats.merged, 3);
    assert_eq!(stats.parse_errors, 4);

    let key = key_for(&parse_line("hits:0|c").unwrap());
    assert_eq!(app.store().snapshot(&key).unwrap().value, MetricValue::Int(7));

    let metrics = app.metrics();
    assert_eq!(metrics.parse_errors.get(&[("kind", "missing_name")]), 1);
    assert_eq!(metrics.parse_errors.get(&[("kind", "invalid_value")]), 1);
    assert_eq!(metrics.parse_errors.get(&[("kind", "missing_type")]), 1);
    assert_eq!(metrics.parse_errors.get(&[("kind", "unknown_type")]), 1);
    assert_eq!(metrics.lines_accepted.get(&[("transport", "test")]), 3);
    assert_eq!(metrics.streams_active.get(&[("transport", "test")]), 0);
}

#[tokio::test]
async fn overlong_line_is_counted_and_skipped() {
    let app = state("ingest:\n  max_line_bytes: 64\n");
    let data = format!("a:1|c\n{}:1|c\na:1|c\n", "n".repeat(200));

    let stats = run_stream(&app, "test", data.as_bytes(), no_echo()).await.unwrap();
    assert_eq!(stats.merged, 2);
    assert_eq!(stats.parse_errors, 1);
    assert_eq!(app.metrics().parse_errors.get(&[("kind", "line_too_long")]), 1);
}

#[tokio::test]
async fn type_mismatch_rejected_when_configured() {
    let app = state("aggregate:\n  on_type_mismatch: reject\n");
    let data: &[u8] = b"x:1|c\nx:5|g\nx:2|c\n";

    let stats = run_stream(&app, "test", data, no_echo()).await.unwrap();
    assert_eq!(stats.merged, 2);
    assert_eq!(stats.merge_errors, 1);

    let key = key_for(&parse_line("x:0|c").unwrap());
    assert_eq!(app.store().snapshot(&key).unwrap().value, MetricValue::Int(3));
}

#[tokio::test]
async fn observers_see_every_post_merge_snapshot() {
    let app = state("");
    let (observer, mut rx) = ChannelObserver::channel(16);
    app.observers().register(Arc::new(observer));

    let data: &[u8] = b"hits:1|c\nbad\nhits:2|c\n";
    run_stream(&app, "test", data, no_echo()).await.unwrap();

    let first = rx.recv().await.unwrap();
    let second = rx.recv().await.unwrap();
    assert_eq!(first.value, MetricValue::Int(1));
    assert_eq!(second.value, MetricValue::Int(3));
    assert_eq!(second.updates, 2);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn echo_writes_lines_back() {
    let app = state("ingest:\n  echo: true\n");
    let (client, server) = tokio::io::duplex(1024);
    let (server_rd, server_wr) = tokio::io::split(server);
    let (mut client_rd, mut client_wr) = tokio::io::split(client);

    let task = {
        let app = app.clone();
        tokio::spawn(async move { run_stream(&app, "test", server_rd, Some(server_wr)).await })
    };

    client_wr.write_all(b"a:1|c\nnoop\n").await.unwrap();
    client_wr.shutdown().await.unwrap();

    let mut echoed = Vec::new();
    client_rd.read_to_end(&mut echoed).await.unwrap();
    assert_eq!(echoed, b"a:1|c\nnoop\n");

    let stats = task.await.unwrap().unwrap();
    assert_eq!(stats.merged, 1);
    assert_eq!(stats.parse_errors, 1);
}
