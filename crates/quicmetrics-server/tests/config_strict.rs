#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use quicmetrics_server::config::{self, TypeMismatchPolicy};

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
ingest:
  listen: "127.0.0.1:4242"
  max_line_byts: 123 # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.code().as_str(), "CONFIG");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.ingest.listen, "127.0.0.1:4242");
    assert_eq!(cfg.ingest.max_line_bytes, 8192);
    assert!(!cfg.ingest.echo);
    assert!(cfg.http.enabled);
    assert_eq!(cfg.aggregate.on_type_mismatch, TypeMismatchPolicy::Coerce);
    assert!(cfg.observers.log);
}

#[test]
fn full_config() {
    let ok = r#"
version: 1
ingest:
  listen: "0.0.0.0:9125"
  max_line_bytes: 1024
  echo: true
http:
  enabled: false
  listen: "0.0.0.0:9102"
aggregate:
  on_type_mismatch: reject
observers:
  log: false
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert!(cfg.ingest.echo);
    assert!(!cfg.http.enabled);
    assert_eq!(cfg.aggregate.on_type_mismatch, TypeMismatchPolicy::Reject);
    assert!(!cfg.observers.log);
}

#[test]
fn unsupported_version() {
    let err = config::load_from_str("version: 2\n").expect_err("must fail");
    assert_eq!(err.code().as_str(), "UNSUPPORTED_VERSION");
}

#[test]
fn invalid_values_are_rejected() {
    let cases = [
        "version: 1\ningest:\n  listen: \"not-an-addr\"\n",
        "version: 1\ningest:\n  max_line_bytes: 1\n",
        "version: 1\nhttp:\n  max_body_bytes: 0\n",
        "version: 1\ningest:\n  listen: \"127.0.0.1:7000\"\nhttp:\n  listen: \"127.0.0.1:7000\"\n",
        "version: 1\naggregate:\n  on_type_mismatch: explode\n",
    ];
    for c in cases {
        let err = config::load_from_str(c).expect_err(c);
        assert_eq!(err.code().as_str(), "CONFIG", "case={c}");
    }
}
