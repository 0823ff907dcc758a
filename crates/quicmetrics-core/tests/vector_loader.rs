//! JSON test vector loader shared by the line-format tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct TestVector {
    pub description: String,
    pub line: String,
    #[serde(default)]
    pub expect: Option<ExpectRecord>,
    #[serde(default)]
    pub expect_error: Option<ExpectError>,
}

#[derive(Debug, Deserialize)]
pub struct ExpectRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub metric_type: String,
    pub value: serde_json::Value,
    pub sample_rate: f64,
    pub tags: Vec<(String, String)>,
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct ExpectError {
    pub kind: String,
}

pub fn load(name: &str) -> TestVector {
    let path = format!("{}/tests/vectors/{name}", env!("CARGO_MANIFEST_DIR"));
    let s = std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("read {path}: {e}"));
    serde_json::from_str(&s).unwrap_or_else(|e| panic!("parse {path}: {e}"))
}
