//! Server config loader (strict parsing).

pub mod schema;

use std::fs;

use quicmetrics_core::error::{QuicMetricsError, Result};

pub use schema::{
    AggregateSection, HttpSection, IngestSection, ObserversSection, ServerConfig,
    TypeMismatchPolicy,
};

pub fn load_from_file(path: &str) -> Result<ServerConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| QuicMetricsError::Config(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ServerConfig> {
    let cfg: ServerConfig = serde_yaml::from_str(s)
        .map_err(|e| QuicMetricsError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
