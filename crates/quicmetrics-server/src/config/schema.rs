use std::net::SocketAddr;

use serde::Deserialize;
use quicmetrics_core::error::{QuicMetricsError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub version: u32,

    #[serde(default)]
    pub ingest: IngestSection,

    #[serde(default)]
    pub http: HttpSection,

    #[serde(default)]
    pub aggregate: AggregateSection,

    #[serde(default)]
    pub observers: ObserversSection,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(QuicMetricsError::UnsupportedVersion);
        }

        self.ingest.validate()?;
        self.http.validate()?;

        if self.http.enabled && self.http.listen_addr()? == self.ingest.listen_addr()? {
            return Err(QuicMetricsError::Config(
                "http.listen must differ from ingest.listen".into(),
            ));
        }

        Ok(())
    }
}

fn parse_addr(field: &str, s: &str) -> Result<SocketAddr> {
    s.parse()
        .map_err(|e| QuicMetricsError::Config(format!("{field} must be a valid SocketAddr: {e}")))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngestSection {
    #[serde(default = "default_ingest_listen")]
    pub listen: String,

    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,

    /// Write every received line back to its sender.
    #[serde(default)]
    pub echo: bool,
}

impl Default for IngestSection {
    fn default() -> Self {
        Self {
            listen: default_ingest_listen(),
            max_line_bytes: default_max_line_bytes(),
            echo: false,
        }
    }
}

impl IngestSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;
        if !(64..=1_048_576).contains(&self.max_line_bytes) {
            return Err(QuicMetricsError::Config(
                "ingest.max_line_bytes must be between 64 and 1048576".into(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        parse_addr("ingest.listen", &self.listen)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_http_listen")]
    pub listen: String,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            enabled: true,
            listen: default_http_listen(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl HttpSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;
        if !(64..=16_777_216).contains(&self.max_body_bytes) {
            return Err(QuicMetricsError::Config(
                "http.max_body_bytes must be between 64 and 16777216".into(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        parse_addr("http.listen", &self.listen)
    }
}

/// What to do when an observation's type disagrees with the recorded type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeMismatchPolicy {
    /// Keep the recorded type and apply the value under its merge rule.
    #[default]
    Coerce,
    /// Refuse the observation.
    Reject,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AggregateSection {
    #[serde(default)]
    pub on_type_mismatch: TypeMismatchPolicy,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObserversSection {
    /// Log every post-merge snapshot.
    #[serde(default = "default_true")]
    pub log: bool,
}

impl Default for ObserversSection {
    fn default() -> Self {
        Self { log: true }
    }
}

fn default_ingest_listen() -> String {
    "127.0.0.1:4242".into()
}
fn default_http_listen() -> String {
    "127.0.0.1:2223".into()
}
fn default_max_line_bytes() -> usize {
    8192
}
fn default_max_body_bytes() -> usize {
    65536
}
fn default_true() -> bool {
    true
}
