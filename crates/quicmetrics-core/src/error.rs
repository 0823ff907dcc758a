//! Shared error types across quicmetrics crates.

use thiserror::Error;

use crate::statsd::MetricType;

/// Stable error codes (used in HTTP responses and self-metric labels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Malformed metric line.
    ParseError,
    /// Observation disagrees with the recorded metric type.
    TypeMismatch,
    /// Stream read/write failure.
    Transport,
    /// Invalid configuration.
    Config,
    /// Unsupported config version.
    UnsupportedVersion,
    /// Internal server error.
    Internal,
}

impl ErrorCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::ParseError => "PARSE_ERROR",
            ErrorCode::TypeMismatch => "TYPE_MISMATCH",
            ErrorCode::Transport => "TRANSPORT",
            ErrorCode::Config => "CONFIG",
            ErrorCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Failure to turn one line into a [`MetricRecord`](crate::statsd::MetricRecord).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("missing metric name")]
    MissingName,
    #[error("invalid value: {0:?}")]
    InvalidValue(String),
    #[error("missing metric type")]
    MissingType,
    #[error("unknown metric type: {0:?}")]
    UnknownType(String),
    #[error("malformed tags: {0}")]
    MalformedTags(String),
    #[error("invalid sample rate: {0:?}")]
    InvalidSampleRate(String),
    #[error("line is not valid utf-8")]
    InvalidEncoding,
}

impl ParseError {
    /// Short label for per-kind error accounting.
    pub fn kind(&self) -> &'static str {
        match self {
            ParseError::MissingName => "missing_name",
            ParseError::InvalidValue(_) => "invalid_value",
            ParseError::MissingType => "missing_type",
            ParseError::UnknownType(_) => "unknown_type",
            ParseError::MalformedTags(_) => "malformed_tags",
            ParseError::InvalidSampleRate(_) => "invalid_sample_rate",
            ParseError::InvalidEncoding => "invalid_encoding",
        }
    }
}

/// Failure to apply a record to the aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error("type mismatch for {key}: recorded {existing}, got {incoming}")]
    TypeMismatch {
        key: String,
        existing: MetricType,
        incoming: MetricType,
    },
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, QuicMetricsError>;

/// Unified error type used by core and server.
#[derive(Debug, Error)]
pub enum QuicMetricsError {
    #[error("parse: {0}")]
    Parse(#[from] ParseError),
    #[error("merge: {0}")]
    Merge(#[from] MergeError),
    #[error("transport: {0}")]
    Transport(String),
    #[error("config: {0}")]
    Config(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl QuicMetricsError {
    /// Map an error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            QuicMetricsError::Parse(_) => ErrorCode::ParseError,
            QuicMetricsError::Merge(_) => ErrorCode::TypeMismatch,
            QuicMetricsError::Transport(_) => ErrorCode::Transport,
            QuicMetricsError::Config(_) => ErrorCode::Config,
            QuicMetricsError::UnsupportedVersion => ErrorCode::UnsupportedVersion,
            QuicMetricsError::Internal(_) => ErrorCode::Internal,
        }
    }
}

impl From<std::io::Error> for QuicMetricsError {
    fn from(e: std::io::Error) -> Self {
        QuicMetricsError::Transport(e.to_string())
    }
}
