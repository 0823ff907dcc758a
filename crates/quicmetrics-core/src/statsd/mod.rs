//! StatsD wire format: line parsing, typed records, and aggregation keys.
//!
//! All parsers are panic-free and hold no shared state: malformed input is
//! reported as [`ParseError`](crate::error::ParseError) so a single bad line can
//! be skipped without disturbing the rest of a stream.

mod key;
mod parser;
mod types;

pub use key::{key_for, MetricKey};
pub use parser::{parse_all, parse_bytes, parse_line};
pub use types::{MetricRecord, MetricType, MetricValue, TagSet};
