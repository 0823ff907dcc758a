//! StatsD line parsing (panic-free, no shared state).
//!
//! Recognised shape:
//!
//! ```text
//! <name>:<value>|<type>[|@<rate>][|#<k1>:<v1>,<k2>:<v2>,...]
//! ```
//!
//! Whitespace around every field is ignored. Segments after the type other than
//! `@rate` and `#tags` are skipped so extended DogStatsD fields do not break
//! ingestion.

use crate::error::ParseError;

use super::types::{MetricRecord, MetricType, MetricValue, TagSet};

/// Parse one text line.
pub fn parse_line(line: &str) -> Result<MetricRecord, ParseError> {
    let line = line.trim();
    let mut segments = line.split('|');

    // split() always yields at least one item
    let head = segments.next().unwrap_or_default();
    let (name, value_str) = head.split_once(':').ok_or(ParseError::MissingName)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(ParseError::MissingName);
    }

    let type_token = segments
        .next()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ParseError::MissingType)?;
    let metric_type = MetricType::from_token(type_token)
        .ok_or_else(|| ParseError::UnknownType(type_token.to_string()))?;

    let value = parse_value(value_str.trim(), &metric_type)?;

    let mut sample_rate = 1.0;
    let mut tags = TagSet::new();
    for segment in segments {
        let segment = segment.trim();
        if let Some(rate) = segment.strip_prefix('@') {
            sample_rate = parse_sample_rate(rate.trim())?;
        } else if let Some(list) = segment.strip_prefix('#') {
            tags = parse_tags(list)?;
        } else if !segment.is_empty() {
            tracing::debug!(segment, "ignoring unknown statsd segment");
        }
    }

    Ok(MetricRecord {
        name: name.to_string(),
        metric_type,
        value,
        sample_rate,
        tags,
    })
}

/// Parse one line from raw bytes.
pub fn parse_bytes(line: &[u8]) -> Result<MetricRecord, ParseError> {
    let s = std::str::from_utf8(line).map_err(|_| ParseError::InvalidEncoding)?;
    parse_line(s)
}

/// Parse every non-blank line of `buf`.
///
/// Both `\n` and `\r\n` line endings are accepted. The iterator keeps going
/// after an `Err`, so one bad line never hides the lines after it.
pub fn parse_all(buf: &[u8]) -> impl Iterator<Item = Result<MetricRecord, ParseError>> + '_ {
    buf.split(|b| *b == b'\n')
        .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
        .map(parse_bytes)
}

fn parse_value(s: &str, metric_type: &MetricType) -> Result<MetricValue, ParseError> {
    let invalid = || ParseError::InvalidValue(s.to_string());
    if s.is_empty() {
        return Err(invalid());
    }

    if let Ok(i) = s.parse::<i64>() {
        return Ok(MetricValue::Int(i));
    }
    if metric_type.is_counter() {
        return Err(invalid());
    }

    match s.parse::<f64>() {
        Ok(f) if f.is_finite() => Ok(MetricValue::Float(f)),
        _ => Err(invalid()),
    }
}

fn parse_sample_rate(s: &str) -> Result<f64, ParseError> {
    match s.parse::<f64>() {
        Ok(r) if r > 0.0 && r <= 1.0 => Ok(r),
        _ => Err(ParseError::InvalidSampleRate(s.to_string())),
    }
}

/// Tags are `key:value` pairs; a token without `:` is a flag tag with an empty value.
fn parse_tags(list: &str) -> Result<TagSet, ParseError> {
    let mut tags = TagSet::new();
    for token in list.split(',') {
        let token = token.trim();
        if token.is_empty() {
            return Err(ParseError::MalformedTags("empty tag".into()));
        }

        let (key, value) = match token.split_once(':') {
            Some((k, v)) => (k.trim(), v.trim()),
            None => (token, ""),
        };
        if key.is_empty() {
            return Err(ParseError::MalformedTags(format!("empty key in {token:?}")));
        }
        tags.insert(key, value);
    }
    Ok(tags)
}
