use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed record '{line}': {reason}")]
    MalformedRecord { line: String, reason: String },
}

impl DecodeError {
    fn malformed(line: &str, reason: impl Into<String>) -> Self {
        DecodeError::MalformedRecord {
            line: line.to_string(),
            reason: reason.into(),
        }
    }
}

/// One observed connection between two hosts.
///
/// Ordering inside the indexes is by `timestamp` only; the derived `PartialEq`
/// compares the full tuple and is what deduplication and tests rely on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub destination: String,
}

impl LogRecord {
    pub fn new(
        timestamp: DateTime<Utc>,
        source: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            source: source.into(),
            destination: destination.into(),
        }
    }

    /// Returns the peer of `host` in this record, if `host` took part in it.
    ///
    /// Self-loops yield `None`: a host is never its own peer.
    pub fn peer_of(&self, host: &str) -> Option<&str> {
        if self.source == host && self.destination != host {
            Some(&self.destination)
        } else if self.destination == host && self.source != host {
            Some(&self.source)
        } else {
            None
        }
    }
}

/// Decode one `<epoch-millis> <source-host> <dest-host>` line.
///
/// Fields after the third are ignored. Surrounding whitespace and a trailing
/// newline are tolerated.
pub fn decode_line(line: &str) -> Result<LogRecord, DecodeError> {
    let mut fields = line.split_whitespace();

    let (Some(millis), Some(source), Some(destination)) =
        (fields.next(), fields.next(), fields.next())
    else {
        return Err(DecodeError::malformed(
            line.trim_end(),
            "expected 3 whitespace-separated fields",
        ));
    };

    let timestamp = parse_epoch_ms(millis)
        .map_err(|reason| DecodeError::malformed(line.trim_end(), reason))?;

    Ok(LogRecord::new(timestamp, source, destination))
}

/// Convert integer epoch milliseconds into a UTC instant, keeping millisecond precision.
pub fn parse_epoch_ms(value: &str) -> Result<DateTime<Utc>, String> {
    let millis: i64 = value.parse().map_err(|e: std::num::ParseIntError| {
        format!("timestamp '{}' is not an integer: {}", value, e)
    })?;

    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| format!("timestamp '{}' out of range", value))
}
