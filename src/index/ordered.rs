use super::TimeOrdered;
use crate::source::{decode_line, DecodeError, LogRecord};
use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("source unavailable '{}': {source}", path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("read error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line_number}: {source}")]
    MalformedRecord {
        line_number: usize,
        #[source]
        source: DecodeError,
    },
}

/// Immutable, timestamp-sorted record set built from a finite input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderedLogSet {
    records: Vec<LogRecord>,
}

impl OrderedLogSet {
    /// Sort `records` by timestamp. The sort is stable, so records sharing a
    /// timestamp keep their input order.
    pub fn from_records(mut records: Vec<LogRecord>) -> Self {
        records.sort_by_key(|r| r.timestamp);
        Self { records }
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LogRecord> {
        self.records.iter()
    }

    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.records.first().map(|r| r.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.records.last().map(|r| r.timestamp)
    }

    /// Slice of records inside `[start, end]`, located by binary search.
    pub fn window_slice(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> &[LogRecord] {
        if start > end {
            return &[];
        }
        let lo = self.records.partition_point(|r| r.timestamp < start);
        let hi = self.records.partition_point(|r| r.timestamp <= end);
        &self.records[lo..hi]
    }
}

impl TimeOrdered for OrderedLogSet {
    fn window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Box<dyn Iterator<Item = &LogRecord> + '_> {
        Box::new(self.window_slice(start, end).iter())
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

impl<'a> IntoIterator for &'a OrderedLogSet {
    type Item = &'a LogRecord;
    type IntoIter = std::slice::Iter<'a, LogRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Read and index a whole log file.
///
/// The first line that fails to decode aborts the build.
pub fn build_from_path(path: &Path) -> Result<OrderedLogSet, IndexError> {
    let file = File::open(path).map_err(|source| IndexError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })?;

    let started = std::time::Instant::now();
    let set = build_from_reader(BufReader::new(file)).map_err(|e| match e {
        IndexError::Io(source) => IndexError::SourceUnavailable {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })?;

    info!(
        path = %path.display(),
        records = set.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Indexed log file"
    );

    Ok(set)
}

/// Decode every line of `reader` and return the sorted set.
///
/// Lines that are not valid UTF-8 are reported as malformed, not as read errors.
pub fn build_from_reader<R: BufRead>(mut reader: R) -> Result<OrderedLogSet, IndexError> {
    let mut records = Vec::new();
    let mut buf = Vec::new();
    let mut line_number = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_number += 1;

        let raw = buf.strip_suffix(b"\n").unwrap_or(&buf[..]);
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let line = std::str::from_utf8(raw).map_err(|_| IndexError::MalformedRecord {
            line_number,
            source: DecodeError::MalformedRecord {
                line: String::from_utf8_lossy(raw).into_owned(),
                reason: "invalid UTF-8".to_string(),
            },
        })?;

        let record = decode_line(line).map_err(|source| IndexError::MalformedRecord {
            line_number,
            source,
        })?;
        records.push(record);
    }

    debug!(count = records.len(), "Decoded records, sorting");
    Ok(OrderedLogSet::from_records(records))
}
