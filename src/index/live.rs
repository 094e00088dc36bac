use super::TimeOrdered;
use crate::source::LogRecord;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Handle to the live set shared between the ingestion and reporting tasks.
pub type SharedLogSet = Arc<RwLock<LiveLogSet>>;

/// Position of a record in the live set.
///
/// The arrival sequence number breaks timestamp ties so equal timestamps keep
/// insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct ArrivalKey {
    timestamp: DateTime<Utc>,
    seq: u64,
}

/// Growing, timestamp-ordered record set fed by live ingestion.
///
/// Insertion is O(log n) regardless of arrival order; the oldest record is
/// always at the front so pruning never scans.
#[derive(Debug, Default)]
pub struct LiveLogSet {
    entries: BTreeMap<ArrivalKey, LogRecord>,
    next_seq: u64,
}

impl LiveLogSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty set wrapped for sharing between tasks.
    pub fn shared() -> SharedLogSet {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Insert a record at its sorted position.
    pub fn insert(&mut self, record: LogRecord) {
        let key = ArrivalKey {
            timestamp: record.timestamp,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.entries.insert(key, record);
    }

    pub fn oldest(&self) -> Option<&LogRecord> {
        self.entries.first_key_value().map(|(_, record)| record)
    }

    pub fn newest(&self) -> Option<&LogRecord> {
        self.entries.last_key_value().map(|(_, record)| record)
    }

    pub fn pop_oldest(&mut self) -> Option<LogRecord> {
        self.entries.pop_first().map(|(_, record)| record)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogRecord> {
        self.entries.values()
    }
}

impl TimeOrdered for LiveLogSet {
    fn window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Box<dyn Iterator<Item = &LogRecord> + '_> {
        if start > end {
            return Box::new(std::iter::empty());
        }
        let lower = ArrivalKey {
            timestamp: start,
            seq: 0,
        };
        let upper = ArrivalKey {
            timestamp: end,
            seq: u64::MAX,
        };
        Box::new(self.entries.range(lower..=upper).map(|(_, record)| record))
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
