use crate::index::{LiveLogSet, TimeOrdered};
use crate::monitor::report::trailing_start;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::debug;

/// Maximum age of records kept in the live set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    max_age: Duration,
}

impl RetentionPolicy {
    pub fn new(max_age: Duration) -> Self {
        Self { max_age }
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Records strictly older than the returned instant are expired at `now`.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        trailing_start(now, self.max_age)
    }

    /// Evict expired records, returning how many were removed.
    pub fn prune(&self, set: &mut LiveLogSet, now: DateTime<Utc>) -> usize {
        prune_older_than(set, self.cutoff(now))
    }
}

/// Pop records off the front of `set` while they are older than `cutoff`.
///
/// Stops at the first record at or after the cutoff; nothing behind it is inspected.
pub fn prune_older_than(set: &mut LiveLogSet, cutoff: DateTime<Utc>) -> usize {
    let mut removed = 0;
    while set.oldest().is_some_and(|record| record.timestamp < cutoff) {
        set.pop_oldest();
        removed += 1;
    }

    if removed > 0 {
        debug!(removed, remaining = set.len(), cutoff = %cutoff, "Pruned expired records");
    }
    removed
}
