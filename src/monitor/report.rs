use crate::index::TimeOrdered;
use crate::source::LogRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

/// Source host with the most records in a report window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MostActive {
    pub host: String,
    pub connections: usize,
}

/// Activity summary for the watched host over a trailing window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostReport {
    pub watched_host: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    /// Hosts the watched host sent to.
    pub sent_to: BTreeSet<String>,
    /// Hosts that sent to the watched host.
    pub received_from: BTreeSet<String>,
    /// `None` when the window holds no records.
    pub most_active: Option<MostActive>,
    pub records_in_window: usize,
}

/// Start of the window of length `span` ending at `now`, clamped to the
/// earliest representable instant.
pub fn trailing_start(now: DateTime<Utc>, span: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(span)
        .ok()
        .and_then(|span| now.checked_sub_signed(span))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Summarise `[window_start, window_end]` of `set` for `watched_host`.
pub fn generate_report<S: TimeOrdered + ?Sized>(
    set: &S,
    watched_host: &str,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> HostReport {
    let mut sent_to = BTreeSet::new();
    let mut received_from = BTreeSet::new();
    let mut tally = SourceTally::default();

    for record in set.window(window_start, window_end) {
        if record.source == watched_host {
            sent_to.insert(record.destination.clone());
        }
        if record.destination == watched_host {
            received_from.insert(record.source.clone());
        }
        tally.add(record);
    }

    HostReport {
        watched_host: watched_host.to_string(),
        window_start,
        window_end,
        sent_to,
        received_from,
        records_in_window: tally.total,
        most_active: tally.most_active(),
    }
}

/// Most frequent source across `records`.
///
/// Records must be in ascending timestamp order; on equal counts the source
/// seen first wins.
pub fn most_active_source<'a>(
    records: impl IntoIterator<Item = &'a LogRecord>,
) -> Option<MostActive> {
    let mut tally = SourceTally::default();
    for record in records {
        tally.add(record);
    }
    tally.most_active()
}

#[derive(Default)]
struct SourceTally<'a> {
    // host -> (count, order of first appearance)
    counts: HashMap<&'a str, (usize, usize)>,
    total: usize,
}

impl<'a> SourceTally<'a> {
    fn add(&mut self, record: &'a LogRecord) {
        let first_seen = self.counts.len();
        let entry = self
            .counts
            .entry(record.source.as_str())
            .or_insert((0, first_seen));
        entry.0 += 1;
        self.total += 1;
    }

    fn most_active(&self) -> Option<MostActive> {
        self.counts
            .iter()
            .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
                count_a.cmp(count_b).then(first_b.cmp(first_a))
            })
            .map(|(host, (count, _))| MostActive {
                host: host.to_string(),
                connections: *count,
            })
    }
}
