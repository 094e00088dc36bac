use super::TimeOrdered;
use crate::source::LogRecord;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Hosts that exchanged at least one record with `host` inside `[start, end]`.
///
/// The window is located through the set's ordering, so only records inside it
/// are visited. An inverted window returns an empty set.
pub fn connected_hosts<S: TimeOrdered + ?Sized>(
    set: &S,
    host: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> BTreeSet<String> {
    peers_in(set.window(start, end), host)
}

/// Distinct peers of `host` across `records`, in either direction.
pub fn peers_in<'a>(
    records: impl IntoIterator<Item = &'a LogRecord>,
    host: &str,
) -> BTreeSet<String> {
    records
        .into_iter()
        .filter_map(|record| record.peer_of(host))
        .map(str::to_string)
        .collect()
}
