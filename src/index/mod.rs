pub mod live;
pub mod ordered;
pub mod query;

use crate::source::LogRecord;
use chrono::{DateTime, Utc};

pub use live::{LiveLogSet, SharedLogSet};
pub use ordered::{build_from_path, build_from_reader, IndexError, OrderedLogSet};
pub use query::{connected_hosts, peers_in};

/// A record collection kept in non-decreasing timestamp order.
pub trait TimeOrdered {
    /// Records with `start <= timestamp <= end`, ascending, ties in arrival order.
    ///
    /// An inverted window (`start > end`) yields nothing.
    fn window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Box<dyn Iterator<Item = &LogRecord> + '_>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
