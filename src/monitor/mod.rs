pub mod report;
pub mod retention;
pub mod runner;

pub use report::{generate_report, most_active_source, HostReport, MostActive};
pub use retention::{prune_older_than, RetentionPolicy};
pub use runner::{run_ingestion, run_reporter, IngestStats, Monitor, MonitorError};
