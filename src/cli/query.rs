use crate::cli::format::{format_query_result, QueryResult};
use crate::cli::CliError;
use crate::config::{expand_tilde, OutputFormat};
use crate::index::{build_from_path, connected_hosts, TimeOrdered};
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::{info, warn};

/// Index `path` and print the hosts `host` exchanged records with in `[start, end]`.
pub fn run(
    path: &Path,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    host: &str,
    format: OutputFormat,
) -> Result<(), CliError> {
    let result = query(path, start, end, host)?;
    println!("{}", format_query_result(&result, format)?);
    Ok(())
}

pub fn query(
    path: &Path,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    host: &str,
) -> Result<QueryResult, CliError> {
    if start > end {
        warn!(start = %start, end = %end, "Start is after end, result will be empty");
    }

    let set = build_from_path(&expand_tilde(path))?;
    let hosts = connected_hosts(&set, host, start, end);

    info!(
        host,
        records = set.len(),
        connected = hosts.len(),
        "Query complete"
    );

    Ok(QueryResult::new(host, start, end, hosts))
}
