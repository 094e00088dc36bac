use crate::config::OutputFormat;
use crate::monitor::HostReport;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::value::StrDeserializer;
use serde::de::IntoDeserializer;
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Duration;

/// Result of a static window query, as handed to the printer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryResult {
    pub host: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub connected_hosts: BTreeSet<String>,
    pub count: usize,
}

impl QueryResult {
    pub fn new(
        host: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        connected_hosts: BTreeSet<String>,
    ) -> Self {
        Self {
            host: host.to_string(),
            start,
            end,
            count: connected_hosts.len(),
            connected_hosts,
        }
    }
}

/// Parse an ISO-8601 instant. Values without an offset are taken as UTC.
pub fn parse_instant(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }

    Err(format!(
        "invalid ISO-8601 datetime '{}' (e.g. 2021-01-01T00:00:00Z)",
        value
    ))
}

/// Parse a human-readable duration such as `30m` or `1h 30m`.
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    let deserializer: StrDeserializer<'_, serde::de::value::Error> = value.into_deserializer();
    let duration: Duration = humantime_serde::deserialize(deserializer)
        .map_err(|e| format!("invalid duration '{}': {}", value, e))?;
    if duration.is_zero() {
        return Err("duration must be greater than zero".to_string());
    }
    Ok(duration)
}

fn join_hosts(hosts: &BTreeSet<String>) -> String {
    if hosts.is_empty() {
        "(none)".to_string()
    } else {
        hosts.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}

pub fn format_query_result(
    result: &QueryResult,
    format: OutputFormat,
) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(result),
        OutputFormat::Text => Ok(format!(
            "Connected hosts ({}): {}",
            result.count,
            join_hosts(&result.connected_hosts)
        )),
    }
}

pub fn format_report(
    report: &HostReport,
    format: OutputFormat,
) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Json => serde_json::to_string(report),
        OutputFormat::Text => {
            let host = &report.watched_host;
            let most_active = match &report.most_active {
                Some(active) => format!(
                    "Host with the most connections: {} with {} connections",
                    active.host, active.connections
                ),
                None => "No active connections in the window.".to_string(),
            };
            Ok(format!(
                "Report {} .. {}\n\
                 Hosts {} connected to: {}\n\
                 Hosts that connected to {}: {}\n\
                 {}",
                report.window_start.to_rfc3339(),
                report.window_end.to_rfc3339(),
                host,
                join_hosts(&report.sent_to),
                host,
                join_hosts(&report.received_from),
                most_active
            ))
        }
    }
}
