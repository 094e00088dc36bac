use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub monitor: MonitorConfig,
    pub output: OutputConfig,
}

/// Settings for live monitoring of a growing log file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Wait between end-of-file checks while tailing.
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Period between rolling reports.
    #[serde(with = "humantime_serde")]
    pub report_interval: Duration,
    /// Trailing window each report covers.
    #[serde(with = "humantime_serde")]
    pub report_window: Duration,
    /// Records older than this are evicted before each report.
    #[serde(with = "humantime_serde")]
    pub retention: Duration,
    pub start: ReadStart,
    /// Consecutive read failures tolerated before the monitor gives up.
    pub max_read_retries: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            report_interval: Duration::from_secs(3600),
            report_window: Duration::from_secs(3600),
            retention: Duration::from_secs(2 * 3600),
            start: ReadStart::Beginning,
            max_read_retries: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadStart {
    Beginning,
    End,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
