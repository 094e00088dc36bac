use crate::config::MonitorConfig;
use crate::index::{LiveLogSet, SharedLogSet, TimeOrdered};
use crate::monitor::report::{generate_report, trailing_start, HostReport};
use crate::monitor::retention::RetentionPolicy;
use crate::source::{decode_line, ReaderError, TailReader};
use chrono::Utc;
use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("source reader error: {0}")]
    SourceReader(#[from] ReaderError),

    #[error("giving up after {attempts} consecutive read failures: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: ReaderError,
    },

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Counters reported when ingestion stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub lines_read: u64,
    pub records_inserted: u64,
    pub malformed_skipped: u64,
}

/// Owns the live log set and drives ingestion and periodic reporting over it.
pub struct Monitor {
    set: SharedLogSet,
    config: MonitorConfig,
    watched_host: String,
}

impl Monitor {
    pub fn new(watched_host: impl Into<String>, config: MonitorConfig) -> Self {
        Self {
            set: LiveLogSet::shared(),
            config,
            watched_host: watched_host.into(),
        }
    }

    /// Handle to the shared set, for inspection while the monitor runs.
    pub fn log_set(&self) -> SharedLogSet {
        self.set.clone()
    }

    pub fn watched_host(&self) -> &str {
        &self.watched_host
    }

    /// Tail `path` and emit a report on `reports` every report interval until
    /// `cancel` fires or ingestion fails.
    ///
    /// A file that cannot be opened fails immediately, before any task starts.
    pub async fn run(
        &self,
        path: &Path,
        reports: mpsc::Sender<HostReport>,
        cancel: CancellationToken,
    ) -> Result<IngestStats, MonitorError> {
        let mut reader = TailReader::new(path, self.config.start, self.config.poll_interval);
        reader.open()?;

        info!(
            path = %path.display(),
            watched_host = %self.watched_host,
            report_interval = ?self.config.report_interval,
            retention = ?self.config.retention,
            "Monitor started"
        );

        let tasks = cancel.child_token();

        let mut ingest_handle = tokio::spawn(run_ingestion(
            reader,
            self.set.clone(),
            self.config.poll_interval,
            self.config.max_read_retries,
            tasks.clone(),
        ));
        let mut report_handle = tokio::spawn(run_reporter(
            self.set.clone(),
            self.watched_host.clone(),
            self.config.clone(),
            reports,
            tasks.clone(),
        ));

        // Whichever task stops first takes the other one down with it
        let result = tokio::select! {
            result = &mut ingest_handle => {
                tasks.cancel();
                report_handle.await??;
                result?
            }
            result = &mut report_handle => {
                tasks.cancel();
                result??;
                ingest_handle.await?
            }
        };

        match &result {
            Ok(stats) => info!(
                lines_read = stats.lines_read,
                records_inserted = stats.records_inserted,
                malformed_skipped = stats.malformed_skipped,
                "Monitor stopped"
            ),
            Err(e) => error!(error = %e, "Monitor stopped with error"),
        }

        result
    }
}

/// Budget of consecutive read failures. Any successful read restores it.
#[derive(Debug)]
struct ReadRetries {
    consecutive: u32,
    max: u32,
}

impl ReadRetries {
    fn new(max: u32) -> Self {
        Self { consecutive: 0, max }
    }

    fn succeeded(&mut self) {
        self.consecutive = 0;
    }

    /// Returns `false` once the failures exceed the budget.
    fn failed(&mut self) -> bool {
        self.consecutive += 1;
        self.consecutive <= self.max
    }
}

/// Read lines from `reader` and insert each decoded record into `set`.
///
/// Malformed lines are logged and skipped. Read errors are retried after
/// `poll_interval` until `max_read_retries` consecutive failures.
pub async fn run_ingestion(
    reader: TailReader,
    set: SharedLogSet,
    poll_interval: Duration,
    max_read_retries: u32,
    cancel: CancellationToken,
) -> Result<IngestStats, MonitorError> {
    let mut stats = IngestStats::default();
    let mut retries = ReadRetries::new(max_read_retries);

    let lines = reader.into_stream();
    tokio::pin!(lines);

    info!("Ingestion started");

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            next = lines.next() => next,
        };
        let Some(next) = next else {
            break;
        };

        let line = match next {
            Ok(line) => {
                retries.succeeded();
                line
            }
            Err(e) => {
                if !retries.failed() {
                    return Err(MonitorError::RetriesExhausted {
                        attempts: retries.consecutive,
                        source: e,
                    });
                }
                warn!(
                    error = %e,
                    attempt = retries.consecutive,
                    max_retries = max_read_retries,
                    "Read failed, retrying"
                );
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = sleep(poll_interval) => continue,
                }
            }
        };

        stats.lines_read += 1;
        match decode_line(&line.text) {
            Ok(record) => {
                // Lock is held only for the insert itself
                set.write().await.insert(record);
                stats.records_inserted += 1;
            }
            Err(e) => {
                stats.malformed_skipped += 1;
                warn!(line_number = line.line_number, error = %e, "Skipping malformed record");
            }
        }
    }

    info!(
        records_inserted = stats.records_inserted,
        malformed_skipped = stats.malformed_skipped,
        "Ingestion stopped"
    );
    Ok(stats)
}

/// Every `report_interval`, prune expired records and send a report covering
/// the trailing `report_window`.
///
/// The first report is produced one full interval after start. Stops when
/// `cancel` fires or the report receiver is dropped.
pub async fn run_reporter(
    set: SharedLogSet,
    watched_host: String,
    config: MonitorConfig,
    reports: mpsc::Sender<HostReport>,
    cancel: CancellationToken,
) -> Result<(), MonitorError> {
    let policy = RetentionPolicy::new(config.retention);

    let mut ticker = interval_at(
        Instant::now() + config.report_interval,
        config.report_interval,
    );
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let now = Utc::now();
        let window_start = trailing_start(now, config.report_window);

        let (pruned, retained, report) = {
            let mut guard = set.write().await;
            let pruned = policy.prune(&mut guard, now);
            let report = generate_report(&*guard, &watched_host, window_start, now);
            (pruned, guard.len(), report)
        };

        debug!(
            pruned,
            retained,
            records_in_window = report.records_in_window,
            "Report generated"
        );

        if reports.send(report).await.is_err() {
            warn!("Report receiver closed, stopping reporter");
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReadStart;
    use std::io::Write;
    use tempfile::NamedTempFile;

    async fn wait_for_len(set: &SharedLogSet, expected: usize) {
        for _ in 0..500 {
            if set.read().await.len() >= expected {
                return;
            }
            sleep(Duration::from_millis(10)).await;
        }
        panic!("set never reached {} records", expected);
    }

    #[tokio::test]
    async fn test_ingestion_skips_malformed_lines() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "3000 c d").unwrap();
        writeln!(temp_file, "garbage").unwrap();
        writeln!(temp_file, "1000 a b").unwrap();
        temp_file.flush().unwrap();

        let set = LiveLogSet::shared();
        let cancel = CancellationToken::new();
        let reader = TailReader::new(
            temp_file.path(),
            ReadStart::Beginning,
            Duration::from_millis(10),
        );

        let handle = tokio::spawn(run_ingestion(
            reader,
            set.clone(),
            Duration::from_millis(10),
            3,
            cancel.clone(),
        ));

        wait_for_len(&set, 2).await;
        cancel.cancel();
        let stats = handle.await.unwrap().unwrap();

        assert_eq!(stats.lines_read, 3);
        assert_eq!(stats.records_inserted, 2);
        assert_eq!(stats.malformed_skipped, 1);

        let guard = set.read().await;
        let millis: Vec<i64> = guard.iter().map(|r| r.timestamp.timestamp_millis()).collect();
        assert_eq!(millis, vec![1000, 3000]);
    }

    #[tokio::test]
    async fn test_ingestion_picks_up_appended_lines() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "1000 a b").unwrap();
        temp_file.flush().unwrap();

        let set = LiveLogSet::shared();
        let cancel = CancellationToken::new();
        let reader = TailReader::new(
            temp_file.path(),
            ReadStart::Beginning,
            Duration::from_millis(10),
        );
        let handle = tokio::spawn(run_ingestion(
            reader,
            set.clone(),
            Duration::from_millis(10),
            3,
            cancel.clone(),
        ));

        wait_for_len(&set, 1).await;
        writeln!(temp_file, "500 z a").unwrap();
        temp_file.flush().unwrap();
        wait_for_len(&set, 2).await;

        cancel.cancel();
        handle.await.unwrap().unwrap();

        assert_eq!(set.read().await.oldest().unwrap().source, "z");
    }

    #[tokio::test]
    async fn test_ingestion_gives_up_when_source_vanishes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conn.log");
        std::fs::write(&path, "1000 a b\n").unwrap();

        let reader = TailReader::new(&path, ReadStart::Beginning, Duration::from_millis(10));
        // Removed before the first open: every attempt to open fails
        std::fs::remove_file(&path).unwrap();

        let result = run_ingestion(
            reader,
            LiveLogSet::shared(),
            Duration::from_millis(5),
            2,
            CancellationToken::new(),
        )
        .await;

        assert!(matches!(
            result,
            Err(MonitorError::RetriesExhausted { attempts: 3, .. })
        ));
    }

    #[test]
    fn test_read_retries_reset_on_success() {
        let mut retries = ReadRetries::new(2);

        assert!(retries.failed());
        assert!(retries.failed());
        retries.succeeded();
        // Four failures in total, but never more than two in a row
        assert!(retries.failed());
        assert!(retries.failed());
        assert!(!retries.failed());
        assert_eq!(retries.consecutive, 3);
    }

    #[tokio::test]
    async fn test_ingestion_recovers_when_source_appears() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conn.log");

        let set = LiveLogSet::shared();
        let cancel = CancellationToken::new();
        let reader = TailReader::new(&path, ReadStart::Beginning, Duration::from_millis(10));
        let handle = tokio::spawn(run_ingestion(
            reader,
            set.clone(),
            Duration::from_millis(20),
            10,
            cancel.clone(),
        ));

        // A few failed opens happen before the file exists
        sleep(Duration::from_millis(50)).await;
        std::fs::write(&path, "1000 a b\n2000 b c\n").unwrap();

        wait_for_len(&set, 2).await;
        cancel.cancel();
        let stats = handle.await.unwrap().unwrap();
        assert_eq!(stats.records_inserted, 2);
    }

    #[tokio::test]
    async fn test_reporter_prunes_and_reports() {
        let set = LiveLogSet::shared();
        let now = Utc::now();
        {
            let mut guard = set.write().await;
            guard.insert(crate::source::LogRecord::new(
                now - chrono::Duration::hours(3),
                "ancient",
                "watched",
            ));
            guard.insert(crate::source::LogRecord::new(
                now - chrono::Duration::minutes(90),
                "stale",
                "watched",
            ));
            guard.insert(crate::source::LogRecord::new(
                now - chrono::Duration::minutes(5),
                "watched",
                "peer",
            ));
        }

        let config = MonitorConfig {
            report_interval: Duration::from_millis(20),
            ..MonitorConfig::default()
        };
        let (tx, mut rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_reporter(
            set.clone(),
            "watched".to_string(),
            config,
            tx,
            cancel.clone(),
        ));

        let report = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        cancel.cancel();
        handle.await.unwrap().unwrap();

        assert_eq!(report.sent_to.len(), 1);
        assert!(report.sent_to.contains("peer"));
        // 90 minutes old: retained but outside the one hour window
        assert!(report.received_from.is_empty());
        assert_eq!(report.most_active.unwrap().host, "watched");

        let guard = set.read().await;
        assert_eq!(guard.len(), 2);
        assert_eq!(guard.oldest().unwrap().source, "stale");
    }

    #[tokio::test]
    async fn test_reporter_stops_when_receiver_dropped() {
        let config = MonitorConfig {
            report_interval: Duration::from_millis(10),
            ..MonitorConfig::default()
        };
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            run_reporter(
                LiveLogSet::shared(),
                "watched".to_string(),
                config,
                tx,
                CancellationToken::new(),
            ),
        )
        .await
        .expect("reporter should stop on its own");
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_run_fails_fast_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let monitor = Monitor::new("watched", MonitorConfig::default());
        let (tx, _rx) = mpsc::channel(1);

        let result = monitor
            .run(&dir.path().join("missing.log"), tx, CancellationToken::new())
            .await;

        assert!(matches!(
            result,
            Err(MonitorError::SourceReader(ReaderError::SourceUnavailable { .. }))
        ));
    }
}
