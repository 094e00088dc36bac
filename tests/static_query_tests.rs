//! Static mode: index a finished log file and answer window queries against it.

use chrono::{DateTime, TimeZone, Utc};
use hostwatch::cli::query::query;
use hostwatch::index::{
    build_from_path, connected_hosts, IndexError, OrderedLogSet, TimeOrdered,
};
use hostwatch::source::{DecodeError, LogRecord};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn sample_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/input-test.txt")
}

fn ts(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).unwrap()
}

#[test]
fn test_sample_file_order_matches_input() {
    let set = build_from_path(&sample_path()).unwrap();

    let expected = vec![
        LogRecord::new(ts(1565647204351), "Aadvik", "Matina"),
        LogRecord::new(ts(1565647205599), "Keimy", "Dmetri"),
        LogRecord::new(ts(1565647212986), "Tyreonna", "Rehgan"),
        LogRecord::new(ts(1565647228897), "Heera", "Eron"),
        LogRecord::new(ts(1565647246869), "Jeremyah", "Morrigan"),
        LogRecord::new(ts(1565647247170), "Khiem", "Tailee"),
    ];
    assert_eq!(set.records(), expected.as_slice());
}

#[test]
fn test_sample_file_query_aadvik() {
    let set = build_from_path(&sample_path()).unwrap();

    let hosts = connected_hosts(&set, "Aadvik", ts(1565647204351), ts(1565647247170));

    assert_eq!(hosts, BTreeSet::from(["Matina".to_string()]));
}

#[test]
fn test_query_entry_point_counts_hosts() {
    let result = query(
        &sample_path(),
        ts(1565647204351),
        ts(1565647247170),
        "Matina",
    )
    .unwrap();

    assert_eq!(result.count, 1);
    assert!(result.connected_hosts.contains("Aadvik"));
}

#[test]
fn test_query_outside_window_is_empty() {
    let set = build_from_path(&sample_path()).unwrap();

    // Aadvik's only record is at ...204351; a window starting 1ms later misses it
    assert!(connected_hosts(&set, "Aadvik", ts(1565647204352), ts(1565647247170)).is_empty());
    assert!(connected_hosts(&set, "Aadvik", ts(1565647247170), ts(1565647204351)).is_empty());
}

#[test]
fn test_unsorted_file_with_duplicates() {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file, "5000 hub spoke1").unwrap();
    writeln!(temp_file, "1000 spoke2 hub").unwrap();
    writeln!(temp_file, "3000 hub spoke1").unwrap();
    writeln!(temp_file, "3000 spoke3 hub").unwrap();
    writeln!(temp_file, "2000 other thing").unwrap();
    temp_file.flush().unwrap();

    let set = build_from_path(temp_file.path()).unwrap();
    let millis: Vec<i64> = set.iter().map(|r| r.timestamp.timestamp_millis()).collect();
    assert_eq!(millis, vec![1000, 2000, 3000, 3000, 5000]);
    // Equal timestamps keep file order
    assert_eq!(set.records()[2].destination, "spoke1");
    assert_eq!(set.records()[3].source, "spoke3");

    let hosts = connected_hosts(&set, "hub", ts(0), ts(10_000));
    assert_eq!(
        hosts,
        BTreeSet::from([
            "spoke1".to_string(),
            "spoke2".to_string(),
            "spoke3".to_string()
        ])
    );
}

#[test]
fn test_malformed_line_fails_whole_file() {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file, "1000 a b").unwrap();
    writeln!(temp_file, "2000 only-two").unwrap();
    writeln!(temp_file, "3000 c d").unwrap();
    temp_file.flush().unwrap();

    let err = build_from_path(temp_file.path()).unwrap_err();

    match &err {
        IndexError::MalformedRecord {
            line_number,
            source: DecodeError::MalformedRecord { line, .. },
        } => {
            assert_eq!(*line_number, 2);
            assert_eq!(line, "2000 only-two");
        }
        other => panic!("expected malformed record, got {:?}", other),
    }
    assert!(err.to_string().contains("2000 only-two"));
}

#[test]
fn test_missing_file_is_source_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let result = query(&dir.path().join("absent.log"), ts(0), ts(1), "a");

    assert!(matches!(
        result,
        Err(hostwatch::cli::CliError::Index(IndexError::SourceUnavailable { .. }))
    ));
}

#[test]
fn test_from_records_matches_file_build() {
    let built = build_from_path(&sample_path()).unwrap();
    let mut reversed: Vec<LogRecord> = built.records().to_vec();
    reversed.reverse();

    assert_eq!(OrderedLogSet::from_records(reversed), built);
    assert_eq!(built.len(), 6);
}
