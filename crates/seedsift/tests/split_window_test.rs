//! Boundary splitting, time windows and identifier filters.

mod common;

use common::{read_records, t, write_records, RecordSpec};
use regex::Regex;
use seedsift::{PruneMode, SelectConfig, Session, SplitBoundary};
use tempfile::TempDir;

/// A record straddling midnight splits into a piece ending at 23:59:59 and
/// a piece starting at 00:00:00.
#[test]
fn test_day_split() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.mseed");
    let output = dir.path().join("out.mseed");

    write_records(
        &input,
        &[RecordSpec {
            start: t("2020-01-01T23:59:55"),
            numsamples: 11,
            ..Default::default()
        }],
    );

    let config = SelectConfig::default()
        .with_split(SplitBoundary::Day)
        .with_output_file(&output);
    let mut session = Session::new(config);
    session.add_file(&input);
    session.read_files().unwrap();
    session.process().unwrap();

    let records = read_records(&output);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].start, t("2020-01-01T23:59:55"));
    assert_eq!(records[0].end, t("2020-01-01T23:59:59"));
    assert_eq!(records[0].numsamples, 5);
    assert_eq!(records[1].start, t("2020-01-02T00:00:00"));
    assert_eq!(records[1].numsamples, 6);
    assert_eq!(records[1].first_sample, 5);

    assert_eq!(session.files().get(0).split_count, 1);
}

/// Boundary property: with day splitting no emitted record spans midnight.
#[test]
fn test_no_record_spans_midnight() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.mseed");
    let output = dir.path().join("out.mseed");

    // Two records, each crossing its own midnight.
    write_records(
        &input,
        &[
            RecordSpec {
                start: t("2020-01-01T23:59:00"),
                numsamples: 120,
                ..Default::default()
            },
            RecordSpec {
                start: t("2020-01-02T23:59:30"),
                numsamples: 60,
                base: 500,
                ..Default::default()
            },
        ],
    );

    let config = SelectConfig::default()
        .with_split(SplitBoundary::Day)
        .with_output_file(&output);
    let mut session = Session::new(config);
    session.add_file(&input);
    session.read_files().unwrap();
    session.process().unwrap();

    for rec in read_records(&output) {
        let start_day = rec.start / (86_400 * 1_000_000);
        let end_day = rec.end / (86_400 * 1_000_000);
        assert_eq!(start_day, end_day, "record spans a day boundary");
    }
}

/// Hour splitting with a long record produces one piece per hour.
#[test]
fn test_hour_split_pieces() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.mseed");
    let output = dir.path().join("out.mseed");

    // 0.1 Hz, 100 samples: spans 990 seconds after 12:55.
    write_records(
        &input,
        &[RecordSpec {
            start: t("2020-01-01T12:55:00"),
            samprate: 0.1,
            numsamples: 100,
            ..Default::default()
        }],
    );

    let config = SelectConfig::default()
        .with_split(SplitBoundary::Hour)
        .with_output_file(&output);
    let mut session = Session::new(config);
    session.add_file(&input);
    session.read_files().unwrap();
    session.process().unwrap();

    let records = read_records(&output);
    assert_eq!(records.len(), 2);
    assert!(records[0].end < t("2020-01-01T13:00:00"));
    assert_eq!(records[1].start, t("2020-01-01T13:00:00"));
}

/// Window plus match filter: only the matching channel survives, trimmed to
/// the window start under sample-level pruning.
#[test]
fn test_window_and_match_filter() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.mseed");
    let output = dir.path().join("out.mseed");

    write_records(
        &input,
        &[
            RecordSpec {
                chan: "BHZ",
                start: t("2020-01-01T00:00:00"),
                numsamples: 11,
                ..Default::default()
            },
            RecordSpec {
                chan: "LHZ",
                start: t("2020-01-01T00:00:00"),
                numsamples: 11,
                base: 500,
                ..Default::default()
            },
        ],
    );

    let config = SelectConfig::default()
        .with_prune(PruneMode::Sample)
        .with_window(Some(t("2020-01-01T00:00:05")), None)
        .with_match_regex(Regex::new("IU_.*_BHZ").unwrap())
        .with_output_file(&output);
    let mut session = Session::new(config);
    session.add_file(&input);
    let read = session.read_files().unwrap();
    assert_eq!(read.records, 1);

    session.process().unwrap();

    let records = read_records(&output);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].srcname, "IU_ANMO_00_BHZ");
    assert_eq!(records[0].start, t("2020-01-01T00:00:05"));
    assert_eq!(records[0].numsamples, 6);
}

/// The reject filter drops matching channels.
#[test]
fn test_reject_filter() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.mseed");
    let output = dir.path().join("out.mseed");

    write_records(
        &input,
        &[
            RecordSpec {
                chan: "BHZ",
                start: t("2020-01-01T00:00:00"),
                ..Default::default()
            },
            RecordSpec {
                chan: "LHZ",
                start: t("2020-01-01T00:00:00"),
                ..Default::default()
            },
        ],
    );

    let config = SelectConfig::default()
        .with_reject_regex(Regex::new("_LHZ_").unwrap())
        .with_output_file(&output);
    let mut session = Session::new(config);
    session.add_file(&input);
    session.read_files().unwrap();
    session.process().unwrap();

    let records = read_records(&output);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].srcname, "IU_ANMO_00_BHZ");
}

/// Records entirely outside the window disappear without touching traces.
#[test]
fn test_window_drops_outside_records() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.mseed");
    let output = dir.path().join("out.mseed");

    write_records(
        &input,
        &[
            RecordSpec {
                start: t("2020-01-01T00:00:00"),
                ..Default::default()
            },
            RecordSpec {
                start: t("2020-01-03T00:00:00"),
                base: 500,
                ..Default::default()
            },
        ],
    );

    let config = SelectConfig::default()
        .with_window(None, Some(t("2020-01-02T00:00:00")))
        .with_output_file(&output);
    let mut session = Session::new(config);
    session.add_file(&input);
    let read = session.read_files().unwrap();
    assert_eq!(read.records, 1);

    session.process().unwrap();
    assert_eq!(read_records(&output).len(), 1);
}

/// A quality restamp rewrites byte 6 of every output record.
#[test]
fn test_quality_restamp() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.mseed");
    let output = dir.path().join("out.mseed");

    write_records(
        &input,
        &[RecordSpec {
            quality: 'R',
            start: t("2020-01-01T00:00:00"),
            ..Default::default()
        }],
    );

    let config = SelectConfig::default()
        .with_restamp_quality('Q')
        .with_output_file(&output);
    let mut session = Session::new(config);
    session.add_file(&input);
    session.read_files().unwrap();
    session.process().unwrap();

    let records = read_records(&output);
    assert_eq!(records[0].quality, 'Q');
}
