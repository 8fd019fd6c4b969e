//! Time-boundary splitting of record descriptors.
//!
//! When output records must not straddle day, hour or minute marks, a single
//! physical record is represented by several descriptors, each trimmed to one
//! side of a boundary. Only the index entries multiply; the record bytes are
//! split by the trimmer at write time.

use chrono::{DateTime, Duration, DurationRound, Utc};

use crate::config::SplitBoundary;
use crate::hpt::{self, Hpt};
use crate::select::record::RecordDesc;

/// Splits a descriptor at every boundary its span straddles.
///
/// Returns the fragments in time order; the first element is the input
/// descriptor, possibly with a tightened `new_end`. Fragments are never
/// degenerate: a piece that would hold less than one sample is not produced.
pub fn split_records(first: RecordDesc, boundary: SplitBoundary, samprate: f64) -> Vec<RecordDesc> {
    let period = hpt::sample_period(samprate);
    let mut out = vec![first];

    loop {
        let rec = out.last_mut().expect("fragment list starts non-empty");
        let eff_start = rec.eff_start();
        let Some(bound) = next_boundary(eff_start, boundary) else {
            break;
        };
        if bound >= rec.eff_end() {
            break;
        }
        // A head fragment shorter than one sample cannot be trimmed out.
        if bound - period <= eff_start {
            break;
        }

        let mut sibling = *rec;
        rec.new_end = Some(bound - period);
        sibling.new_start = Some(bound);
        out.push(sibling);
    }

    out
}

/// Returns the first boundary strictly after `t`, or `None` when the time is
/// not representable.
fn next_boundary(t: Hpt, boundary: SplitBoundary) -> Option<Hpt> {
    let dt = hpt::to_datetime(t)?;
    let next = match boundary {
        SplitBoundary::None => return None,
        SplitBoundary::Day => truncate(dt, Duration::days(1))? + Duration::days(1),
        SplitBoundary::Hour => truncate(dt, Duration::hours(1))? + Duration::hours(1),
        SplitBoundary::Minute => truncate(dt, Duration::minutes(1))? + Duration::minutes(1),
    };
    Some(hpt::from_datetime(&next))
}

fn truncate(dt: DateTime<Utc>, granularity: Duration) -> Option<DateTime<Utc>> {
    dt.duration_trunc(granularity).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hpt::Quality;

    fn desc(start: Hpt, end: Hpt) -> RecordDesc {
        RecordDesc::new(0, 0, 512, start, end, Quality::D)
    }

    fn t(s: &str) -> Hpt {
        hpt::parse_time(s).unwrap()
    }

    #[test]
    fn test_day_split() {
        // One record crossing midnight at 1 Hz.
        let rec = desc(t("2020-01-01T23:59:55"), t("2020-01-02T00:00:05"));
        let frags = split_records(rec, SplitBoundary::Day, 1.0);

        assert_eq!(frags.len(), 2);
        assert_eq!(frags[0].new_end, Some(t("2020-01-01T23:59:59")));
        assert_eq!(frags[1].new_start, Some(t("2020-01-02T00:00:00")));
        assert_eq!(frags[1].new_end, None);
        // Both fragments shadow the same physical record.
        assert_eq!(frags[0].offset, frags[1].offset);
    }

    #[test]
    fn test_multi_day_split() {
        let rec = desc(t("2020-01-01T12:00:00"), t("2020-01-04T12:00:00"));
        let frags = split_records(rec, SplitBoundary::Day, 1.0);

        assert_eq!(frags.len(), 4);
        assert_eq!(frags[1].new_start, Some(t("2020-01-02T00:00:00")));
        assert_eq!(frags[1].new_end, Some(t("2020-01-02T23:59:59")));
        assert_eq!(frags[3].new_start, Some(t("2020-01-04T00:00:00")));
    }

    #[test]
    fn test_no_split_within_boundary() {
        let rec = desc(t("2020-01-01T10:00:00"), t("2020-01-01T10:30:00"));
        let frags = split_records(rec, SplitBoundary::Day, 1.0);
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].new_end, None);

        let frags = split_records(rec, SplitBoundary::Hour, 1.0);
        assert_eq!(frags.len(), 1);
    }

    #[test]
    fn test_minute_split() {
        let rec = desc(t("2020-01-01T00:00:30"), t("2020-01-01T00:02:30"));
        let frags = split_records(rec, SplitBoundary::Minute, 1.0);

        assert_eq!(frags.len(), 3);
        assert_eq!(frags[0].new_end, Some(t("2020-01-01T00:00:59")));
        assert_eq!(frags[1].new_start, Some(t("2020-01-01T00:01:00")));
        assert_eq!(frags[1].new_end, Some(t("2020-01-01T00:01:59")));
        assert_eq!(frags[2].new_start, Some(t("2020-01-01T00:02:00")));
    }

    #[test]
    fn test_record_ending_on_boundary_not_split() {
        // The last sample lands exactly on midnight minus one period.
        let rec = desc(t("2020-01-01T23:59:00"), t("2020-01-01T23:59:59"));
        let frags = split_records(rec, SplitBoundary::Day, 1.0);
        assert_eq!(frags.len(), 1);
    }

    #[test]
    fn test_window_trim_respected() {
        // A window already trimmed the record to end before the boundary.
        let mut rec = desc(t("2020-01-01T23:00:00"), t("2020-01-02T01:00:00"));
        rec.new_end = Some(t("2020-01-01T23:30:00"));
        let frags = split_records(rec, SplitBoundary::Day, 1.0);
        assert_eq!(frags.len(), 1);
    }

    #[test]
    fn test_start_on_boundary_splits_at_next() {
        let rec = desc(t("2020-01-01T00:00:00"), t("2020-01-01T02:30:00"));
        let frags = split_records(rec, SplitBoundary::Hour, 1.0);

        assert_eq!(frags.len(), 3);
        assert_eq!(frags[0].new_start, None);
        assert_eq!(frags[0].new_end, Some(t("2020-01-01T00:59:59")));
        assert_eq!(frags[1].new_start, Some(t("2020-01-01T01:00:00")));
    }
}
