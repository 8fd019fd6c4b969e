//! High-precision time and data quality primitives.
//!
//! All time arithmetic in the engine is integer arithmetic on [`Hpt`] values,
//! a count of fixed fractional-second ticks since the POSIX epoch. One second
//! is [`HPT_MODULUS`] ticks (microseconds). Sample periods, continuity
//! tolerances and trim boundaries are all expressed in the same unit so that
//! record comparisons never round through floating point.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};

/// High-precision timestamp: ticks of `1 / HPT_MODULUS` seconds since the epoch.
pub type Hpt = i64;

/// Number of ticks per second (microsecond resolution).
pub const HPT_MODULUS: i64 = 1_000_000;

/// Returns the sample period in ticks for the given sample rate.
///
/// A rate of zero (or less) yields a zero period, matching the convention for
/// records that carry no time series (headers-only, log channels).
pub fn sample_period(samprate: f64) -> Hpt {
    if samprate > 0.0 {
        (HPT_MODULUS as f64 / samprate) as Hpt
    } else {
        0
    }
}

/// Returns the continuity tolerance in ticks.
///
/// A negative `time_tol` selects the default of half a sample period;
/// otherwise the tolerance is `time_tol` seconds converted to ticks.
pub fn time_tolerance(time_tol: f64, samprate: f64) -> Hpt {
    if time_tol < 0.0 {
        sample_period(samprate) / 2
    } else {
        (time_tol * HPT_MODULUS as f64) as Hpt
    }
}

/// Returns true when two times are the same instant within tolerance.
pub fn within_time_tolerance(a: Hpt, b: Hpt, time_tol: f64, samprate: f64) -> bool {
    (a - b).abs() <= time_tolerance(time_tol, samprate)
}

/// Returns true when two sample rates describe the same series.
///
/// A negative `samp_rate_tol` selects the codec default: rates must agree
/// within `0.0001` of the higher rate. Otherwise the rates must differ by no
/// more than `samp_rate_tol`.
pub fn rate_tolerable(a: f64, b: f64, samp_rate_tol: f64) -> bool {
    if samp_rate_tol < 0.0 {
        (a - b).abs() <= 0.0001 * a.max(b)
    } else {
        (a - b).abs() <= samp_rate_tol
    }
}

/// Data quality indicator from a record header.
///
/// Quality is a single character with the total order Q > D > R; any other
/// character ranks below all three. Equality is on the raw character so that
/// two distinct unknown codes do not merge, which is why this type offers
/// [`Quality::cmp_priority`] instead of implementing `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Quality(u8);

impl Quality {
    /// Quality-controlled data.
    pub const Q: Quality = Quality(b'Q');
    /// Data-center-modified data.
    pub const D: Quality = Quality(b'D');
    /// Raw waveform data.
    pub const R: Quality = Quality(b'R');

    /// Creates a quality from its header character.
    pub fn new(code: char) -> Self {
        Self(code as u8)
    }

    /// Returns the header character.
    pub fn code(self) -> char {
        self.0 as char
    }

    /// Returns true for the characters valid in header byte 6.
    pub fn is_valid_indicator(self) -> bool {
        matches!(self.0, b'Q' | b'D' | b'R')
    }

    fn rank(self) -> u8 {
        match self.0 {
            b'Q' => 3,
            b'D' => 2,
            b'R' => 1,
            _ => 0,
        }
    }

    /// Compares two qualities by retention priority.
    ///
    /// `Ordering::Greater` means `self` outranks `other` and should be
    /// retained when pruning overlap.
    pub fn cmp_priority(self, other: Quality) -> Ordering {
        if self == other {
            Ordering::Equal
        } else {
            self.rank().cmp(&other.rank())
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Converts an Hpt timestamp to a UTC datetime.
///
/// Returns `None` for times outside chrono's representable range.
pub fn to_datetime(hpt: Hpt) -> Option<DateTime<Utc>> {
    Utc.timestamp_micros(hpt).single()
}

/// Converts a UTC datetime to an Hpt timestamp.
pub fn from_datetime(dt: &DateTime<Utc>) -> Hpt {
    dt.timestamp() * HPT_MODULUS + i64::from(dt.timestamp_subsec_micros())
}

/// Formats a time in the SEED style `YYYY,DDD,HH:MM:SS.FFFFFF`.
pub fn format_time(hpt: Hpt) -> String {
    match to_datetime(hpt) {
        Some(dt) => format!(
            "{:04},{:03},{:02}:{:02}:{:02}.{:06}",
            dt.year(),
            dt.ordinal(),
            dt.hour(),
            dt.minute(),
            dt.second(),
            dt.timestamp_subsec_micros()
        ),
        None => format!("[{hpt}]"),
    }
}

/// Parses a time string into an Hpt timestamp.
///
/// Accepts the SEED ordinal form `YYYY,DDD[,HH[:MM[:SS[.FFFFFF]]]]` and the
/// ISO-style form `YYYY-MM-DD[THH:MM:SS[.FFFFFF]]`.
pub fn parse_time(s: &str) -> Option<Hpt> {
    let s = s.trim();

    if s.contains(',') {
        return parse_ordinal_time(s);
    }

    let formats = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];
    for fmt in formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(from_datetime(&naive.and_utc()));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let naive = date.and_hms_opt(0, 0, 0)?;
        return Some(from_datetime(&naive.and_utc()));
    }

    None
}

fn parse_ordinal_time(s: &str) -> Option<Hpt> {
    let mut parts = s.splitn(3, ',');
    let year: i32 = parts.next()?.trim().parse().ok()?;
    let doy: u32 = parts.next()?.trim().parse().ok()?;
    let date = NaiveDate::from_yo_opt(year, doy)?;

    let (mut hour, mut min, mut sec, mut micros) = (0u32, 0u32, 0u32, 0u32);
    if let Some(clock) = parts.next() {
        let mut fields = clock.trim().splitn(3, ':');
        if let Some(h) = fields.next() {
            hour = h.parse().ok()?;
        }
        if let Some(m) = fields.next() {
            min = m.parse().ok()?;
        }
        if let Some(rest) = fields.next() {
            let mut secparts = rest.splitn(2, '.');
            sec = secparts.next()?.parse().ok()?;
            if let Some(frac) = secparts.next() {
                let digits: String = frac.chars().take(6).collect();
                let scale = 10u32.pow(6 - digits.len() as u32);
                micros = digits.parse::<u32>().ok()? * scale;
            }
        }
    }

    let naive = date.and_hms_micro_opt(hour, min, sec, micros)?;
    Some(from_datetime(&naive.and_utc()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_period() {
        assert_eq!(sample_period(1.0), HPT_MODULUS);
        assert_eq!(sample_period(40.0), 25_000);
        assert_eq!(sample_period(100.0), 10_000);
        assert_eq!(sample_period(0.0), 0);
        assert_eq!(sample_period(-1.0), 0);
    }

    #[test]
    fn test_time_tolerance_default_is_half_period() {
        assert_eq!(time_tolerance(-1.0, 100.0), 5_000);
        assert_eq!(time_tolerance(0.25, 100.0), 250_000);
        assert!(within_time_tolerance(1_000_000, 1_004_000, -1.0, 100.0));
        assert!(!within_time_tolerance(1_000_000, 1_006_000, -1.0, 100.0));
    }

    #[test]
    fn test_rate_tolerance() {
        assert!(rate_tolerable(40.0, 40.0, -1.0));
        assert!(rate_tolerable(40.0, 40.003, -1.0));
        assert!(!rate_tolerable(40.0, 40.5, -1.0));
        assert!(rate_tolerable(40.0, 40.5, 1.0));
    }

    #[test]
    fn test_quality_order() {
        assert_eq!(Quality::Q.cmp_priority(Quality::D), Ordering::Greater);
        assert_eq!(Quality::D.cmp_priority(Quality::R), Ordering::Greater);
        assert_eq!(Quality::R.cmp_priority(Quality::Q), Ordering::Less);
        assert_eq!(Quality::D.cmp_priority(Quality::D), Ordering::Equal);
        // Unknown codes rank below R but are not equal to each other.
        let x = Quality::new('X');
        let z = Quality::new('Z');
        assert_eq!(x.cmp_priority(Quality::R), Ordering::Less);
        assert_eq!(x.cmp_priority(z), Ordering::Equal);
        assert_ne!(x, z);
    }

    #[test]
    fn test_parse_iso_time() {
        let t = parse_time("2020-01-01T00:00:05").unwrap();
        assert_eq!(format_time(t), "2020,001,00:00:05.000000");

        let t = parse_time("2020-01-01T00:00:05.25").unwrap();
        assert_eq!(format_time(t), "2020,001,00:00:05.250000");

        let t = parse_time("2020-01-02").unwrap();
        assert_eq!(format_time(t), "2020,002,00:00:00.000000");
    }

    #[test]
    fn test_parse_ordinal_time() {
        let iso = parse_time("2020-02-01T12:30:00").unwrap();
        let ordinal = parse_time("2020,032,12:30:00").unwrap();
        assert_eq!(iso, ordinal);

        assert_eq!(
            parse_time("2020,001").unwrap(),
            parse_time("2020-01-01T00:00:00").unwrap()
        );
        assert!(parse_time("not a time").is_none());
    }

    #[test]
    fn test_datetime_roundtrip() {
        let t = parse_time("2020-06-15T13:45:30.123456").unwrap();
        let dt = to_datetime(t).unwrap();
        assert_eq!(from_datetime(&dt), t);
    }
}
