//! Sample-accurate trimming of a single record.
//!
//! A descriptor carrying `new_start`/`new_end` marks is honored at write
//! time: the record is unpacked, samples outside the new span are dropped,
//! and the record is repacked in place over the scratch buffer. The repacked
//! record keeps its original length.

use tracing::{debug, error};

use crate::error::{Result, SiftError};
use crate::hpt::{self, HPT_MODULUS};
use crate::mseed;
use crate::select::record::RecordDesc;

/// Result of trimming one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimOutcome {
    /// The record was trimmed and repacked into the buffer.
    Trimmed,
    /// Trimming removed every sample; the record must be treated as deleted.
    Empty,
}

/// Trims the record in `buf[..rec.reclen]` to its `new_start`/`new_end`.
///
/// On success the buffer holds the repacked record of the same length. New
/// times violating the original span are an error and the buffer is left
/// unusable for writing; the caller skips the record.
pub fn trim_record(rec: &RecordDesc, buf: &mut [u8]) -> Result<TrimOutcome> {
    validate_marks(rec)?;

    let reclen = rec.reclen as usize;
    let mut unpacked = mseed::unpack(&buf[..reclen])?;
    let samprate = unpacked.header.samprate;

    if let Some(new_start) = rec.new_start {
        let drop = drop_count(new_start - rec.start, samprate);
        debug!("Removing {drop} samples from the start");
        unpacked.samples.drop_front(drop);
        unpacked.header.start = new_start;
    }

    if let Some(new_end) = rec.new_end {
        let drop = drop_count(rec.end - new_end, samprate);
        debug!("Removing {drop} samples from the end");
        unpacked.samples.drop_back(drop);
    }

    if unpacked.samples.is_empty() {
        return Ok(TrimOutcome::Empty);
    }

    let mut written = false;
    mseed::pack(&unpacked, |bytes| {
        buf[..bytes.len()].copy_from_slice(bytes);
        written = true;
    })?;
    debug_assert!(written, "pack yields exactly one record on success");

    Ok(TrimOutcome::Trimmed)
}

/// Number of samples covered by a tick interval, rounded to nearest.
fn drop_count(interval: hpt::Hpt, samprate: f64) -> usize {
    let count = (interval as f64 / HPT_MODULUS as f64) * samprate + 0.5;
    if count <= 0.0 {
        0
    } else {
        count as usize
    }
}

fn validate_marks(rec: &RecordDesc) -> Result<()> {
    let bad = match (rec.new_start, rec.new_end) {
        (Some(ns), Some(ne)) if ns >= ne => true,
        _ => {
            let bad_start = rec
                .new_start
                .is_some_and(|ns| ns <= rec.start || ns >= rec.end);
            let bad_end = rec
                .new_end
                .is_some_and(|ne| ne <= rec.start || ne >= rec.end);
            bad_start || bad_end
        }
    };

    if bad {
        error!(
            "Invalid new record times, skipping: start {} end {} new start {:?} new end {:?}",
            hpt::format_time(rec.start),
            hpt::format_time(rec.end),
            rec.new_start.map(hpt::format_time),
            rec.new_end.map(hpt::format_time)
        );
        return Err(SiftError::InvalidTrimTimes);
    }
    Ok(())
}
