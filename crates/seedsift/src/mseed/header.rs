//! SEED v2 fixed header and blockette parsing.

use std::fmt;

use chrono::NaiveDate;

use crate::error::{Result, SiftError};
use crate::hpt::{self, Hpt, Quality, HPT_MODULUS};
use crate::mseed::{MAX_RECLEN, MIN_RECLEN};

/// Length of the fixed header section in bytes.
pub const FIXED_HEADER_LEN: usize = 48;

/// BTIME fractional-second units per second (0.0001 s).
const FRACT_PER_SECOND: i64 = 10_000;

/// Ticks per BTIME fractional-second unit.
const TICKS_PER_FRACT: i64 = HPT_MODULUS / FRACT_PER_SECOND;

/// Activity flag bit: time correction has been applied.
const ACT_TIME_CORRECTION_APPLIED: u8 = 0x02;

/// Channel identity: the (network, station, location, channel) tuple.
///
/// Quality is deliberately not part of the identity; it participates in
/// pruning priority but not in aggregation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId {
    /// Network code (up to 2 characters).
    pub network: String,
    /// Station code (up to 5 characters).
    pub station: String,
    /// Location identifier (up to 2 characters).
    pub location: String,
    /// Channel code (up to 3 characters).
    pub channel: String,
}

impl ChannelId {
    /// Returns the source name with the quality code appended,
    /// `NET_STA_LOC_CHAN_QUAL`, the form the match/reject filters see.
    pub fn srcname_with_quality(&self, quality: Quality) -> String {
        format!("{self}_{quality}")
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}",
            self.network, self.station, self.location, self.channel
        )
    }
}

/// Decoded fields of one record's fixed header and Blockette 1000.
#[derive(Debug, Clone)]
pub struct MsHeader {
    /// Channel identity from the header.
    pub id: ChannelId,
    /// Data quality indicator (header byte 6).
    pub quality: Quality,
    /// Start time of the first sample, time correction applied.
    pub start: Hpt,
    /// Time of the last sample.
    pub end: Hpt,
    /// Nominal sample rate in Hz.
    pub samprate: f64,
    /// Number of samples in the record.
    pub numsamples: u16,
    /// Sample encoding code from Blockette 1000.
    pub encoding: u8,
    /// Record length in bytes from Blockette 1000.
    pub reclen: usize,
    /// Offset of the sample data within the record.
    pub data_offset: u16,
    /// Header fields are byte-swapped (little-endian on disk).
    pub swap_header: bool,
    /// Sample data is little-endian on disk (Blockette 1000 word order 0).
    pub swap_data: bool,
}

impl MsHeader {
    /// Returns the sample period in ticks.
    pub fn sample_period(&self) -> Hpt {
        hpt::sample_period(self.samprate)
    }
}

pub(crate) fn read_u16(buf: &[u8], off: usize, swap: bool) -> u16 {
    let b = [buf[off], buf[off + 1]];
    if swap {
        u16::from_le_bytes(b)
    } else {
        u16::from_be_bytes(b)
    }
}

pub(crate) fn read_i16(buf: &[u8], off: usize, swap: bool) -> i16 {
    read_u16(buf, off, swap) as i16
}

pub(crate) fn read_i32(buf: &[u8], off: usize, swap: bool) -> i32 {
    let b = [buf[off], buf[off + 1], buf[off + 2], buf[off + 3]];
    if swap {
        i32::from_le_bytes(b)
    } else {
        i32::from_be_bytes(b)
    }
}

pub(crate) fn write_u16(buf: &mut [u8], off: usize, value: u16, swap: bool) {
    let b = if swap {
        value.to_le_bytes()
    } else {
        value.to_be_bytes()
    };
    buf[off..off + 2].copy_from_slice(&b);
}

fn field_str(buf: &[u8]) -> String {
    String::from_utf8_lossy(buf).trim().to_string()
}

/// Computes the nominal sample rate from the header factor and multiplier.
///
/// A positive factor is samples per second, a negative factor is seconds per
/// sample; the multiplier scales (positive) or divides (negative) the result.
pub fn nominal_samprate(factor: i16, multiplier: i16) -> f64 {
    let mut rate = match factor {
        f if f > 0 => f64::from(f),
        f if f < 0 => -1.0 / f64::from(f),
        _ => return 0.0,
    };
    match multiplier {
        m if m > 0 => rate *= f64::from(m),
        m if m < 0 => rate /= -f64::from(m),
        _ => {}
    }
    rate
}

fn btime_to_hpt(buf: &[u8], off: usize, swap: bool) -> Option<Hpt> {
    let year = i32::from(read_u16(buf, off, swap));
    let doy = u32::from(read_u16(buf, off + 2, swap));
    let hour = u32::from(buf[off + 4]);
    let min = u32::from(buf[off + 5]);
    let sec = u32::from(buf[off + 6]);
    let fract = i64::from(read_u16(buf, off + 8, swap));

    let date = NaiveDate::from_yo_opt(year, doy)?;
    // Leap seconds appear as sec == 60; clamp for the conversion.
    let naive = date.and_hms_opt(hour, min, sec.min(59))?;
    Some(hpt::from_datetime(&naive.and_utc()) + fract * TICKS_PER_FRACT)
}

pub(crate) fn hpt_to_btime(hpt: Hpt, swap: bool) -> Option<[u8; 10]> {
    use chrono::{Datelike, Timelike};

    let dt = hpt::to_datetime(hpt)?;
    let fract = (dt.timestamp_subsec_micros() / TICKS_PER_FRACT as u32) as u16;

    let mut b = [0u8; 10];
    write_u16(&mut b, 0, dt.year() as u16, swap);
    write_u16(&mut b, 2, dt.ordinal() as u16, swap);
    b[4] = dt.hour() as u8;
    b[5] = dt.minute() as u8;
    b[6] = dt.second() as u8;
    write_u16(&mut b, 8, fract, swap);
    Some(b)
}

fn plausible_year(year: u16) -> bool {
    (1900..=2100).contains(&year)
}

/// Parses a record's fixed header and Blockette 1000.
///
/// `buf` must hold at least the fixed header and the blockette chain up to
/// Blockette 1000; callers typically pass the first few hundred bytes of a
/// record. Header byte order is detected from the start-time year.
pub fn parse_header(buf: &[u8]) -> Result<MsHeader> {
    let corrupt = |reason: &str| SiftError::CorruptRecord {
        path: Default::default(),
        offset: 0,
        reason: reason.to_string(),
    };

    if buf.len() < FIXED_HEADER_LEN {
        return Err(corrupt("short read: less than fixed header length"));
    }

    // Sequence number must be ASCII digits or spaces, quality a known code.
    if !buf[0..6]
        .iter()
        .all(|b| b.is_ascii_digit() || *b == b' ' || *b == b'\0')
    {
        return Err(corrupt("invalid sequence number"));
    }
    let quality = Quality::new(buf[6] as char);
    if !quality.is_valid_indicator() {
        return Err(corrupt("invalid data quality indicator"));
    }

    // Detect header byte order from the start-time year.
    let swap_header = if plausible_year(read_u16(buf, 20, false)) {
        false
    } else if plausible_year(read_u16(buf, 20, true)) {
        true
    } else {
        return Err(corrupt("implausible start-time year in either byte order"));
    };

    let id = ChannelId {
        network: field_str(&buf[18..20]),
        station: field_str(&buf[8..13]),
        location: field_str(&buf[13..15]),
        channel: field_str(&buf[15..18]),
    };

    let mut start =
        btime_to_hpt(buf, 20, swap_header).ok_or_else(|| corrupt("invalid start time fields"))?;

    let numsamples = read_u16(buf, 30, swap_header);
    let factor = read_i16(buf, 32, swap_header);
    let multiplier = read_i16(buf, 34, swap_header);
    let samprate = nominal_samprate(factor, multiplier);

    // Apply the time correction unless the activity flags say it already is.
    let act_flags = buf[36];
    let time_correction = read_i32(buf, 40, swap_header);
    if act_flags & ACT_TIME_CORRECTION_APPLIED == 0 && time_correction != 0 {
        start += i64::from(time_correction) * TICKS_PER_FRACT;
    }

    let data_offset = read_u16(buf, 44, swap_header);
    let blockette_offset = read_u16(buf, 46, swap_header);

    // Walk the blockette chain for Blockette 1000.
    let numblockettes = buf[39];
    let mut b1000: Option<(u8, u8, u8)> = None;
    let mut off = blockette_offset as usize;
    for _ in 0..numblockettes {
        if off == 0 || off + 4 > buf.len() {
            break;
        }
        let btype = read_u16(buf, off, swap_header);
        let next = read_u16(buf, off + 2, swap_header) as usize;
        if btype == 1000 {
            if off + 7 > buf.len() {
                break;
            }
            b1000 = Some((buf[off + 4], buf[off + 5], buf[off + 6]));
            break;
        }
        if next <= off {
            break;
        }
        off = next;
    }

    let (encoding, word_order, reclen_exp) = b1000.ok_or(SiftError::UnknownRecLen)?;
    if reclen_exp >= 31 {
        return Err(corrupt("implausible record length exponent"));
    }
    let reclen = 1usize << reclen_exp;
    if !(MIN_RECLEN..=MAX_RECLEN).contains(&reclen) {
        return Err(corrupt("record length out of supported range"));
    }

    let period = hpt::sample_period(samprate);
    let end = if numsamples > 0 && period > 0 {
        start + (i64::from(numsamples) - 1) * period
    } else {
        start
    };

    Ok(MsHeader {
        id,
        quality,
        start,
        end,
        samprate,
        numsamples,
        encoding,
        reclen,
        data_offset,
        swap_header,
        swap_data: word_order == 0,
    })
}
