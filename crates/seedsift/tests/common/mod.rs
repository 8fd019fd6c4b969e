//! Shared helpers: build Mini-SEED records and inspect output files.

#![allow(dead_code)] // each test binary uses its own subset of helpers

use chrono::{Datelike, Timelike};

use seedsift::hpt::{self, Hpt};
use seedsift::mseed::{self, Samples};

/// Description of one record to synthesize.
#[derive(Debug, Clone)]
pub struct RecordSpec {
    pub net: &'static str,
    pub sta: &'static str,
    pub loc: &'static str,
    pub chan: &'static str,
    pub quality: char,
    pub start: Hpt,
    pub samprate: f64,
    pub numsamples: u16,
    pub reclen: usize,
    /// Value of the first sample; samples ascend from here.
    pub base: i32,
}

impl Default for RecordSpec {
    fn default() -> Self {
        Self {
            net: "IU",
            sta: "ANMO",
            loc: "00",
            chan: "BHZ",
            quality: 'D',
            start: 0,
            samprate: 1.0,
            numsamples: 10,
            reclen: 512,
            base: 0,
        }
    }
}

/// Parses a time string, panicking on bad test input.
pub fn t(s: &str) -> Hpt {
    hpt::parse_time(s).unwrap()
}

fn be16(buf: &mut [u8], off: usize, value: u16) {
    buf[off..off + 2].copy_from_slice(&value.to_be_bytes());
}

fn pad(dst: &mut [u8], value: &str) {
    for (i, b) in dst.iter_mut().enumerate() {
        *b = *value.as_bytes().get(i).unwrap_or(&b' ');
    }
}

/// Builds one big-endian INT32 record.
pub fn build_record(spec: &RecordSpec) -> Vec<u8> {
    assert!(spec.reclen.is_power_of_two());
    let data_offset = 64usize;
    assert!(data_offset + usize::from(spec.numsamples) * 4 <= spec.reclen);

    let mut buf = vec![0u8; spec.reclen];
    buf[0..6].copy_from_slice(b"000001");
    buf[6] = spec.quality as u8;
    buf[7] = b' ';
    pad(&mut buf[8..13], spec.sta);
    pad(&mut buf[13..15], spec.loc);
    pad(&mut buf[15..18], spec.chan);
    pad(&mut buf[18..20], spec.net);

    let dt = hpt::to_datetime(spec.start).unwrap();
    be16(&mut buf, 20, dt.year() as u16);
    be16(&mut buf, 22, dt.ordinal() as u16);
    buf[24] = dt.hour() as u8;
    buf[25] = dt.minute() as u8;
    buf[26] = dt.second() as u8;
    be16(&mut buf, 28, (dt.timestamp_subsec_micros() / 100) as u16);

    be16(&mut buf, 30, spec.numsamples);
    let (factor, multiplier) = if spec.samprate >= 1.0 {
        (spec.samprate as i16, 1i16)
    } else {
        (-((1.0 / spec.samprate) as i16), 1i16)
    };
    be16(&mut buf, 32, factor as u16);
    be16(&mut buf, 34, multiplier as u16);

    buf[39] = 1;
    be16(&mut buf, 44, data_offset as u16);
    be16(&mut buf, 46, 48);

    // Blockette 1000: INT32 encoding, big-endian words.
    be16(&mut buf, 48, 1000);
    be16(&mut buf, 50, 0);
    buf[52] = 3;
    buf[53] = 1;
    buf[54] = spec.reclen.trailing_zeros() as u8;

    let mut off = data_offset;
    for i in 0..i32::from(spec.numsamples) {
        buf[off..off + 4].copy_from_slice(&(spec.base + i).to_be_bytes());
        off += 4;
    }
    buf
}

/// Writes a sequence of records into one file.
pub fn write_records(path: &std::path::Path, specs: &[RecordSpec]) {
    let mut bytes = Vec::new();
    for spec in specs {
        bytes.extend(build_record(spec));
    }
    std::fs::write(path, bytes).unwrap();
}

/// A decoded output record, for assertions.
#[derive(Debug)]
pub struct OutRecord {
    pub srcname: String,
    pub quality: char,
    pub start: Hpt,
    pub end: Hpt,
    pub numsamples: usize,
    pub first_sample: i32,
}

/// Reads every record of a file back for inspection.
pub fn read_records(path: &std::path::Path) -> Vec<OutRecord> {
    let bytes = std::fs::read(path).unwrap();
    let mut out = Vec::new();
    let mut off = 0usize;

    while off < bytes.len() {
        let rec = mseed::unpack(&bytes[off..]).unwrap();
        let first_sample = match &rec.samples {
            Samples::Int32(v) => v[0],
            other => panic!("unexpected encoding: {other:?}"),
        };
        out.push(OutRecord {
            srcname: rec.header.id.to_string(),
            quality: rec.header.quality.code(),
            start: rec.header.start,
            end: rec.header.end,
            numsamples: rec.samples.len(),
            first_sample,
        });
        off += rec.header.reclen;
    }

    out
}
