//! Sample payload unpacking and repacking for primitive encodings.
//!
//! The pruning engine only touches sample data when a record must be trimmed
//! at sample granularity, so the codec supports the word-aligned primitive
//! encodings (16/32-bit integers, IEEE floats). Compressed encodings are
//! recognized and reported; records carrying them pass through untouched
//! unless a trim forces an unpack.

use crate::error::{Result, SiftError};
use crate::mseed::header::{self, parse_header, MsHeader};

/// Sample encoding codes from Blockette 1000 that this codec can unpack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SampleEncoding {
    /// 16-bit signed integers.
    Int16 = 1,
    /// 32-bit signed integers.
    Int32 = 3,
    /// IEEE 754 single-precision floats.
    Float32 = 4,
    /// IEEE 754 double-precision floats.
    Float64 = 5,
}

impl SampleEncoding {
    /// Creates a SampleEncoding from the Blockette 1000 code.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Int16),
            3 => Some(Self::Int32),
            4 => Some(Self::Float32),
            5 => Some(Self::Float64),
            _ => None,
        }
    }

    /// Returns the size of one sample in bytes.
    pub fn sample_size(self) -> usize {
        match self {
            Self::Int16 => 2,
            Self::Int32 | Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }
}

/// Decoded sample payload of one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    /// 16-bit integer samples.
    Int16(Vec<i16>),
    /// 32-bit integer samples.
    Int32(Vec<i32>),
    /// Single-precision float samples.
    Float32(Vec<f32>),
    /// Double-precision float samples.
    Float64(Vec<f64>),
}

impl Samples {
    /// Returns the number of samples.
    pub fn len(&self) -> usize {
        match self {
            Self::Int16(v) => v.len(),
            Self::Int32(v) => v.len(),
            Self::Float32(v) => v.len(),
            Self::Float64(v) => v.len(),
        }
    }

    /// Returns true when no samples remain.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the encoding these samples repack into.
    pub fn encoding(&self) -> SampleEncoding {
        match self {
            Self::Int16(_) => SampleEncoding::Int16,
            Self::Int32(_) => SampleEncoding::Int32,
            Self::Float32(_) => SampleEncoding::Float32,
            Self::Float64(_) => SampleEncoding::Float64,
        }
    }

    /// Removes `n` samples from the front, saturating at empty.
    pub fn drop_front(&mut self, n: usize) {
        fn drain<T>(v: &mut Vec<T>, n: usize) {
            v.drain(..n.min(v.len()));
        }
        match self {
            Self::Int16(v) => drain(v, n),
            Self::Int32(v) => drain(v, n),
            Self::Float32(v) => drain(v, n),
            Self::Float64(v) => drain(v, n),
        }
    }

    /// Removes `n` samples from the back, saturating at empty.
    pub fn drop_back(&mut self, n: usize) {
        fn cut<T>(v: &mut Vec<T>, n: usize) {
            v.truncate(v.len().saturating_sub(n));
        }
        match self {
            Self::Int16(v) => cut(v, n),
            Self::Int32(v) => cut(v, n),
            Self::Float32(v) => cut(v, n),
            Self::Float64(v) => cut(v, n),
        }
    }
}

/// A fully decoded record: header, leading bytes and sample payload.
///
/// `prefix` preserves the original fixed header and blockette bytes so that
/// repacking carries every blockette through untouched; only the start time
/// and sample count are patched.
#[derive(Debug, Clone)]
pub struct UnpackedRecord {
    /// Decoded header fields; `start` and `numsamples` may be mutated before
    /// repacking.
    pub header: MsHeader,
    /// Decoded samples.
    pub samples: Samples,
    prefix: Vec<u8>,
}

/// Unpacks a complete record held in `buf`.
pub fn unpack(buf: &[u8]) -> Result<UnpackedRecord> {
    let hdr = parse_header(buf)?;
    let corrupt = |reason: &str| SiftError::CorruptRecord {
        path: Default::default(),
        offset: 0,
        reason: reason.to_string(),
    };

    if buf.len() < hdr.reclen {
        return Err(corrupt("buffer shorter than record length"));
    }
    let encoding =
        SampleEncoding::from_u8(hdr.encoding).ok_or(SiftError::UnsupportedEncoding(hdr.encoding))?;

    let n = usize::from(hdr.numsamples);
    let data_start = usize::from(hdr.data_offset);
    let data_end = data_start + n * encoding.sample_size();
    if data_start < header::FIXED_HEADER_LEN || data_end > hdr.reclen {
        return Err(corrupt("sample data exceeds record bounds"));
    }

    let data = &buf[data_start..data_end];
    let swap = hdr.swap_data;
    let samples = match encoding {
        SampleEncoding::Int16 => Samples::Int16(
            data.chunks_exact(2)
                .map(|c| decode_bytes(c.try_into().unwrap(), swap, i16::from_le_bytes, i16::from_be_bytes))
                .collect(),
        ),
        SampleEncoding::Int32 => Samples::Int32(
            data.chunks_exact(4)
                .map(|c| decode_bytes(c.try_into().unwrap(), swap, i32::from_le_bytes, i32::from_be_bytes))
                .collect(),
        ),
        SampleEncoding::Float32 => Samples::Float32(
            data.chunks_exact(4)
                .map(|c| decode_bytes(c.try_into().unwrap(), swap, f32::from_le_bytes, f32::from_be_bytes))
                .collect(),
        ),
        SampleEncoding::Float64 => Samples::Float64(
            data.chunks_exact(8)
                .map(|c| decode_bytes(c.try_into().unwrap(), swap, f64::from_le_bytes, f64::from_be_bytes))
                .collect(),
        ),
    };

    Ok(UnpackedRecord {
        header: hdr,
        samples,
        prefix: buf[..data_start].to_vec(),
    })
}

fn decode_bytes<T, const N: usize>(
    bytes: [u8; N],
    swap: bool,
    le: fn([u8; N]) -> T,
    be: fn([u8; N]) -> T,
) -> T {
    if swap {
        le(bytes)
    } else {
        be(bytes)
    }
}

/// Repacks an unpacked record into a single record image.
///
/// The record keeps its original length; the trailing data region is zero
/// padded. The packed bytes are handed to `on_record` exactly once. Returns
/// the `(record, sample)` counts produced.
pub fn pack<F>(rec: &UnpackedRecord, mut on_record: F) -> Result<(usize, usize)>
where
    F: FnMut(&[u8]),
{
    let hdr = &rec.header;
    let n = rec.samples.len();
    if n == 0 {
        return Err(SiftError::RepackUnderflow {
            records: 0,
            samples: 0,
        });
    }

    let sample_size = rec.samples.encoding().sample_size();
    let data_start = usize::from(hdr.data_offset);
    if data_start + n * sample_size > hdr.reclen {
        return Err(SiftError::RepackUnderflow {
            records: 0,
            samples: n,
        });
    }

    let mut buf = vec![0u8; hdr.reclen];
    buf[..rec.prefix.len()].copy_from_slice(&rec.prefix);

    // Patch start time and sample count in the fixed header. The BTIME now
    // reflects any applied time correction, so flag it as applied.
    let btime =
        header::hpt_to_btime(hdr.start, hdr.swap_header).ok_or(SiftError::InvalidTrimTimes)?;
    buf[20..30].copy_from_slice(&btime);
    header::write_u16(&mut buf, 30, n as u16, hdr.swap_header);
    buf[36] |= 0x02;

    let swap = hdr.swap_data;
    let mut off = data_start;
    match &rec.samples {
        Samples::Int16(v) => {
            for s in v {
                encode_bytes(&mut buf, &mut off, s.to_le_bytes(), s.to_be_bytes(), swap);
            }
        }
        Samples::Int32(v) => {
            for s in v {
                encode_bytes(&mut buf, &mut off, s.to_le_bytes(), s.to_be_bytes(), swap);
            }
        }
        Samples::Float32(v) => {
            for s in v {
                encode_bytes(&mut buf, &mut off, s.to_le_bytes(), s.to_be_bytes(), swap);
            }
        }
        Samples::Float64(v) => {
            for s in v {
                encode_bytes(&mut buf, &mut off, s.to_le_bytes(), s.to_be_bytes(), swap);
            }
        }
    }

    on_record(&buf);
    Ok((1, n))
}

fn encode_bytes<const N: usize>(
    buf: &mut [u8],
    off: &mut usize,
    le: [u8; N],
    be: [u8; N],
    swap: bool,
) {
    let bytes = if swap { le } else { be };
    buf[*off..*off + N].copy_from_slice(&bytes);
    *off += N;
}
