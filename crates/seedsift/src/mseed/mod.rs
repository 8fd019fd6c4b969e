//! Mini-SEED codec: record headers, sample payloads and sequential reading.
//!
//! The engine treats records as opaque byte ranges wherever it can; this
//! module is the one place that understands the SEED v2 on-disk layout. It
//! decodes the 48-byte fixed header, walks the blockette chain for
//! Blockette 1000 (encoding, word order, record length), converts BTIME
//! fields to [`Hpt`](crate::hpt::Hpt) ticks, and unpacks or repacks sample
//! payloads for the primitive encodings.
//!
//! ## Record layout
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  Fixed header (48 bytes)                                 │
//! │  - Sequence number, quality, NET/STA/LOC/CHAN            │
//! │  - BTIME start, sample count, rate factor/multiplier     │
//! │  - Flags, time correction, data/blockette offsets        │
//! ├──────────────────────────────────────────────────────────┤
//! │  Blockettes (chained; Blockette 1000 carries encoding,   │
//! │  word order and record length)                           │
//! ├──────────────────────────────────────────────────────────┤
//! │  Sample data, padded to the record length                │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod data;
pub mod header;
pub mod reader;

pub use data::{pack, unpack, SampleEncoding, Samples, UnpackedRecord};
pub use header::{parse_header, ChannelId, MsHeader, FIXED_HEADER_LEN};
pub use reader::{RawRecord, RecordReader};

/// Smallest record length the codec will accept.
pub const MIN_RECLEN: usize = 64;

/// Largest record length the codec will accept (2^20 bytes).
pub const MAX_RECLEN: usize = 1 << 20;
