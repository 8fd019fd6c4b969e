//! Error and Result types for seedsift operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A convenience `Result` type for seedsift operations.
pub type Result<T> = std::result::Result<T, SiftError>;

/// The error type for record selection and pruning operations.
#[derive(Debug, Error)]
pub enum SiftError {
    /// A record header could not be parsed.
    #[error("Corrupt record at offset {offset} in {path:?}: {reason}")]
    CorruptRecord {
        /// File the record was read from.
        path: PathBuf,
        /// Byte offset of the record within the file.
        offset: u64,
        /// Parse failure detail.
        reason: String,
    },

    /// A record is larger than the scratch buffer; fatal for the write pass.
    #[error("Record length ({reclen} bytes) larger than buffer ({buflen} bytes)")]
    OversizeRecord {
        /// Length of the offending record.
        reclen: usize,
        /// Capacity of the scratch buffer.
        buflen: usize,
    },

    /// New start/end trim times violate the record's original span.
    #[error("Invalid trim times for record: new start/end outside original span")]
    InvalidTrimTimes,

    /// The sample encoding cannot be unpacked by this codec.
    #[error("Unsupported sample encoding: {0}")]
    UnsupportedEncoding(u8),

    /// No Blockette 1000 was found, so the record length is unknown.
    #[error("Record length undeterminable: no Blockette 1000 in record")]
    UnknownRecLen,

    /// Repacking a trimmed record produced no samples or no records.
    #[error("Repacking record produced {records} records and {samples} samples")]
    RepackUnderflow {
        /// Number of records produced by the repack.
        records: usize,
        /// Number of samples packed.
        samples: usize,
    },

    /// A record could not be placed at the head or tail of its trace.
    #[error("Cannot place record relative to trace {0}")]
    MisplacedRecord(String),

    /// A request file line could not be parsed.
    #[error("Malformed request line: {0}")]
    MalformedRequest(String),

    /// The host refused to raise the open file limit.
    #[error("Cannot raise open file limit to {0}")]
    OpenFileLimit(u64),

    /// Underlying I/O error with path context.
    #[error("I/O error on {path:?}: {source}")]
    Io {
        /// Path of the file being operated on.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// Underlying I/O error without a specific file.
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
}

impl SiftError {
    /// Wraps an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
