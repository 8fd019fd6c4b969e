//! Sequential record reader: header, offset and length per record.
//!
//! The reader never loads sample payloads; the write pass re-reads record
//! bytes on demand. After a corrupt header it advances by the minimum record
//! length and reports the error, so a damaged region costs records but not
//! the rest of the file.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::{Result, SiftError};
use crate::mseed::header::{parse_header, MsHeader};
use crate::mseed::MIN_RECLEN;

/// Bytes read per record to cover the fixed header and blockette chain.
const PEEK_LEN: usize = 512;

/// One record located in an input file.
#[derive(Debug, Clone)]
pub struct RawRecord {
    /// Decoded header fields.
    pub header: MsHeader,
    /// Byte offset of the record within the file.
    pub offset: u64,
    /// Record length in bytes.
    pub reclen: u32,
}

/// Sequential reader over the records of one file.
#[derive(Debug)]
pub struct RecordReader {
    file: File,
    path: PathBuf,
    offset: u64,
    len: u64,
}

impl RecordReader {
    /// Opens a file for record scanning.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| SiftError::io(&path, e))?;
        let len = file
            .metadata()
            .map_err(|e| SiftError::io(&path, e))?
            .len();
        Ok(Self {
            file,
            path,
            offset: 0,
            len,
        })
    }

    /// Returns the path being read.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the next record header.
    ///
    /// Returns `Ok(None)` at end of file. A corrupt header yields an error
    /// after skipping ahead by [`MIN_RECLEN`]; the caller may keep calling.
    pub fn next_record(&mut self) -> Result<Option<RawRecord>> {
        let remaining = self.len.saturating_sub(self.offset);
        if remaining < MIN_RECLEN as u64 {
            return Ok(None);
        }

        let want = PEEK_LEN.min(remaining as usize);
        let mut peek = vec![0u8; want];
        self.file
            .seek(SeekFrom::Start(self.offset))
            .map_err(|e| SiftError::io(&self.path, e))?;
        self.file
            .read_exact(&mut peek)
            .map_err(|e| SiftError::io(&self.path, e))?;

        let offset = self.offset;
        match parse_header(&peek) {
            Ok(header) => {
                let reclen = header.reclen as u64;
                if reclen > remaining {
                    self.offset = self.len;
                    return Err(SiftError::CorruptRecord {
                        path: self.path.clone(),
                        offset,
                        reason: "record extends past end of file".to_string(),
                    });
                }
                self.offset += reclen;
                Ok(Some(RawRecord {
                    reclen: header.reclen as u32,
                    header,
                    offset,
                }))
            }
            Err(err) => {
                self.offset += MIN_RECLEN as u64;
                Err(SiftError::CorruptRecord {
                    path: self.path.clone(),
                    offset,
                    reason: err.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hpt;
    use crate::mseed::data::tests::build_test_record;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_scan_two_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("two.mseed");
        let start = hpt::parse_time("2020-01-01T00:00:00").unwrap();

        let mut bytes = build_test_record("IU", "ANMO", "00", "BHZ", 'D', start, 40.0, 100, 512);
        bytes.extend(build_test_record(
            "IU",
            "ANMO",
            "00",
            "BHZ",
            'D',
            start + 100 * 25_000,
            40.0,
            100,
            512,
        ));
        std::fs::write(&path, &bytes).unwrap();

        let mut reader = RecordReader::open(&path).unwrap();
        let first = reader.next_record().unwrap().unwrap();
        assert_eq!(first.offset, 0);
        assert_eq!(first.reclen, 512);
        assert_eq!(first.header.start, start);

        let second = reader.next_record().unwrap().unwrap();
        assert_eq!(second.offset, 512);
        assert_eq!(second.header.start, start + 100 * 25_000);

        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_header_skips_ahead() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.mseed");
        let start = hpt::parse_time("2020-01-01T00:00:00").unwrap();

        // 512 bytes of garbage, then a valid record.
        let mut bytes = vec![0xAAu8; 512];
        bytes.extend(build_test_record(
            "IU", "ANMO", "00", "BHZ", 'D', start, 40.0, 100, 512,
        ));
        std::fs::write(&path, &bytes).unwrap();

        let mut reader = RecordReader::open(&path).unwrap();
        let mut errors = 0;
        let rec = loop {
            match reader.next_record() {
                Ok(Some(rec)) => break rec,
                Ok(None) => panic!("valid record not found"),
                Err(_) => errors += 1,
            }
        };
        assert_eq!(errors, 512 / MIN_RECLEN);
        assert_eq!(rec.offset, 512);
    }

    #[test]
    fn test_trailing_garbage_is_eof() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trailing.mseed");
        let start = hpt::parse_time("2020-01-01T00:00:00").unwrap();

        let mut bytes = build_test_record("IU", "ANMO", "00", "BHZ", 'D', start, 40.0, 100, 512);
        bytes.extend_from_slice(b"not a record");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(&bytes).unwrap();

        let mut reader = RecordReader::open(&path).unwrap();
        assert!(reader.next_record().unwrap().is_some());
        // Trailing bytes shorter than a minimum record read as end of file.
        assert!(reader.next_record().unwrap().is_none());
    }
}
