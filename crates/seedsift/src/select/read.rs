//! Input scanning: build traces and record maps from files.
//!
//! The reader walks each input file sequentially, filters records, routes
//! each survivor into the trace group, and hangs a descriptor (or several,
//! when boundary splitting applies) off the owning trace's record map.
//! Filtering happens before group insertion so discarded records never
//! pollute trace envelopes.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, error, trace, warn};

use crate::config::{PruneMode, SelectConfig, SplitBoundary};
use crate::error::{Result, SiftError};
use crate::hpt::{self, Hpt};
use crate::mseed::RecordReader;
use crate::select::record::{FileId, RecordDesc};
use crate::select::split;
use crate::select::trace::{Placement, TraceGroup};

/// Per-file bookkeeping: names, modification counters, output coverage.
#[derive(Debug)]
pub struct FileEntry {
    /// Path records are read from (the `.orig` shadow when replacing input).
    pub in_path: PathBuf,
    /// Original path to write back to, set when replacing input.
    pub out_path: Option<PathBuf>,
    /// Records attached at the head of a trace chain.
    pub reorder_count: u32,
    /// Extra descriptors created by boundary splitting.
    pub split_count: u32,
    /// Records deleted by the pruner.
    pub removed_count: u32,
    /// Records trimmed at sample level.
    pub trimmed_count: u32,
    /// Earliest data time written from this file.
    pub earliest: Option<Hpt>,
    /// Latest data time written from this file, extended by one period.
    pub latest: Option<Hpt>,
    /// Bytes written from this file during the last pass.
    pub bytes_written: u64,
}

impl FileEntry {
    fn new(path: PathBuf) -> Self {
        Self {
            in_path: path,
            out_path: None,
            reorder_count: 0,
            split_count: 0,
            removed_count: 0,
            trimmed_count: 0,
            earliest: None,
            latest: None,
            bytes_written: 0,
        }
    }

    /// Returns the name to report for this file: the original name when the
    /// input was shadowed, the input path otherwise.
    pub fn display_path(&self) -> &Path {
        self.out_path.as_deref().unwrap_or(&self.in_path)
    }

    /// Returns true when any modification counter is non-zero.
    pub fn modified(&self) -> bool {
        self.reorder_count > 0
            || self.split_count > 0
            || self.removed_count > 0
            || self.trimmed_count > 0
    }
}

/// Table of the pass's input files.
#[derive(Debug, Default)]
pub struct FileTable {
    entries: Vec<FileEntry>,
}

impl FileTable {
    /// Creates an empty file table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a file and returns its id.
    pub fn add(&mut self, path: impl Into<PathBuf>) -> FileId {
        self.entries.push(FileEntry::new(path.into()));
        self.entries.len() - 1
    }

    /// Returns the number of registered files.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no files are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns a file entry.
    pub fn get(&self, id: FileId) -> &FileEntry {
        &self.entries[id]
    }

    /// Returns a mutable file entry.
    pub fn get_mut(&mut self, id: FileId) -> &mut FileEntry {
        &mut self.entries[id]
    }

    /// Iterates the file entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &FileEntry> {
        self.entries.iter()
    }
}

/// Totals from one read pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReadSummary {
    /// Files scanned.
    pub files: u64,
    /// Records indexed into the trace group.
    pub records: u64,
    /// Samples covered by indexed records.
    pub samples: u64,
    /// Records the codec could not parse.
    pub corrupt: u64,
}

impl fmt::Display for ReadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Files: {}, Records: {}, Samples: {}",
            self.files, self.records, self.samples
        )
    }
}

/// Reads every registered file, building traces and record maps.
pub fn read_files(
    config: &SelectConfig,
    files: &mut FileTable,
    group: &mut TraceGroup,
) -> Result<ReadSummary> {
    let mut summary = ReadSummary::default();

    for fid in 0..files.len() {
        if config.replace_input {
            if let Err(err) = shadow_input(files.get_mut(fid)) {
                error!("Skipping {}: {err}", files.get(fid).in_path.display());
                continue;
            }
        }

        let entry = files.get_mut(fid);
        debug!("Processing: {}", entry.in_path.display());

        let mut reader = match RecordReader::open(&entry.in_path) {
            Ok(reader) => reader,
            Err(err) => {
                error!("Cannot open {}: {err}", entry.in_path.display());
                continue;
            }
        };

        loop {
            let raw = match reader.next_record() {
                Ok(Some(raw)) => raw,
                Ok(None) => break,
                Err(err @ SiftError::CorruptRecord { .. }) => {
                    warn!("{err}");
                    summary.corrupt += 1;
                    continue;
                }
                Err(err) => {
                    error!("Reading {}: {err}", entry.in_path.display());
                    break;
                }
            };

            let hdr = &raw.header;
            let srcname = hdr.id.srcname_with_quality(hdr.quality);

            // Window filter: skip records entirely outside the time window.
            if let Some(ws) = config.window_start {
                if hdr.end < ws {
                    trace!("Skipping (start time) {srcname}, {}", hpt::format_time(hdr.start));
                    continue;
                }
            }
            if let Some(we) = config.window_end {
                if hdr.start > we {
                    trace!("Skipping (end time) {srcname}, {}", hpt::format_time(hdr.start));
                    continue;
                }
            }
            if let Some(re) = &config.match_regex {
                if !re.is_match(&srcname) {
                    trace!("Skipping (match) {srcname}");
                    continue;
                }
            }
            if let Some(re) = &config.reject_regex {
                if re.is_match(&srcname) {
                    trace!("Skipping (reject) {srcname}");
                    continue;
                }
            }

            let (trace_idx, placement) = group.add_record(
                &hdr.id,
                hdr.quality,
                hdr.samprate,
                hdr.start,
                hdr.end,
                u64::from(hdr.numsamples),
                config.best_quality,
                config.time_tol,
                config.samp_rate_tol,
            );
            if placement == Placement::Inside {
                let err = SiftError::MisplacedRecord(srcname);
                error!("{err}, {}", hpt::format_time(hdr.start));
                continue;
            }

            let mut rec = RecordDesc::new(fid, raw.offset, raw.reclen, hdr.start, hdr.end, hdr.quality);

            // Sample-level window pruning marks records that straddle the
            // window for trimming at write time.
            if config.prune == PruneMode::Sample {
                if let Some(ws) = config.window_start {
                    if ws > rec.start && ws < rec.end {
                        rec.new_start = Some(ws);
                    }
                }
                if let Some(we) = config.window_end {
                    if we > rec.start && we < rec.end {
                        rec.new_end = Some(we);
                    }
                }
            }

            let chain = if config.split == SplitBoundary::None {
                vec![rec]
            } else {
                let frags = split::split_records(rec, config.split, hdr.samprate);
                entry.split_count += (frags.len() - 1) as u32;
                frags
            };

            let recmap = &mut group.trace_mut(trace_idx).recmap;
            match placement {
                Placement::Tail | Placement::New => {
                    for frag in chain {
                        recmap.append_tail(frag);
                    }
                }
                Placement::Head => {
                    for frag in chain.into_iter().rev() {
                        recmap.prepend_head(frag);
                        entry.reorder_count += 1;
                    }
                }
                Placement::Inside => unreachable!("handled above"),
            }

            summary.records += 1;
            summary.samples += u64::from(hdr.numsamples);
        }

        summary.files += 1;
    }

    Ok(summary)
}

/// Renames an input to its `.orig` shadow so the original name can be
/// rewritten during the write pass.
fn shadow_input(entry: &mut FileEntry) -> Result<()> {
    if entry.out_path.is_some() {
        return Ok(()); // already shadowed by an earlier pass
    }
    let original = entry.in_path.clone();
    let mut shadow = original.clone().into_os_string();
    shadow.push(".orig");
    let shadow = PathBuf::from(shadow);

    std::fs::rename(&original, &shadow).map_err(|e| SiftError::io(&original, e))?;
    entry.out_path = Some(original);
    entry.in_path = shadow;
    Ok(())
}
