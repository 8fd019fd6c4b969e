//! The selection engine: indexing, pruning and writing record streams.
//!
//! A [`Session`] is the explicit pass context threading configuration, the
//! file table, the trace group and the scratch record buffer through the
//! pipeline:
//!
//! ```text
//! files → read (traces + record maps) → prune (marks/trims) → write (sinks)
//! ```

pub mod prune;
pub mod read;
pub mod record;
pub mod split;
pub mod trace;
pub mod trim;
pub mod write;

pub use read::{FileEntry, FileTable, ReadSummary};
pub use record::{FileId, RecIdx, RecordDesc, RecordMap};
pub use trace::{Placement, Trace, TraceGroup};
pub use write::{WriteSummary, WriteTotals};

use std::path::PathBuf;

use tracing::debug;

use crate::config::{PruneMode, SelectConfig};
use crate::error::Result;
use crate::hpt;

/// Size of the scratch record buffer; records larger than this abort a pass.
pub const RECORD_BUF_LEN: usize = 16 * 1024;

/// One selection run: configuration plus all per-pass state.
#[derive(Debug)]
pub struct Session {
    config: SelectConfig,
    files: FileTable,
    group: TraceGroup,
    scratch: Vec<u8>,
    totals: WriteTotals,
}

impl Session {
    /// Creates a session with the given configuration.
    pub fn new(config: SelectConfig) -> Self {
        Self {
            config,
            files: FileTable::new(),
            group: TraceGroup::new(),
            scratch: vec![0u8; RECORD_BUF_LEN],
            totals: WriteTotals::default(),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SelectConfig {
        &self.config
    }

    /// Registers an input file for the next read pass.
    pub fn add_file(&mut self, path: impl Into<PathBuf>) -> FileId {
        self.files.add(path.into())
    }

    /// Returns the file table with per-file counters and coverage times.
    pub fn files(&self) -> &FileTable {
        &self.files
    }

    /// Returns the trace group, for diagnostics after a read or prune.
    pub fn group(&self) -> &TraceGroup {
        &self.group
    }

    /// Returns the totals written across passes.
    pub fn totals(&self) -> WriteTotals {
        self.totals
    }

    /// Scans every registered file, building traces and record maps.
    pub fn read_files(&mut self) -> Result<ReadSummary> {
        self.group.clear();
        read::read_files(&self.config, &mut self.files, &mut self.group)
    }

    /// Runs a pass over the indexed records: sort, prune, write.
    pub fn process(&mut self) -> Result<WriteSummary> {
        self.group.sort();

        if tracing::enabled!(tracing::Level::TRACE) {
            self.log_trace_map();
        }

        if self.config.prune != PruneMode::Off {
            debug!("Pruning trace data");
            prune::prune_traces(&self.config, &mut self.group, &mut self.files);
        }

        write::write_traces(
            &self.config,
            &mut self.files,
            &mut self.group,
            &mut self.scratch,
            &mut self.totals,
        )
    }

    /// Drops all traces and record maps, keeping files and totals.
    pub fn reinit_group(&mut self) {
        self.group.clear();
    }

    fn log_trace_map(&self) {
        use tracing::trace;

        trace!("Trace map, {} trace(s):", self.group.len());
        for t in self.group.traces() {
            trace!(
                "  {} ({}) {} - {}  {} Hz  {} samples, {} records",
                t.id,
                t.quality,
                hpt::format_time(t.start),
                hpt::format_time(t.end),
                t.samprate,
                t.samplecnt,
                t.recmap.len()
            );
        }
    }
}
