//! Streaming surviving records to the configured sinks.
//!
//! The writer traverses traces in group order and each record map in chain
//! order, re-reads the original record bytes, applies trims and the optional
//! quality restamp, and fans the bytes out to the combined output file,
//! the registered archives, and the replace-input sink. Input files open
//! lazily on first use and every handle is released when the pass ends.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};

use tracing::{debug, error, info, warn};

use crate::archive::Archive;
use crate::config::SelectConfig;
use crate::error::{Result, SiftError};
use crate::hpt;
use crate::mseed;
use crate::select::read::FileTable;
use crate::select::record::FileId;
use crate::select::trace::TraceGroup;
use crate::select::trim::{self, TrimOutcome};

/// Totals from one write pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriteSummary {
    /// Records written to at least one sink.
    pub records: u64,
    /// Bytes written per record stream (not multiplied per sink).
    pub bytes: u64,
}

/// Running totals across passes, used to append rather than truncate the
/// combined output on later passes.
#[derive(Debug, Default, Clone, Copy)]
pub struct WriteTotals {
    /// Records written across all passes.
    pub records: u64,
    /// Bytes written across all passes.
    pub bytes: u64,
}

enum CombinedSink {
    Stdout(io::Stdout),
    File(File),
}

impl CombinedSink {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            Self::Stdout(out) => out.write_all(buf),
            Self::File(f) => f.write_all(buf),
        }
    }
}

/// Writes all surviving records to the configured sinks.
pub fn write_traces(
    config: &SelectConfig,
    files: &mut FileTable,
    group: &mut TraceGroup,
    scratch: &mut [u8],
    totals: &mut WriteTotals,
) -> Result<WriteSummary> {
    if group.is_empty() {
        return Ok(WriteSummary::default());
    }

    let mut combined = open_combined(config, totals)?;
    let mut archives: Vec<Archive> = config.archives.iter().map(Archive::new).collect();
    let mut inputs: HashMap<FileId, File> = HashMap::new();
    let mut outputs: HashMap<FileId, File> = HashMap::new();
    let mut summary = WriteSummary::default();

    let result = write_loop(
        config,
        files,
        group,
        scratch,
        &mut combined,
        &mut archives,
        &mut inputs,
        &mut outputs,
        &mut summary,
    );

    // Release every handle deterministically, pass failed or not.
    drop(inputs);
    drop(outputs);
    for archive in &mut archives {
        archive.close_all();
    }
    if let Some(sink) = &mut combined {
        if let CombinedSink::Stdout(out) = sink {
            let _ = out.flush();
        }
    }
    drop(combined);

    result?;

    for entry in files.iter() {
        if entry.bytes_written > 0 {
            debug!(
                "Wrote {} bytes from file {}",
                entry.bytes_written,
                entry.display_path().display()
            );
        }
    }

    // Remove the .orig shadows only after a fully successful pass.
    if config.remove_backups && config.output_file.is_none() {
        for entry in files.iter() {
            if entry.out_path.is_some() {
                if let Err(err) = std::fs::remove_file(&entry.in_path) {
                    warn!("Cannot remove {}: {err}", entry.in_path.display());
                }
            }
        }
    }

    totals.records += summary.records;
    totals.bytes += summary.bytes;
    info!(
        "Wrote {} bytes of {} records to output file(s)",
        summary.bytes, summary.records
    );

    Ok(summary)
}

fn open_combined(config: &SelectConfig, totals: &WriteTotals) -> Result<Option<CombinedSink>> {
    let Some(path) = &config.output_file else {
        return Ok(None);
    };
    if path.as_os_str() == "-" {
        return Ok(Some(CombinedSink::Stdout(io::stdout())));
    }
    // First pass truncates, later passes append.
    let mut options = std::fs::OpenOptions::new();
    options.create(true).write(true);
    if totals.bytes > 0 {
        options.append(true);
    } else {
        options.truncate(true);
    }
    let file = options.open(path).map_err(|e| SiftError::io(path, e))?;
    Ok(Some(CombinedSink::File(file)))
}

#[allow(clippy::too_many_arguments)]
fn write_loop(
    config: &SelectConfig,
    files: &mut FileTable,
    group: &mut TraceGroup,
    scratch: &mut [u8],
    combined: &mut Option<CombinedSink>,
    archives: &mut [Archive],
    inputs: &mut HashMap<FileId, File>,
    outputs: &mut HashMap<FileId, File>,
    summary: &mut WriteSummary,
) -> Result<()> {
    for ti in 0..group.len() {
        let period = hpt::sample_period(group.traces()[ti].samprate);

        for idx in group.traces()[ti].recmap.indices() {
            let rec = *group.traces()[ti].recmap.get(idx);
            if rec.is_deleted() {
                continue;
            }

            let reclen = rec.reclen as usize;
            if reclen > scratch.len() {
                return Err(SiftError::OversizeRecord {
                    reclen,
                    buflen: scratch.len(),
                });
            }

            let in_path = files.get(rec.file).in_path.clone();
            if !inputs.contains_key(&rec.file) {
                let file = File::open(&in_path).map_err(|e| SiftError::io(&in_path, e))?;
                inputs.insert(rec.file, file);
            }
            let input = inputs.get_mut(&rec.file).expect("opened above");
            input
                .seek(SeekFrom::Start(rec.offset))
                .map_err(|e| SiftError::io(&in_path, e))?;
            input
                .read_exact(&mut scratch[..reclen])
                .map_err(|e| SiftError::io(&in_path, e))?;

            if rec.new_start.is_some() || rec.new_end.is_some() {
                match trim::trim_record(&rec, scratch) {
                    Ok(TrimOutcome::Trimmed) => {}
                    Ok(TrimOutcome::Empty) => {
                        debug!("Trim left no samples, dropping record");
                        group.trace_mut(ti).recmap.mark_deleted(idx);
                        continue;
                    }
                    Err(err) => {
                        // The record stays in its chain so counters remain
                        // accurate; its bytes are not written.
                        error!("Cannot trim record from {}: {err}", in_path.display());
                        continue;
                    }
                }
            }

            if let Some(quality) = config.restamp_quality {
                debug!("Re-stamping data quality indicator to '{quality}'");
                scratch[6] = quality as u8;
            }
            let bytes = &scratch[..reclen];

            if let Some(sink) = combined {
                sink.write_all(bytes).map_err(SiftError::from)?;
            }

            if !archives.is_empty() {
                match mseed::parse_header(bytes) {
                    Ok(hdr) => {
                        for archive in archives.iter_mut() {
                            if let Err(err) = archive.stream_rec(&hdr, bytes) {
                                error!("Archive write failed: {err}");
                            }
                        }
                    }
                    Err(err) => {
                        error!("Cannot parse record, skipping archives: {err}");
                    }
                }
            }

            if config.replace_input {
                let entry = files.get(rec.file);
                let out_path = entry
                    .out_path
                    .clone()
                    .expect("replace-input entries are shadowed during the read pass");
                if !outputs.contains_key(&rec.file) {
                    let file = File::create(&out_path).map_err(|e| SiftError::io(&out_path, e))?;
                    outputs.insert(rec.file, file);
                }
                let output = outputs.get_mut(&rec.file).expect("opened above");
                output
                    .write_all(bytes)
                    .map_err(|e| SiftError::io(&out_path, e))?;
            }

            let entry = files.get_mut(rec.file);
            if entry.earliest.is_none_or(|t| t > rec.start) {
                entry.earliest = Some(rec.start);
            }
            if entry.latest.is_none_or(|t| t < rec.end) {
                entry.latest = Some(rec.end + period);
            }
            entry.bytes_written += reclen as u64;

            summary.records += 1;
            summary.bytes += reclen as u64;
        }
    }

    Ok(())
}
