//! POD request-file driver.
//!
//! A POD structure is a directory of per-station data files plus a request
//! file of tab-separated lines describing the data each file holds. The
//! driver groups the data files by channel, prunes each group with its own
//! pass, and rewrites the request file so its time ranges reflect what
//! actually survived. Files whose data was pruned away entirely are dropped
//! from the request file.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::config::SelectConfig;
use crate::error::{Result, SiftError};
use crate::hpt::{self, HPT_MODULUS};
use crate::limits;
use crate::select::Session;

/// One line of the request file.
#[derive(Debug, Clone)]
pub struct ReqRec {
    /// Station code.
    pub station: String,
    /// Network code.
    pub network: String,
    /// Channel code.
    pub channel: String,
    /// Location identifier.
    pub location: String,
    /// Start of the data the file holds, epoch seconds.
    pub data_start: i64,
    /// End of the data the file holds, epoch seconds.
    pub data_end: i64,
    /// Data file name relative to the station directory.
    pub filename: String,
    /// Header directory field, carried through verbatim.
    pub header_dir: String,
    /// Requested range start, epoch seconds.
    pub req_start: i64,
    /// Requested range end, epoch seconds.
    pub req_end: i64,
    pruned: bool,
    remove: bool,
}

impl ReqRec {
    fn same_channel(&self, other: &ReqRec) -> bool {
        self.network == other.network
            && self.station == other.station
            && self.location == other.location
            && self.channel == other.channel
    }
}

/// Prunes a POD structure in place.
///
/// Data files are grouped by channel and each group is pruned in its own
/// pass; the request file is then rewritten (the original kept as `.orig`).
pub fn process_pod(request_file: &Path, data_dir: &Path, config: &SelectConfig) -> Result<()> {
    let mut reqrecs = read_req_file(request_file, data_dir)?;

    for hound in 0..reqrecs.len() {
        if reqrecs[hound].pruned {
            continue;
        }

        // Collect every not-yet-pruned file for this channel.
        let mut members = vec![hound];
        reqrecs[hound].pruned = true;
        for fox in (hound + 1)..reqrecs.len() {
            if !reqrecs[fox].pruned && reqrecs[fox].same_channel(&reqrecs[hound]) {
                reqrecs[fox].pruned = true;
                members.push(fox);
            }
        }

        // Each file is held open twice during the pass, plus wiggle room.
        let wanted = (members.len() as u64) * 2 + 20;
        if let Err(err) = limits::raise_open_files(wanted) {
            warn!("Skipping channel group of {} files: {err}", members.len());
            continue;
        }

        let mut session = Session::new(config.clone());
        for &ridx in &members {
            session.add_file(data_path(data_dir, &reqrecs[ridx]));
        }
        session.read_files()?;
        session.process()?;

        // Feed surviving coverage back into the request records.
        for (fid, &ridx) in members.iter().enumerate() {
            let entry = session.files().get(fid);
            let rec = &mut reqrecs[ridx];
            if entry.bytes_written == 0 {
                debug!("No coverage left for {}", rec.filename);
                rec.remove = true;
            } else {
                if let Some(earliest) = entry.earliest {
                    rec.data_start = earliest / HPT_MODULUS;
                }
                if let Some(latest) = entry.latest {
                    rec.data_end = latest / HPT_MODULUS;
                }
            }
        }
    }

    reqrecs.retain(|rec| !rec.remove);

    // Shadow the request file like any replaced input, then rewrite it.
    let mut shadow = request_file.to_path_buf().into_os_string();
    shadow.push(".orig");
    let shadow = PathBuf::from(shadow);
    if let Err(err) = fs::rename(request_file, &shadow) {
        error!(
            "Cannot rename {} -> {}: {err}",
            request_file.display(),
            shadow.display()
        );
    }

    write_req_file(request_file, &reqrecs)
}

fn data_path(data_dir: &Path, rec: &ReqRec) -> PathBuf {
    data_dir.join(&rec.station).join(&rec.filename)
}

/// Parses a request file into records, merging lines for the same file.
///
/// A data file may be referenced by several request lines; they collapse
/// into one record spanning the outermost times. Lines whose data file is
/// missing are kept as placeholders but never processed.
pub fn read_req_file(request_file: &Path, data_dir: &Path) -> Result<Vec<ReqRec>> {
    let file = fs::File::open(request_file).map_err(|e| SiftError::io(request_file, e))?;
    let mut recs: Vec<ReqRec> = Vec::new();
    let mut lines = 0u64;

    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| SiftError::io(request_file, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let mut rec = match parse_req_line(&line) {
            Ok(rec) => rec,
            Err(err) => {
                debug!("Skipping request line: {err}");
                continue;
            }
        };
        lines += 1;

        if !data_path(data_dir, &rec).is_file() {
            warn!(
                "Cannot find file '{}', keeping a placeholder",
                data_path(data_dir, &rec).display()
            );
            rec.pruned = true;
        }

        match recs.iter_mut().find(|r| r.filename == rec.filename) {
            Some(existing) => {
                // A file never holds more than one channel; merge the times.
                existing.data_start = existing.data_start.min(rec.data_start);
                existing.data_end = existing.data_end.max(rec.data_end);
                existing.req_start = existing.req_start.min(rec.req_start);
                existing.req_end = existing.req_end.max(rec.req_end);
            }
            None => recs.push(rec),
        }
    }

    info!("Read {lines} request records (lines)");
    Ok(recs)
}

fn parse_req_line(line: &str) -> Result<ReqRec> {
    let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
    if fields.len() != 10 {
        return Err(SiftError::MalformedRequest(line.to_string()));
    }

    let time = |s: &str| {
        hpt::parse_time(s)
            .map(|t| t / HPT_MODULUS)
            .ok_or_else(|| SiftError::MalformedRequest(line.to_string()))
    };

    Ok(ReqRec {
        station: fields[0].to_string(),
        network: fields[1].to_string(),
        channel: fields[2].to_string(),
        location: fields[3].to_string(),
        data_start: time(fields[4])?,
        data_end: time(fields[5])?,
        filename: fields[6].to_string(),
        header_dir: fields[7].to_string(),
        req_start: time(fields[8])?,
        req_end: time(fields[9])?,
        pruned: false,
        remove: false,
    })
}

/// Writes the request records back out in the tab-separated format.
pub fn write_req_file(request_file: &Path, recs: &[ReqRec]) -> Result<()> {
    let mut file = fs::File::create(request_file).map_err(|e| SiftError::io(request_file, e))?;

    for rec in recs {
        writeln!(
            file,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            rec.station,
            rec.network,
            rec.channel,
            rec.location,
            req_time(rec.data_start),
            req_time(rec.data_end),
            rec.filename,
            rec.header_dir,
            req_time(rec.req_start),
            req_time(rec.req_end),
        )
        .map_err(|e| SiftError::io(request_file, e))?;
    }

    info!("Wrote {} request records (lines)", recs.len());
    Ok(())
}

fn req_time(epoch_secs: i64) -> String {
    match DateTime::<Utc>::from_timestamp(epoch_secs, 0) {
        Some(dt) => dt.format("%Y,%j,%H:%M:%S").to_string(),
        None => format!("[{epoch_secs}]"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_req_line() {
        let line = "ANMO\tIU\tBHZ\t00\t2020,001,00:00:00\t2020,001,12:00:00\tANMO.BHZ.file\thdr\t2020,001,00:00:00\t2020,002,00:00:00";
        let rec = parse_req_line(line).unwrap();
        assert_eq!(rec.station, "ANMO");
        assert_eq!(rec.network, "IU");
        assert_eq!(rec.channel, "BHZ");
        assert_eq!(rec.location, "00");
        assert_eq!(rec.filename, "ANMO.BHZ.file");
        assert_eq!(rec.data_end - rec.data_start, 12 * 3600);
        assert_eq!(rec.req_end - rec.req_start, 24 * 3600);
    }

    #[test]
    fn test_parse_rejects_short_lines() {
        assert!(parse_req_line("ANMO\tIU\tBHZ").is_err());
    }

    #[test]
    fn test_req_time_format() {
        // 2020-02-05 13:45:59 UTC, day of year 36.
        let t = hpt::parse_time("2020,036,13:45:59").unwrap() / HPT_MODULUS;
        assert_eq!(req_time(t), "2020,036,13:45:59");
    }
}
