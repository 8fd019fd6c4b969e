//! Archive sinks: route records into a directory tree by path template.
//!
//! An archive evaluates a path template per record, substituting `%` tokens
//! from the record header, and appends the record bytes to the resolved
//! file. Handles are opened on first use and held for the duration of a
//! write pass.
//!
//! ## Template tokens
//!
//! | Token | Substitution            |
//! |-------|-------------------------|
//! | `%n`  | network code            |
//! | `%s`  | station code            |
//! | `%l`  | location identifier     |
//! | `%c`  | channel code            |
//! | `%q`  | quality indicator       |
//! | `%Y`  | year (4 digits)         |
//! | `%j`  | day of year (3 digits)  |
//! | `%H`  | hour (2 digits)         |
//! | `%M`  | minute (2 digits)       |
//! | `%S`  | second (2 digits)       |
//!
//! Times are taken from the record start time. Any other character after
//! `%` is kept literally.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Timelike};
use tracing::debug;

use crate::error::{Result, SiftError};
use crate::hpt;
use crate::mseed::MsHeader;

/// Channel layout: one file per channel.
pub const CHAN_LAYOUT: &str = "%n.%s.%l.%c";

/// Channel-day layout: one file per channel per day.
pub const CDAY_LAYOUT: &str = "%n.%s.%l.%c.%Y.%j";

/// BUD layout: network/station directories, one file per channel per day.
pub const BUD_LAYOUT: &str = "%n/%s/%s.%n.%l.%c.%Y.%j";

/// CSS-style layout: year/day directories.
pub const CSS_LAYOUT: &str = "%Y/%j/%s.%c.%Y:%j";

/// Joins a base directory and a layout into a full path template.
pub fn layout_template(base: impl AsRef<Path>, layout: &str) -> String {
    base.as_ref().join(layout).to_string_lossy().into_owned()
}

/// A record sink routing by path template.
#[derive(Debug)]
pub struct Archive {
    template: String,
    open: HashMap<PathBuf, File>,
}

impl Archive {
    /// Creates an archive from a full path template.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            open: HashMap::new(),
        }
    }

    /// Appends a record to the file its header resolves to.
    pub fn stream_rec(&mut self, hdr: &MsHeader, bytes: &[u8]) -> Result<()> {
        let path = PathBuf::from(resolve(&self.template, hdr));

        if !self.open.contains_key(&path) {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| SiftError::io(parent, e))?;
            }
            debug!("Opening archive file: {}", path.display());
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| SiftError::io(&path, e))?;
            self.open.insert(path.clone(), file);
        }

        let file = self.open.get_mut(&path).expect("inserted above");
        file.write_all(bytes).map_err(|e| SiftError::io(&path, e))
    }

    /// Closes every file handle held by the archive.
    pub fn close_all(&mut self) {
        self.open.clear();
    }
}

fn resolve(template: &str, hdr: &MsHeader) -> String {
    let dt = hpt::to_datetime(hdr.start);
    let mut out = String::with_capacity(template.len() + 16);
    let mut chars = template.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push_str(&hdr.id.network),
            Some('s') => out.push_str(&hdr.id.station),
            Some('l') => out.push_str(&hdr.id.location),
            Some('c') => out.push_str(&hdr.id.channel),
            Some('q') => out.push(hdr.quality.code()),
            Some('Y') => {
                if let Some(dt) = &dt {
                    out.push_str(&format!("{:04}", dt.year()));
                }
            }
            Some('j') => {
                if let Some(dt) = &dt {
                    out.push_str(&format!("{:03}", dt.ordinal()));
                }
            }
            Some('H') => {
                if let Some(dt) = &dt {
                    out.push_str(&format!("{:02}", dt.hour()));
                }
            }
            Some('M') => {
                if let Some(dt) = &dt {
                    out.push_str(&format!("{:02}", dt.minute()));
                }
            }
            Some('S') => {
                if let Some(dt) = &dt {
                    out.push_str(&format!("{:02}", dt.second()));
                }
            }
            Some(other) => out.push(other),
            None => break,
        }
    }

    out
}
