//! Selection configuration.

use std::path::PathBuf;

use regex::Regex;

use crate::hpt::Hpt;

/// Overlap pruning mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PruneMode {
    /// No pruning; records pass through in time order.
    #[default]
    Off,
    /// Delete only records completely covered by higher priority data.
    Record,
    /// Additionally trim partially-covered records at sample granularity.
    Sample,
}

/// Record splitting boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SplitBoundary {
    /// No splitting.
    #[default]
    None,
    /// Split records straddling 00:00:00 UTC.
    Day,
    /// Split records straddling the top of an hour.
    Hour,
    /// Split records straddling the top of a minute.
    Minute,
}

/// Options controlling a selection run.
///
/// The defaults match the tool's behavior with no flags: best-quality
/// priority on, no pruning, automatic tolerances, no filters and no sinks
/// beyond replacing nothing.
#[derive(Debug, Clone)]
pub struct SelectConfig {
    /// Prefer Q over D over R when pruning; traces refuse to merge records
    /// of different qualities.
    pub best_quality: bool,
    /// Overlap pruning mode.
    pub prune: PruneMode,
    /// Continuity time tolerance in seconds; negative selects half a sample
    /// period.
    pub time_tol: f64,
    /// Sample rate match tolerance; negative selects the codec default.
    pub samp_rate_tol: f64,
    /// Overwrite the quality indicator of every written record.
    pub restamp_quality: Option<char>,
    /// Drop records ending before this time; with sample pruning, trim
    /// records straddling it.
    pub window_start: Option<Hpt>,
    /// Drop records starting after this time; with sample pruning, trim
    /// records straddling it.
    pub window_end: Option<Hpt>,
    /// Keep only records whose `NET_STA_LOC_CHAN_QUAL` matches.
    pub match_regex: Option<Regex>,
    /// Drop records whose `NET_STA_LOC_CHAN_QUAL` matches.
    pub reject_regex: Option<Regex>,
    /// Boundary splitting mode.
    pub split: SplitBoundary,
    /// Shadow each input as `name.orig` and rewrite the original name.
    pub replace_input: bool,
    /// Remove the `.orig` shadows after a successful write pass.
    pub remove_backups: bool,
    /// Combined output file; `-` writes to stdout.
    pub output_file: Option<PathBuf>,
    /// Archive path templates, each an additional sink.
    pub archives: Vec<String>,
}

impl Default for SelectConfig {
    fn default() -> Self {
        Self {
            best_quality: true,
            prune: PruneMode::Off,
            time_tol: -1.0,
            samp_rate_tol: -1.0,
            restamp_quality: None,
            window_start: None,
            window_end: None,
            match_regex: None,
            reject_regex: None,
            split: SplitBoundary::None,
            replace_input: false,
            remove_backups: false,
            output_file: None,
            archives: Vec::new(),
        }
    }
}

impl SelectConfig {
    /// Sets the pruning mode.
    pub fn with_prune(mut self, prune: PruneMode) -> Self {
        self.prune = prune;
        self
    }

    /// Enables or disables quality-based priority.
    pub fn with_best_quality(mut self, best_quality: bool) -> Self {
        self.best_quality = best_quality;
        self
    }

    /// Sets the continuity time tolerance in seconds.
    pub fn with_time_tol(mut self, time_tol: f64) -> Self {
        self.time_tol = time_tol;
        self
    }

    /// Sets the sample rate tolerance.
    pub fn with_samp_rate_tol(mut self, samp_rate_tol: f64) -> Self {
        self.samp_rate_tol = samp_rate_tol;
        self
    }

    /// Sets the time window.
    pub fn with_window(mut self, start: Option<Hpt>, end: Option<Hpt>) -> Self {
        self.window_start = start;
        self.window_end = end;
        self
    }

    /// Sets the boundary splitting mode.
    pub fn with_split(mut self, split: SplitBoundary) -> Self {
        self.split = split;
        self
    }

    /// Sets the combined output file.
    pub fn with_output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_file = Some(path.into());
        self
    }

    /// Enables input replacement, optionally removing the `.orig` backups.
    pub fn with_replace_input(mut self, remove_backups: bool) -> Self {
        self.replace_input = true;
        self.remove_backups = remove_backups;
        self
    }

    /// Sets the positive match filter.
    pub fn with_match_regex(mut self, regex: Regex) -> Self {
        self.match_regex = Some(regex);
        self
    }

    /// Sets the negative reject filter.
    pub fn with_reject_regex(mut self, regex: Regex) -> Self {
        self.reject_regex = Some(regex);
        self
    }

    /// Sets the quality restamp character.
    pub fn with_restamp_quality(mut self, quality: char) -> Self {
        self.restamp_quality = Some(quality);
        self
    }

    /// Adds an archive path template sink.
    pub fn with_archive(mut self, template: impl Into<String>) -> Self {
        self.archives.push(template.into());
        self
    }
}
