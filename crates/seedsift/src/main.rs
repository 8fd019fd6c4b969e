//! seedsift - Mini-SEED data selection tool.
//!
//! Reads Mini-SEED files, applies filtering criteria, and outputs the
//! matched data in time order, optionally pruning overlap at record or
//! sample level and splitting records on day, hour or minute boundaries.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use regex::Regex;
use tracing_subscriber::EnvFilter;

use seedsift::archive;
use seedsift::config::{PruneMode, SelectConfig, SplitBoundary};
use seedsift::hpt::{self, Quality};
use seedsift::pod;
use seedsift::select::Session;

#[derive(Parser, Debug)]
#[command(name = "seedsift")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Input Mini-SEED files
    files: Vec<PathBuf>,

    /// Increase diagnostic output (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Limit to records on or after this time (ISO or YYYY,DDD,HH:MM:SS)
    #[arg(long = "ts", value_name = "TIME")]
    start_time: Option<String>,

    /// Limit to records on or before this time
    #[arg(long = "te", value_name = "TIME")]
    end_time: Option<String>,

    /// Continuity time tolerance in seconds (default: half a sample period)
    #[arg(long = "tt", value_name = "SECS", default_value_t = -1.0, allow_hyphen_values = true)]
    time_tol: f64,

    /// Sample rate tolerance (default: codec convention)
    #[arg(long = "rt", value_name = "TOL", default_value_t = -1.0, allow_hyphen_values = true)]
    rate_tol: f64,

    /// Do not prioritize data by quality when pruning
    #[arg(short = 'E', long)]
    no_best_quality: bool,

    /// Prune overlap at record or sample level
    #[arg(short = 'P', long, value_name = "MODE")]
    prune: Option<PruneArg>,

    /// Split records crossing day, hour or minute boundaries
    #[arg(short = 'S', long, value_name = "BOUNDARY")]
    split: Option<SplitArg>,

    /// Keep only records matching this regex (@file reads patterns from a
    /// file, one per line, combined with OR)
    #[arg(short = 'm', long = "match", value_name = "REGEX")]
    match_pattern: Option<String>,

    /// Drop records matching this regex (@file as with --match)
    #[arg(short = 'r', long, value_name = "REGEX")]
    reject_pattern: Option<String>,

    /// Re-stamp the quality indicator of all output records
    #[arg(short = 'Q', value_name = "QUALITY")]
    restamp: Option<char>,

    /// Replace input files, keeping .orig backups
    #[arg(short = 'R', long)]
    replace: bool,

    /// With --replace, remove the .orig backups after writing
    #[arg(long = "nb")]
    no_backups: bool,

    /// Write all output to a single file ("-" for stdout)
    #[arg(short = 'o', long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Archive records under a custom path template
    #[arg(short = 'A', long = "archive", value_name = "TEMPLATE")]
    archives: Vec<String>,

    /// Archive records in a channel tree under this directory
    #[arg(long = "chan", value_name = "DIR")]
    chan_dirs: Vec<PathBuf>,

    /// Archive records in a channel-day tree under this directory
    #[arg(long = "cday", value_name = "DIR")]
    cday_dirs: Vec<PathBuf>,

    /// Archive records in a BUD tree under this directory
    #[arg(long = "bud", value_name = "DIR")]
    bud_dirs: Vec<PathBuf>,

    /// Archive records in a CSS tree under this directory
    #[arg(long = "css", value_name = "DIR")]
    css_dirs: Vec<PathBuf>,

    /// Prune a POD structure: request file and data directory
    #[arg(long = "pod", num_args = 2, value_names = ["REQUESTFILE", "DATADIR"])]
    pod: Vec<PathBuf>,

    /// Print a basic summary after reading all files
    #[arg(long)]
    sum: bool,

    /// Print a per-file modification summary after processing
    #[arg(long = "mod")]
    mod_summary: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PruneArg {
    #[value(alias = "r")]
    Record,
    #[value(alias = "s")]
    Sample,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SplitArg {
    #[value(alias = "d")]
    Day,
    #[value(alias = "h")]
    Hour,
    #[value(alias = "m")]
    Minute,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = build_config(&cli)?;

    if !cli.pod.is_empty() {
        if !cli.files.is_empty() {
            bail!("cannot specify both input files and a POD structure");
        }
        pod::process_pod(&cli.pod[0], &cli.pod[1], &config)
            .context("processing POD structure")?;
        return Ok(());
    }

    if cli.files.is_empty() {
        bail!("no input files were specified");
    }

    let mut session = Session::new(config);
    for file in &cli.files {
        session.add_file(file);
    }

    let read = session.read_files().context("reading input files")?;
    if cli.sum {
        println!("{read}");
    }

    session.process().context("writing output")?;

    if cli.mod_summary {
        print_mod_summary(&session, cli.verbose > 0);
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(cli: &Cli) -> Result<SelectConfig> {
    let mut config = SelectConfig::default();

    config.best_quality = !cli.no_best_quality;
    config.time_tol = cli.time_tol;
    config.samp_rate_tol = cli.rate_tol;
    config.prune = match cli.prune {
        None => PruneMode::Off,
        Some(PruneArg::Record) => PruneMode::Record,
        Some(PruneArg::Sample) => PruneMode::Sample,
    };
    config.split = match cli.split {
        None => SplitBoundary::None,
        Some(SplitArg::Day) => SplitBoundary::Day,
        Some(SplitArg::Hour) => SplitBoundary::Hour,
        Some(SplitArg::Minute) => SplitBoundary::Minute,
    };

    if let Some(s) = &cli.start_time {
        config.window_start =
            Some(hpt::parse_time(s).with_context(|| format!("invalid start time: {s}"))?);
    }
    if let Some(s) = &cli.end_time {
        config.window_end =
            Some(hpt::parse_time(s).with_context(|| format!("invalid end time: {s}"))?);
    }

    if let Some(pattern) = &cli.match_pattern {
        config.match_regex = Some(compile_pattern(pattern).context("invalid match pattern")?);
    }
    if let Some(pattern) = &cli.reject_pattern {
        config.reject_regex = Some(compile_pattern(pattern).context("invalid reject pattern")?);
    }

    if let Some(quality) = cli.restamp {
        if !Quality::new(quality).is_valid_indicator() {
            bail!("invalid data quality indicator: '{quality}'");
        }
        config.restamp_quality = Some(quality);
    }

    config.replace_input = cli.replace;
    config.remove_backups = cli.no_backups;
    config.output_file = cli.output.clone();

    config.archives = cli.archives.clone();
    for dir in &cli.chan_dirs {
        config = config.with_archive(archive::layout_template(dir, archive::CHAN_LAYOUT));
    }
    for dir in &cli.cday_dirs {
        config = config.with_archive(archive::layout_template(dir, archive::CDAY_LAYOUT));
    }
    for dir in &cli.bud_dirs {
        config = config.with_archive(archive::layout_template(dir, archive::BUD_LAYOUT));
    }
    for dir in &cli.css_dirs {
        config = config.with_archive(archive::layout_template(dir, archive::CSS_LAYOUT));
    }

    Ok(config)
}

/// Compiles a filter pattern; an `@file` argument reads one pattern per
/// line and combines them with OR.
fn compile_pattern(pattern: &str) -> Result<Regex> {
    let combined = match pattern.strip_prefix('@') {
        None => pattern.to_string(),
        Some(path) => {
            let content =
                fs::read_to_string(path).with_context(|| format!("reading pattern file {path}"))?;
            let lines: Vec<&str> = content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .collect();
            if lines.is_empty() {
                bail!("pattern file {path} holds no patterns");
            }
            format!("({})", lines.join(")|("))
        }
    };
    Ok(Regex::new(&combined)?)
}

fn print_mod_summary(session: &Session, include_unmodified: bool) {
    println!("File modification summary:");
    for entry in session.files().iter() {
        if !include_unmodified && !entry.modified() {
            continue;
        }
        println!(
            " Records split: {:3} trimmed: {:3} removed: {:3}, Segments reordered: {:3} :: {}",
            entry.split_count,
            entry.trimmed_count,
            entry.removed_count,
            entry.reorder_count,
            entry.display_path().display()
        );
    }
}
