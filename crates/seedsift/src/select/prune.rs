//! Overlap pruning across same-channel traces.
//!
//! Every ordered pair of traces with the same channel identity and a
//! tolerable sample-rate difference is tested for temporal overlap. The
//! higher-priority trace keeps its coverage; records of the lower-priority
//! trace that it fully covers are deleted, and with sample-level pruning the
//! partially-covered records at the coverage edges are marked for trimming.
//!
//! The quadratic pair loop is fine in practice: traces are few compared to
//! records, and the per-pair work is linearized by coalescing the
//! higher-priority record map into coverage segments first.

use std::cmp::Ordering;

use tracing::debug;

use crate::config::{PruneMode, SelectConfig};
use crate::hpt::{self, Hpt};
use crate::select::read::FileTable;
use crate::select::trace::TraceGroup;

/// Prunes redundant coverage from the group.
///
/// The group must already be in iteration order (see
/// [`TraceGroup::sort`]). Returns the number of record modifications.
pub fn prune_traces(config: &SelectConfig, group: &mut TraceGroup, files: &mut FileTable) -> u64 {
    let mut modcount = 0;

    for i in 0..group.len() {
        for j in (i + 1)..group.len() {
            let a = &group.traces()[i];
            let b = &group.traces()[j];

            if a.id != b.id || !hpt::rate_tolerable(a.samprate, b.samprate, config.samp_rate_tol) {
                continue;
            }
            if !(a.end > b.start && a.start < b.end) {
                continue;
            }

            // Priority: quality when requested, then the longer span, with
            // ties keeping the earlier trace in iteration order.
            let mut priority = Ordering::Equal;
            if config.best_quality {
                priority = a.quality.cmp_priority(b.quality);
            }
            if priority == Ordering::Equal {
                priority = if a.span() >= b.span() {
                    Ordering::Greater
                } else {
                    Ordering::Less
                };
            }

            let (hp, lp) = if priority == Ordering::Greater {
                (i, j)
            } else {
                (j, i)
            };
            modcount += trim_traces(config, group, files, lp, hp);
        }
    }

    modcount
}

/// One contiguous span of higher-priority coverage.
type Segment = (Hpt, Hpt);

/// Marks or trims lower-priority records covered by the higher-priority
/// trace. Returns the number of record modifications.
fn trim_traces(
    config: &SelectConfig,
    group: &mut TraceGroup,
    files: &mut FileTable,
    lp: usize,
    hp: usize,
) -> u64 {
    let hp_trace = &group.traces()[hp];
    let period = hpt::sample_period(hp_trace.samprate);
    let tol = hpt::time_tolerance(config.time_tol, hp_trace.samprate);

    // Coalesce the HP record map into coverage segments. Records are in
    // time order; a new segment starts at any break larger than the
    // tolerance. This keeps the LP walk linear in its record count.
    let mut segments: Vec<Segment> = Vec::new();
    for (_, rec) in hp_trace.recmap.iter() {
        if rec.is_deleted() {
            continue;
        }
        let (eff_start, eff_end) = (rec.eff_start(), rec.eff_end());
        match segments.last_mut() {
            Some(seg) if ((seg.1 + period) - eff_start).abs() <= tol => seg.1 = eff_end,
            _ => segments.push((eff_start, eff_end)),
        }
    }

    // Sample-level edge trims compare against the whole HP envelope rather
    // than per segment; trimming across interior HP gaps loses nothing the
    // HP trace does not already cover.
    let (hp_start, hp_end) = (hp_trace.start, hp_trace.end);
    let lp_id = hp_trace.id.clone();

    let mut modcount = 0;
    let lp_trace = group.trace_mut(lp);
    for idx in lp_trace.recmap.indices() {
        let rec = *lp_trace.recmap.get(idx);
        if rec.is_deleted() {
            continue;
        }
        let (eff_start, eff_end) = (rec.eff_start(), rec.eff_end());

        if segments
            .iter()
            .any(|&(s, e)| eff_start >= s && eff_end <= e)
        {
            debug!(
                "Removing record {lp_id} ({}) :: {}  {}",
                rec.quality,
                hpt::format_time(rec.start),
                hpt::format_time(rec.end)
            );
            lp_trace.recmap.mark_deleted(idx);
            files.get_mut(rec.file).removed_count += 1;
            modcount += 1;
            continue;
        }

        if config.prune == PruneMode::Sample {
            let mut trimmed = false;
            if eff_start <= hp_start && eff_end >= hp_start {
                lp_trace.recmap.get_mut(idx).new_end = Some(hp_start - period);
                trimmed = true;
            }
            if eff_start <= hp_end && eff_end >= hp_end {
                lp_trace.recmap.get_mut(idx).new_start = Some(hp_end + period);
                trimmed = true;
            }
            if trimmed {
                files.get_mut(rec.file).trimmed_count += 1;
                modcount += 1;
            }
        }
    }

    modcount
}
