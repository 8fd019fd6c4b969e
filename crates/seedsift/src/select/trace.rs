//! Traces and the trace group: channel aggregation under tolerances.
//!
//! A [`Trace`] aggregates a channel's contiguous-or-near-contiguous records:
//! identity, effective sample rate, envelope times and the record map of the
//! physical records that built it. The [`TraceGroup`] routes newly-read
//! records to an existing trace or starts a new one, and reports where each
//! record landed so the reader can splice its descriptor at the right end of
//! the chain.

use crate::hpt::{self, Hpt, Quality};
use crate::mseed::ChannelId;
use crate::select::record::RecordMap;

/// Where a record landed relative to its trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// The record started a new trace.
    New,
    /// The record extended the end of an existing trace.
    Tail,
    /// The record extended the beginning of an existing trace.
    Head,
    /// The record matched a trace but fits neither endpoint; the caller
    /// must log and skip it.
    Inside,
}

/// Aggregate of one channel's continuous records.
#[derive(Debug)]
pub struct Trace {
    /// Channel identity.
    pub id: ChannelId,
    /// Quality of the records aggregated into this trace.
    pub quality: Quality,
    /// Effective sample rate in Hz.
    pub samprate: f64,
    /// Earliest sample time.
    pub start: Hpt,
    /// Latest sample time.
    pub end: Hpt,
    /// Total samples across aggregated records.
    pub samplecnt: u64,
    /// Time-ordered chain of contributing record descriptors.
    pub recmap: RecordMap,
}

impl Trace {
    fn new(id: ChannelId, quality: Quality, samprate: f64, start: Hpt, end: Hpt) -> Self {
        Self {
            id,
            quality,
            samprate,
            start,
            end,
            samplecnt: 0,
            recmap: RecordMap::new(),
        }
    }

    /// Returns the trace time span in ticks.
    pub fn span(&self) -> Hpt {
        self.end - self.start
    }
}

/// Ordered collection of traces for all channels in a pass.
#[derive(Debug, Default)]
pub struct TraceGroup {
    traces: Vec<Trace>,
}

impl TraceGroup {
    /// Creates an empty trace group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of traces.
    pub fn len(&self) -> usize {
        self.traces.len()
    }

    /// Returns true when the group holds no traces.
    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    /// Returns the traces in their current order.
    pub fn traces(&self) -> &[Trace] {
        &self.traces
    }

    /// Returns a mutable trace by index.
    pub fn trace_mut(&mut self, idx: usize) -> &mut Trace {
        &mut self.traces[idx]
    }

    /// Drops all traces and their record maps.
    pub fn clear(&mut self) {
        self.traces.clear();
    }

    /// Routes a record into the group.
    ///
    /// The record joins an existing trace when identity matches, the sample
    /// rates agree within `samp_rate_tol`, and its span sits within
    /// `time_tol` of one of the trace's endpoints; otherwise a new trace is
    /// created. With `best_quality` set, traces refuse records of a
    /// different quality. Returns the owning trace index and the placement
    /// of the record relative to that trace's prior envelope.
    #[allow(clippy::too_many_arguments)]
    pub fn add_record(
        &mut self,
        id: &ChannelId,
        quality: Quality,
        samprate: f64,
        start: Hpt,
        end: Hpt,
        samplecnt: u64,
        best_quality: bool,
        time_tol: f64,
        samp_rate_tol: f64,
    ) -> (usize, Placement) {
        let period = hpt::sample_period(samprate);
        let tol = hpt::time_tolerance(time_tol, samprate);
        let zero_span = start == end;

        for (idx, trace) in self.traces.iter_mut().enumerate() {
            if trace.id != *id || !hpt::rate_tolerable(trace.samprate, samprate, samp_rate_tol) {
                continue;
            }
            if best_quality && trace.quality != quality {
                continue;
            }

            if zero_span {
                // Span-less records never extend coverage; adopt the trace
                // when the record sits near either endpoint.
                if (start - trace.end).abs() <= tol || (start - trace.start).abs() <= tol {
                    let placement = if (start - trace.end).abs() < (start - trace.start).abs() {
                        Placement::Tail
                    } else {
                        Placement::Head
                    };
                    return (idx, placement);
                }
                continue;
            }

            // Fits after the trace end.
            if (start - (trace.end + period)).abs() <= tol {
                if end > trace.end {
                    trace.end = end;
                }
                trace.samplecnt += samplecnt;
                let placement = classify(trace, start, end);
                return (idx, placement);
            }

            // Fits before the trace start.
            if ((end + period) - trace.start).abs() <= tol {
                if start < trace.start {
                    trace.start = start;
                }
                trace.samplecnt += samplecnt;
                let placement = classify(trace, start, end);
                return (idx, placement);
            }
        }

        let mut trace = Trace::new(id.clone(), quality, samprate, start, end);
        trace.samplecnt = samplecnt;
        self.traces.push(trace);
        (self.traces.len() - 1, Placement::New)
    }

    /// Sorts traces for iteration: channel identity ascending, sample rate
    /// ascending, start time ascending, end time descending so that longer
    /// traces precede shorter ones with the same start.
    pub fn sort(&mut self) {
        self.traces.sort_by(|a, b| {
            a.id.cmp(&b.id)
                .then_with(|| a.samprate.total_cmp(&b.samprate))
                .then_with(|| a.start.cmp(&b.start))
                .then_with(|| b.end.cmp(&a.end))
        });
    }
}

fn classify(trace: &Trace, start: Hpt, end: Hpt) -> Placement {
    if trace.end == end {
        Placement::Tail
    } else if trace.start == start {
        Placement::Head
    } else {
        Placement::Inside
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(chan: &str) -> ChannelId {
        ChannelId {
            network: "IU".into(),
            station: "ANMO".into(),
            location: "00".into(),
            channel: chan.into(),
        }
    }

    const SEC: Hpt = 1_000_000;

    fn add(
        group: &mut TraceGroup,
        chan: &str,
        quality: Quality,
        start: Hpt,
        end: Hpt,
        best_quality: bool,
    ) -> (usize, Placement) {
        group.add_record(&id(chan), quality, 1.0, start, end, 10, best_quality, -1.0, -1.0)
    }

    #[test]
    fn test_new_then_tail_then_head() {
        let mut group = TraceGroup::new();

        let (t0, p) = add(&mut group, "BHZ", Quality::D, 10 * SEC, 19 * SEC, true);
        assert_eq!(p, Placement::New);

        // Next record starts exactly one period after the trace end.
        let (t1, p) = add(&mut group, "BHZ", Quality::D, 20 * SEC, 29 * SEC, true);
        assert_eq!(t1, t0);
        assert_eq!(p, Placement::Tail);
        assert_eq!(group.traces()[t0].end, 29 * SEC);

        let (t2, p) = add(&mut group, "BHZ", Quality::D, 0, 9 * SEC, true);
        assert_eq!(t2, t0);
        assert_eq!(p, Placement::Head);
        assert_eq!(group.traces()[t0].start, 0);
        assert_eq!(group.traces()[t0].samplecnt, 30);
    }

    #[test]
    fn test_gap_creates_new_trace() {
        let mut group = TraceGroup::new();
        add(&mut group, "BHZ", Quality::D, 0, 9 * SEC, true);
        let (t, p) = add(&mut group, "BHZ", Quality::D, 100 * SEC, 109 * SEC, true);
        assert_eq!(p, Placement::New);
        assert_eq!(t, 1);
        assert_eq!(group.len(), 2);
    }

    #[test]
    fn test_best_quality_refuses_mixed_merge() {
        let mut group = TraceGroup::new();
        add(&mut group, "BHZ", Quality::D, 0, 9 * SEC, true);
        let (_, p) = add(&mut group, "BHZ", Quality::R, 10 * SEC, 19 * SEC, true);
        assert_eq!(p, Placement::New);
        assert_eq!(group.len(), 2);

        // Without best-quality the same record merges.
        let mut group = TraceGroup::new();
        add(&mut group, "BHZ", Quality::D, 0, 9 * SEC, false);
        let (_, p) = add(&mut group, "BHZ", Quality::R, 10 * SEC, 19 * SEC, false);
        assert_eq!(p, Placement::Tail);
    }

    #[test]
    fn test_zero_span_picks_nearest_endpoint() {
        let mut group = TraceGroup::new();
        add(&mut group, "BHZ", Quality::D, 0, 10 * SEC, true);

        let (t, p) = add(&mut group, "BHZ", Quality::D, 10 * SEC, 10 * SEC, true);
        assert_eq!(t, 0);
        assert_eq!(p, Placement::Tail);
        // Envelope unchanged by span-less records.
        assert_eq!(group.traces()[0].end, 10 * SEC);

        let (_, p) = add(&mut group, "BHZ", Quality::D, 0, 0, true);
        assert_eq!(p, Placement::Head);
    }

    #[test]
    fn test_interior_duplicate_is_inside() {
        let mut group = TraceGroup::new();
        add(&mut group, "BHZ", Quality::D, 0, 100 * SEC, true);
        // Malformed record whose end precedes its start: it fits at the tail
        // within tolerance but extends neither envelope endpoint.
        let (_, p) = add(&mut group, "BHZ", Quality::D, 101 * SEC, 50 * SEC, true);
        assert_eq!(p, Placement::Inside);
    }

    #[test]
    fn test_sort_order() {
        let mut group = TraceGroup::new();
        add(&mut group, "LHZ", Quality::D, 0, 10 * SEC, true);
        add(&mut group, "BHZ", Quality::D, 5 * SEC, 30 * SEC, true);
        add(&mut group, "BHZ", Quality::R, 5 * SEC, 50 * SEC, true);

        group.sort();
        let traces = group.traces();
        // Same channel and start: longer trace first; LHZ sorts last.
        assert_eq!(traces[0].id.channel, "BHZ");
        assert_eq!(traces[0].end, 50 * SEC);
        assert_eq!(traces[1].id.channel, "BHZ");
        assert_eq!(traces[1].end, 30 * SEC);
        assert_eq!(traces[2].id.channel, "LHZ");
    }
}
