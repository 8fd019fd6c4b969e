//! Record descriptors and the per-trace record map.
//!
//! A [`RecordDesc`] is a lightweight index entry for one physical record:
//! where its bytes live, its time span, and optional trim marks. Descriptors
//! are held in a [`RecordMap`] arena owned by a trace: storage is a plain
//! vector, ordering is an intrusive doubly-linked chain of indices, so
//! head/tail splices stay O(1) and "removal" is marking the record deleted.

use crate::hpt::{Hpt, Quality};

/// Index of a file in the session's file table.
pub type FileId = usize;

/// Index of a descriptor within its record map.
pub type RecIdx = usize;

/// Index entry for one physical record.
///
/// A `reclen` of zero means the record is logically deleted: it stays in the
/// chain but contributes no bytes, no coverage, and no further trimming.
#[derive(Debug, Clone, Copy)]
pub struct RecordDesc {
    /// File the record lives in.
    pub file: FileId,
    /// Byte offset within the file.
    pub offset: u64,
    /// Record length in bytes; zero marks the record deleted.
    pub reclen: u32,
    /// Start time from the record header.
    pub start: Hpt,
    /// Time of the last sample from the record header.
    pub end: Hpt,
    /// Data quality indicator.
    pub quality: Quality,
    /// Trim mark: new first-sample time, strictly inside the original span.
    pub new_start: Option<Hpt>,
    /// Trim mark: new last-sample time, strictly inside the original span.
    pub new_end: Option<Hpt>,
    prev: Option<RecIdx>,
    next: Option<RecIdx>,
}

impl RecordDesc {
    /// Creates a descriptor with no trim marks.
    pub fn new(
        file: FileId,
        offset: u64,
        reclen: u32,
        start: Hpt,
        end: Hpt,
        quality: Quality,
    ) -> Self {
        Self {
            file,
            offset,
            reclen,
            start,
            end,
            quality,
            new_start: None,
            new_end: None,
            prev: None,
            next: None,
        }
    }

    /// Returns true when the record has been logically deleted.
    pub fn is_deleted(&self) -> bool {
        self.reclen == 0
    }

    /// Returns the start time, substituting the trim mark when set.
    pub fn eff_start(&self) -> Hpt {
        self.new_start.unwrap_or(self.start)
    }

    /// Returns the end time, substituting the trim mark when set.
    pub fn eff_end(&self) -> Hpt {
        self.new_end.unwrap_or(self.end)
    }
}

/// Time-ordered chain of record descriptors owned by one trace.
#[derive(Debug, Default)]
pub struct RecordMap {
    recs: Vec<RecordDesc>,
    first: Option<RecIdx>,
    last: Option<RecIdx>,
    count: u64,
}

impl RecordMap {
    /// Creates an empty record map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of descriptors in the chain.
    pub fn len(&self) -> u64 {
        self.count
    }

    /// Returns true when the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Appends a descriptor at the tail of the chain.
    pub fn append_tail(&mut self, mut rec: RecordDesc) -> RecIdx {
        let idx = self.recs.len();
        rec.prev = self.last;
        rec.next = None;
        self.recs.push(rec);
        match self.last {
            Some(last) => self.recs[last].next = Some(idx),
            None => self.first = Some(idx),
        }
        self.last = Some(idx);
        self.count += 1;
        idx
    }

    /// Prepends a descriptor at the head of the chain.
    pub fn prepend_head(&mut self, mut rec: RecordDesc) -> RecIdx {
        let idx = self.recs.len();
        rec.prev = None;
        rec.next = self.first;
        self.recs.push(rec);
        match self.first {
            Some(first) => self.recs[first].prev = Some(idx),
            None => self.last = Some(idx),
        }
        self.first = Some(idx);
        self.count += 1;
        idx
    }

    /// Returns a descriptor by index.
    pub fn get(&self, idx: RecIdx) -> &RecordDesc {
        &self.recs[idx]
    }

    /// Returns a mutable descriptor by index.
    pub fn get_mut(&mut self, idx: RecIdx) -> &mut RecordDesc {
        &mut self.recs[idx]
    }

    /// Marks a descriptor as logically deleted.
    pub fn mark_deleted(&mut self, idx: RecIdx) {
        self.recs[idx].reclen = 0;
    }

    /// Iterates descriptors in chain order.
    pub fn iter(&self) -> RecordIter<'_> {
        RecordIter {
            map: self,
            cursor: self.first,
        }
    }

    /// Returns the chain order as a list of indices.
    ///
    /// Useful when the caller needs to mutate descriptors while walking.
    pub fn indices(&self) -> Vec<RecIdx> {
        self.iter().map(|(idx, _)| idx).collect()
    }
}

/// In-order iterator over a record map.
#[derive(Debug)]
pub struct RecordIter<'a> {
    map: &'a RecordMap,
    cursor: Option<RecIdx>,
}

impl<'a> Iterator for RecordIter<'a> {
    type Item = (RecIdx, &'a RecordDesc);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.cursor?;
        let rec = &self.map.recs[idx];
        self.cursor = rec.next;
        Some((idx, rec))
    }
}
