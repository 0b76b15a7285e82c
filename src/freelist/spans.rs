//! # Free-Span Index
//!
//! This module implements the tri-map index over free page spans. A span is
//! a maximal contiguous run of free pages, represented by its start id and
//! length. The same set of spans is indexed three ways:
//!
//! ```text
//! forward:  start id   -> length      (coalesce to the right, iteration)
//! backward: last id    -> length      (coalesce to the left)
//! sized:    length     -> {start ids} (exact-fit allocation)
//! ```
//!
//! ## Why Three Maps?
//!
//! A single ordered map keyed by start would suffice in principle, but the
//! hot paths want constant-time lookups by a neighboring endpoint (release)
//! and by exact size (allocation). The redundancy costs three map updates
//! per mutation and is confined to two primitives, [`SpanIndex::add_span`]
//! and [`SpanIndex::del_span`]; every higher operation is expressed through
//! them, so tri-map consistency is a single-point concern.
//!
//! ## Maximality
//!
//! No two spans in the index are ever adjacent. Callers that insert a page
//! next to an existing span must go through [`SpanIndex::merge`], which
//! coalesces with both neighbors before inserting.
//!
//! ## Corruption Handling
//!
//! A precondition violation here means the in-memory image disagrees with
//! itself and any further allocation could alias live data. There is no
//! recovery; the primitives panic, and debug builds include the contents of
//! all three maps in the panic message.

use hashbrown::{HashMap, HashSet};

use super::Pgid;

/// Panics with the index contents in debug builds, message-only in release.
macro_rules! index_corrupt {
    ($self:expr, $($arg:tt)*) => {{
        #[cfg(debug_assertions)]
        panic!(
            "{}\nforward: {:?}\nbackward: {:?}\nsized: {:?}",
            format_args!($($arg)*),
            $self.forward,
            $self.backward,
            $self.sized
        );
        #[cfg(not(debug_assertions))]
        panic!($($arg)*);
    }};
}

#[derive(Debug, Default)]
pub(crate) struct SpanIndex {
    forward: HashMap<Pgid, u64>,
    backward: HashMap<Pgid, u64>,
    sized: HashMap<u64, HashSet<Pgid>>,
    free_pages: u64,
}

impl SpanIndex {
    /// Inserts the span `[start, start+size)` into all three maps.
    ///
    /// Does not coalesce: the caller must guarantee the span is not adjacent
    /// to an existing one, or use [`SpanIndex::merge`] instead. Overlap with
    /// an existing span endpoint is a fatal internal error.
    pub(crate) fn add_span(&mut self, start: Pgid, size: u64) {
        if size == 0 {
            index_corrupt!(self, "add_span({start}, 0): spans must have size >= 1");
        }
        let end = start + size - 1;

        if let Some(prior) = self.forward.insert(start, size) {
            index_corrupt!(
                self,
                "add_span({start}, {size}): a span of size {prior} already starts at {start}"
            );
        }
        if let Some(prior) = self.backward.insert(end, size) {
            index_corrupt!(
                self,
                "add_span({start}, {size}): a span of size {prior} already ends at {end}"
            );
        }
        self.sized.entry(size).or_default().insert(start);
        self.free_pages += size;
    }

    /// Removes the span `[start, start+size)` from all three maps.
    ///
    /// The span must be present with exactly this size; a mismatch is a
    /// fatal internal error. The size bucket is dropped entirely when it
    /// empties.
    pub(crate) fn del_span(&mut self, start: Pgid, size: u64) {
        match self.forward.remove(&start) {
            Some(found) if found == size => {}
            found => index_corrupt!(
                self,
                "del_span({start}, {size}): forward index holds {found:?} for this start"
            ),
        }
        let end = start + size - 1;
        match self.backward.remove(&end) {
            Some(found) if found == size => {}
            found => index_corrupt!(
                self,
                "del_span({start}, {size}): backward index holds {found:?} for end {end}"
            ),
        }
        match self.sized.get_mut(&size).map(|bucket| bucket.remove(&start)) {
            Some(true) => {}
            _ => index_corrupt!(
                self,
                "del_span({start}, {size}): start missing from size bucket {size}"
            ),
        }
        if self.sized.get(&size).is_some_and(|bucket| bucket.is_empty()) {
            self.sized.remove(&size);
        }
        self.free_pages -= size;
    }

    /// Merges a single freed page into the index, coalescing bidirectionally.
    ///
    /// If a span ends at `id - 1` it is absorbed on the left; if a span
    /// starts at `id + 1` it is absorbed on the right. The result is one
    /// maximal span inserted via [`SpanIndex::add_span`].
    pub(crate) fn merge(&mut self, id: Pgid) {
        let mut new_start = id;
        let mut new_size = 1u64;

        if let Some(&left) = self.backward.get(&(id - 1)) {
            self.del_span(id - left, left);
            new_start -= left;
            new_size += left;
        }
        if let Some(&right) = self.forward.get(&(id + 1)) {
            self.del_span(id + 1, right);
            new_size += right;
        }
        self.add_span(new_start, new_size);
    }

    /// Total number of free pages across all spans. O(1).
    pub(crate) fn free_count(&self) -> u64 {
        self.free_pages
    }

    /// Number of distinct spans.
    pub(crate) fn span_count(&self) -> usize {
        self.forward.len()
    }

    /// Smallest start in the exact-size bucket, if any.
    ///
    /// Bucket selection is free per the allocation contract; taking the
    /// smallest start makes allocation reproducible.
    pub(crate) fn exact_candidate(&self, size: u64) -> Option<Pgid> {
        self.sized.get(&size)?.iter().copied().min()
    }

    /// Smallest span strictly larger than `size`: minimal qualifying length,
    /// then minimal start within that bucket. Returns `(start, length)`.
    pub(crate) fn larger_candidate(&self, size: u64) -> Option<(Pgid, u64)> {
        let mut best: Option<(Pgid, u64)> = None;
        for (&length, bucket) in &self.sized {
            if length <= size {
                continue;
            }
            if let Some(better) = best {
                if length >= better.1 {
                    continue;
                }
            }
            if let Some(&start) = bucket.iter().min() {
                best = Some((start, length));
            }
        }
        best
    }

    /// Whether `id` falls inside any indexed span. O(spans); used by the
    /// debug-build double-free and overlap checks, never on a hot path.
    pub(crate) fn contains(&self, id: Pgid) -> bool {
        self.forward
            .iter()
            .any(|(&start, &size)| id >= start && id < start + size)
    }

    /// Full expansion of the index: every free page id, strictly ascending.
    pub(crate) fn sorted_ids(&self) -> Vec<Pgid> {
        let mut starts: Vec<Pgid> = self.forward.keys().copied().collect();
        starts.sort_unstable();

        let mut ids = Vec::with_capacity(self.free_pages as usize);
        for start in starts {
            if let Some(&size) = self.forward.get(&start) {
                ids.extend(start..start + size);
            }
        }
        ids
    }

    /// Rebuilds the id set from each map independently and asserts that all
    /// three agree, that no two spans are adjacent, and that the running
    /// count matches. Panics with the map contents on any mismatch.
    pub(crate) fn verify(&self) {
        let from_forward = self.ids_from_forward();
        let from_backward = self.ids_from_backward();
        let from_sized = self.ids_from_sized();

        if from_forward != from_sized {
            index_corrupt!(self, "forward and sized indexes disagree");
        }
        if from_forward != from_backward {
            index_corrupt!(self, "forward and backward indexes disagree");
        }
        if self.free_pages != from_forward.len() as u64 {
            index_corrupt!(
                self,
                "free page count {} does not match indexed pages {}",
                self.free_pages,
                from_forward.len()
            );
        }
        for &start in self.forward.keys() {
            if start > 0 && self.backward.contains_key(&(start - 1)) {
                index_corrupt!(
                    self,
                    "span starting at {start} is adjacent to the span ending at {}",
                    start - 1
                );
            }
        }
    }

    fn ids_from_forward(&self) -> HashSet<Pgid> {
        let mut ids = HashSet::new();
        for (&start, &size) in &self.forward {
            for id in start..start + size {
                if !ids.insert(id) {
                    index_corrupt!(self, "page {id} covered twice in forward index");
                }
            }
        }
        ids
    }

    fn ids_from_backward(&self) -> HashSet<Pgid> {
        let mut ids = HashSet::new();
        for (&end, &size) in &self.backward {
            for id in (end + 1 - size)..=end {
                if !ids.insert(id) {
                    index_corrupt!(self, "page {id} covered twice in backward index");
                }
            }
        }
        ids
    }

    fn ids_from_sized(&self) -> HashSet<Pgid> {
        let mut ids = HashSet::new();
        for (&size, bucket) in &self.sized {
            for &start in bucket {
                for id in start..start + size {
                    if !ids.insert(id) {
                        index_corrupt!(self, "page {id} covered twice in sized index");
                    }
                }
            }
        }
        ids
    }
}
