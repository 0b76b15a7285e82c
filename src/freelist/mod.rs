//! # Page Freelist
//!
//! This module implements free page tracking and allocation for BurrowDB's
//! copy-on-write page store. The freelist owns three pieces of state:
//!
//! - a [span index](spans) of maximal contiguous runs of free pages,
//! - a pending queue of pages freed by transactions that may still be
//!   visible to an open reader,
//! - the allocation record mapping run heads to the transaction that most
//!   recently allocated them.
//!
//! ## Design Overview
//!
//! Copy-on-write updates never modify a committed page in place: the writer
//! allocates fresh pages for every node it touches and frees the old copies.
//! A freed page cannot be handed out again immediately, because a read
//! transaction started before the free may still traverse it. Pages
//! therefore move through two stages:
//!
//! ```text
//!   free(txid, id)                     reclaim(oldest)
//! ──────────────────> pending[txid] ────────────────────> span index
//!                     (quarantined)    txid <= oldest      (allocatable)
//! ```
//!
//! The engine supplies `oldest`, the minimum live reader transaction id, at
//! commit or before any allocating operation. The freelist never tracks
//! reader lifetimes itself.
//!
//! ## Allocation Strategy
//!
//! [`Freelist::allocate`] first consults the size bucket for an exact-fit
//! span; failing that it scans larger buckets, splits the chosen span, and
//! returns the remainder to the index. Within the freedom the contract
//! allows, selection is deterministic (smallest qualifying size, smallest
//! start) so allocation patterns are reproducible under test. `None` means
//! no run is large enough; the caller grows the file. That is a soft
//! failure, not an error.
//!
//! ## Lifecycle
//!
//! Created empty when the database opens and populated by
//! [`Freelist::init`] from the sorted id list stored on the freelist page.
//! Mutated only by the single writer. No persistent state lives here: the
//! serialized form on disk (the output of [`Freelist::copy_all_ids`] framed
//! by the codec in [`page`]) is the source of truth.
//!
//! ## Thread Safety
//!
//! The freelist is not thread-safe and holds no locks. Every mutating
//! operation takes `&mut self`; the engine's write transaction owns the
//! freelist exclusively and readers never reach this code.
//!
//! ## Error Handling
//!
//! Allocation failure is `None`. Everything else that can go wrong here is
//! a programming or corruption bug (freeing a reserved page, freeing a page
//! twice, initializing from an unsorted list) and is unrecoverable: the
//! in-memory image would disagree with itself and later allocations could
//! alias live data. Those paths panic; debug builds add the index contents
//! to the panic message and run full tri-map verification on count queries
//! and after every reclaim.

pub mod page;
mod spans;

use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;

use crate::config::FIRST_DATA_PAGE;
use spans::SpanIndex;

/// Page identifier. Addresses a fixed-size page in the single data file.
/// Ids 0 and 1 are the double-buffered meta pages and never appear here.
pub type Pgid = u64;

/// Transaction identifier, monotonically non-decreasing, supplied by the
/// engine's transaction manager.
pub type Txid = u64;

/// Per-transaction quarantine: pages freed by one transaction, plus pages
/// whose mmap-backed view must be re-read after a file grow/remap.
///
/// The inline capacities follow the engine's workload: most transactions
/// free only a handful of B+tree nodes, so the lists usually live on the
/// stack and spill to the heap only for bulk deletions.
#[derive(Debug, Default)]
struct TxPending {
    freed: SmallVec<[Pgid; 16]>,
    refresh: SmallVec<[Pgid; 4]>,
}

#[derive(Debug)]
pub struct Freelist {
    spans: SpanIndex,
    /// Head page of each allocation -> the Txid that made it.
    allocs: HashMap<Pgid, Txid>,
    /// Freed-but-not-yet-reclaimable pages, keyed by the freeing Txid.
    pending: HashMap<Txid, TxPending>,
    /// Every id currently held in some pending entry.
    cache: HashSet<Pgid>,
}

impl Freelist {
    pub fn new() -> Self {
        Self {
            spans: SpanIndex::default(),
            allocs: HashMap::new(),
            pending: HashMap::new(),
            cache: HashSet::new(),
        }
    }

    /// Rebuilds the span index from a strictly ascending list of free page
    /// ids, coalescing consecutive ids into runs in a single pass.
    ///
    /// The pending queue and allocation record are left untouched; on a
    /// fresh open both are empty, and [`Freelist::reload`] handles the
    /// re-read-after-rollback path where they are not.
    ///
    /// # Panics
    ///
    /// If the input is not strictly ascending, or contains a reserved page
    /// id (below [`FIRST_DATA_PAGE`]). Both indicate a corrupt freelist
    /// page or a broken caller, and neither is recoverable.
    pub fn init(&mut self, ids: &[Pgid]) {
        self.spans = SpanIndex::default();

        let Some((&first, rest)) = ids.split_first() else {
            return;
        };
        if first < FIRST_DATA_PAGE {
            panic!("freelist init: page {first} is a reserved meta page");
        }

        let mut start = first;
        let mut size = 1u64;
        let mut prev = first;
        for &id in rest {
            if id <= prev {
                panic!("freelist init: ids not strictly ascending ({prev} followed by {id})");
            }
            if id == prev + 1 {
                size += 1;
            } else {
                self.spans.add_span(start, size);
                start = id;
                size = 1;
            }
            prev = id;
        }
        self.spans.add_span(start, size);
    }

    /// Re-initializes from an on-disk id list while pending state exists.
    ///
    /// Used when the writer rolls back and the freelist must be re-read
    /// from the last committed freelist page: ids that are pending in
    /// memory are dropped from the input so a quarantined page can never
    /// re-enter the allocatable set through the reload.
    pub fn reload(&mut self, ids: &[Pgid]) {
        if self.cache.is_empty() {
            self.init(ids);
            return;
        }
        let filtered: Vec<Pgid> = ids
            .iter()
            .copied()
            .filter(|id| !self.cache.contains(id))
            .collect();
        self.init(&filtered);
    }

    /// Allocates a run of exactly `n` contiguous pages and returns its
    /// start, or `None` if no free span is large enough (the caller is
    /// expected to grow the file). `n == 0` returns `None` and is a no-op.
    ///
    /// Exact-fit first: the size bucket for `n` is consulted in O(1).
    /// Otherwise the smallest span strictly larger than `n` is split and
    /// the remainder re-indexed. The head page is recorded against `txid`.
    pub fn allocate(&mut self, txid: Txid, n: u64) -> Option<Pgid> {
        if n == 0 {
            return None;
        }

        if let Some(start) = self.spans.exact_candidate(n) {
            self.spans.del_span(start, n);
            self.note_allocated(txid, start, n);
            return Some(start);
        }

        let (start, size) = self.spans.larger_candidate(n)?;
        self.spans.del_span(start, size);
        let remain = size - n;
        if remain > 0 {
            self.spans.add_span(start + n, remain);
        }
        self.note_allocated(txid, start, n);
        Some(start)
    }

    fn note_allocated(&mut self, txid: Txid, start: Pgid, n: u64) {
        self.allocs.insert(start, txid);
        for id in start..start + n {
            self.cache.remove(&id);
        }
    }

    /// Quarantines `id` under the freeing transaction. The page stays
    /// invisible to the allocator until [`Freelist::reclaim`] is called
    /// with an `oldest` at or past `txid`.
    ///
    /// # Panics
    ///
    /// If `id` is a reserved meta page, is already pending, or (debug
    /// builds) is already covered by a free span.
    pub fn free(&mut self, txid: Txid, id: Pgid) {
        if id < FIRST_DATA_PAGE {
            panic!("freelist: cannot free reserved meta page {id}");
        }
        if !self.cache.insert(id) {
            panic!("freelist: page {id} freed twice");
        }
        #[cfg(debug_assertions)]
        if self.spans.contains(id) {
            panic!("freelist: page {id} is already free");
        }
        self.pending.entry(txid).or_default().freed.push(id);
    }

    /// Frees the contiguous run `[start, start+len)`: a page together with
    /// its overflow pages. `len == 0` is a no-op.
    pub fn free_run(&mut self, txid: Txid, start: Pgid, len: u64) {
        for id in start..start + len {
            self.free(txid, id);
        }
    }

    /// Records a page whose mmap-backed view must be re-read after a file
    /// grow/remap. The list rides alongside the transaction's freed pages
    /// and is handed back by [`Freelist::reclaim`]; the freelist itself
    /// performs no I/O.
    pub fn queue_refresh(&mut self, txid: Txid, id: Pgid) {
        self.pending.entry(txid).or_default().refresh.push(id);
    }

    /// Drops everything the aborted transaction had pending. Its freed
    /// pages never become free (no reader ever observed them as such) and
    /// its refresh list is discarded.
    ///
    /// Pages the transaction *allocated* remain allocated-and-uncommitted
    /// (their [`Freelist::allocation_owner`] entry survives) until the
    /// caller arranges their release under another transaction.
    pub fn rollback(&mut self, txid: Txid) {
        let Some(txp) = self.pending.remove(&txid) else {
            return;
        };
        for id in &txp.freed {
            self.cache.remove(id);
        }
    }

    /// Merges the pending pages of every transaction with `txid <= oldest`
    /// back into the span index, where `oldest` is the minimum live reader
    /// transaction id. Their allocation records are cleared.
    ///
    /// Returns the merged, sorted, deduplicated refresh list of the
    /// reclaimed transactions so the caller can rebuild its in-memory page
    /// references.
    pub fn reclaim(&mut self, oldest: Txid) -> Vec<Pgid> {
        let mut batches: Vec<TxPending> = Vec::new();
        self.pending.retain(|&txid, txp| {
            if txid <= oldest {
                batches.push(std::mem::take(txp));
                false
            } else {
                true
            }
        });
        if batches.is_empty() {
            return Vec::new();
        }

        let mut freed: Vec<Pgid> = batches
            .iter()
            .flat_map(|txp| txp.freed.iter().copied())
            .collect();
        freed.sort_unstable();
        #[cfg(debug_assertions)]
        self.check_release_batch(&freed);

        for &id in &freed {
            self.cache.remove(&id);
            self.allocs.remove(&id);
            self.spans.merge(id);
        }
        #[cfg(debug_assertions)]
        self.spans.verify();

        let mut refresh: Vec<Pgid> = batches.into_iter().flat_map(|txp| txp.refresh).collect();
        refresh.sort_unstable();
        refresh.dedup();
        refresh
    }

    /// Double frees across transactions are caught by `free` itself; this
    /// re-checks the merged batch and the overlap-with-free-span case
    /// before any span mutation happens.
    #[cfg(debug_assertions)]
    fn check_release_batch(&self, ids: &[Pgid]) {
        for pair in ids.windows(2) {
            if pair[0] == pair[1] {
                panic!("freelist: duplicated page id {} in release batch", pair[0]);
            }
        }
        for &id in ids {
            if self.spans.contains(id) {
                panic!("freelist: released page {id} overlaps an existing free span");
            }
        }
    }

    /// Number of pages currently allocatable. O(1); debug builds re-derive
    /// the count from the span index and assert agreement.
    pub fn free_count(&self) -> u64 {
        #[cfg(debug_assertions)]
        self.spans.verify();
        self.spans.free_count()
    }

    /// Number of pages quarantined in pending entries.
    pub fn pending_count(&self) -> u64 {
        self.pending
            .values()
            .map(|txp| txp.freed.len() as u64)
            .sum()
    }

    /// Free plus pending: the size the engine reserves for the serialized
    /// freelist at commit.
    pub fn count(&self) -> u64 {
        self.free_count() + self.pending_count()
    }

    /// Whether `id` is quarantined in some pending entry.
    pub fn is_pending(&self, id: Pgid) -> bool {
        self.cache.contains(&id)
    }

    /// The transaction that most recently allocated the run starting at
    /// `start`, if that allocation has not been reclaimed since.
    pub fn allocation_owner(&self, start: Pgid) -> Option<Txid> {
        self.allocs.get(&start).copied()
    }

    /// Every free page id, strictly ascending: the exact payload of the
    /// freelist page, and the input [`Freelist::init`] accepts back.
    pub fn free_page_ids(&self) -> Vec<Pgid> {
        self.spans.sorted_ids()
    }

    /// Free and pending ids merged into one strictly ascending list. This
    /// is what a commit serializes: losing pending pages to a crash would
    /// leak them permanently, so they are persisted alongside the free set.
    pub fn copy_all_ids(&self) -> Vec<Pgid> {
        let mut pending_ids: Vec<Pgid> = self
            .pending
            .values()
            .flat_map(|txp| txp.freed.iter().copied())
            .collect();
        pending_ids.sort_unstable();

        let free_ids = self.free_page_ids();
        let mut merged = Vec::with_capacity(free_ids.len() + pending_ids.len());
        let (mut i, mut j) = (0, 0);
        while i < free_ids.len() && j < pending_ids.len() {
            if free_ids[i] < pending_ids[j] {
                merged.push(free_ids[i]);
                i += 1;
            } else {
                merged.push(pending_ids[j]);
                j += 1;
            }
        }
        merged.extend_from_slice(&free_ids[i..]);
        merged.extend_from_slice(&pending_ids[j..]);
        merged
    }
}

impl Default for Freelist {
    fn default() -> Self {
        Self::new()
    }
}
