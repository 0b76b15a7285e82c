//! # BurrowDB Freelist - Copy-on-Write Page Allocation
//!
//! This crate implements the page freelist for BurrowDB, an embedded,
//! single-file, memory-mapped key/value store organized as a copy-on-write
//! B+tree over fixed-size pages. The freelist is the allocator at the heart
//! of the write path: it tracks which pages in the data file are free, hands
//! out contiguous runs of pages to the single writer, and reclaims pages
//! released by transactions once no reader can still observe them.
//!
//! ## Position in the Engine
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │        Transaction Manager          │
//! │  (single writer / many readers)     │
//! ├─────────────────────────────────────┤
//! │     B+tree (copy-on-write nodes)    │
//! ├─────────────────────────────────────┤
//! │   Freelist (this crate)             │
//! │   span index · pending queue        │
//! ├─────────────────────────────────────┤
//! │   Pager / mmap / meta pages         │
//! └─────────────────────────────────────┘
//! ```
//!
//! The surrounding engine (mmap and remap policy, page cache, B+tree node
//! formats, meta-page double-buffering, fsync ordering) lives outside this
//! crate and talks to the freelist through an in-process interface:
//!
//! - On open, the engine hands the freelist a sorted list of free page ids
//!   deserialized from the freelist page ([`Freelist::init`]).
//! - During a write transaction it allocates runs ([`Freelist::allocate`])
//!   and frees pages ([`Freelist::free`]).
//! - At commit, or before any allocating operation, it passes the minimum
//!   live reader transaction id so eligible pending pages can be merged back
//!   into the free set ([`Freelist::reclaim`]).
//! - At commit it serializes [`Freelist::copy_all_ids`] through the codec in
//!   [`freelist::page`].
//!
//! ## Design Highlights
//!
//! - **Tri-map span index**: free spans are indexed by start, by last page,
//!   and by size. Coalescing on release and exact-fit allocation are both
//!   O(1) lookups; the redundancy costs three map updates per mutation and
//!   is confined to two primitives.
//! - **Pending-vs-free separation**: pages freed by a transaction stay
//!   quarantined per-Txid until no live reader predates that transaction, so
//!   a reader's snapshot can never see its pages recycled underneath it.
//! - **Single writer, no locks**: every mutating operation takes `&mut self`.
//!   Exclusive ownership is the concurrency model; the engine's write lock
//!   lives a layer above.
//! - **No I/O**: every operation is synchronous, bounded, and in-memory.
//!   The on-disk freelist page is produced and consumed through a zero-copy
//!   codec, but reading and writing the page itself is the pager's job.
//!
//! ## Module Overview
//!
//! - [`freelist`]: the allocator core (span index, pending queue, page codec)
//! - [`config`]: page geometry and codec layout constants

#[macro_use]
mod macros;

pub mod config;
pub mod freelist;

pub use freelist::page::{page_capacity, read_ids, required_len, write_ids, FreelistPageHeader};
pub use freelist::{Freelist, Pgid, Txid};
