//! # Freelist Configuration Constants
//!
//! This module centralizes the constants shared by the freelist core and the
//! on-page codec. Constants that depend on each other are co-located and the
//! relationships are enforced with compile-time assertions.
//!
//! ## Dependency Graph
//!
//! ```text
//! PAGE_SIZE (16384 bytes)
//!       │
//!       ├─> PAGE_HEADER_SIZE (16 bytes, fixed)
//!       │
//!       ├─> PAGE_USABLE_SIZE (derived: PAGE_SIZE - PAGE_HEADER_SIZE)
//!       │
//!       └─> MAX_IDS_PER_PAGE (derived: usable space after the freelist
//!             header, divided by the 8-byte page id width)
//!
//! RESERVED_PAGE_COUNT (2)
//!       │
//!       └─> FIRST_DATA_PAGE (2)
//!             Page ids 0 and 1 are the double-buffered meta pages. They
//!             never appear in the freelist; the first allocatable id is 2.
//! ```
//!
//! ## Critical Invariants
//!
//! These invariants are enforced by compile-time assertions:
//!
//! 1. `PAGE_USABLE_SIZE == PAGE_SIZE - PAGE_HEADER_SIZE` (derived correctly)
//! 2. `FIRST_DATA_PAGE == RESERVED_PAGE_COUNT` (meta pages are exactly the
//!    reserved prefix)
//! 3. `MAX_IDS_PER_PAGE > 0` (a freelist page can hold at least one id)
//!
//! ## Usage
//!
//! Import constants from this module rather than defining them locally:
//!
//! ```ignore
//! use burrowdb_freelist::config::{FIRST_DATA_PAGE, MAX_IDS_PER_PAGE};
//! ```

// ============================================================================
// PAGE GEOMETRY
// These mirror the engine's pager layout; the freelist never touches pages
// itself but the codec capacity is derived from them.
// ============================================================================

/// Size of every page in the data file, in bytes.
pub const PAGE_SIZE: usize = 16384;

/// Size of the engine's per-page header that precedes any page payload.
pub const PAGE_HEADER_SIZE: usize = 16;

/// Payload bytes available on a page after the engine's page header.
pub const PAGE_USABLE_SIZE: usize = PAGE_SIZE - PAGE_HEADER_SIZE;

const _: () = assert!(
    PAGE_USABLE_SIZE == PAGE_SIZE - PAGE_HEADER_SIZE,
    "PAGE_USABLE_SIZE must be derived from PAGE_SIZE and PAGE_HEADER_SIZE"
);

// ============================================================================
// RESERVED PAGES
// ============================================================================

/// Number of reserved pages at the start of the file.
/// Pages 0 and 1 hold the double-buffered meta pages.
pub const RESERVED_PAGE_COUNT: u64 = 2;

/// First page id that may ever be allocated or freed.
/// Ids below this value never appear in the freelist; handing one to
/// `Freelist::free` or `Freelist::init` is a fatal internal error.
pub const FIRST_DATA_PAGE: u64 = 2;

const _: () = assert!(
    FIRST_DATA_PAGE == RESERVED_PAGE_COUNT,
    "the first data page must follow the reserved meta pages exactly"
);

// ============================================================================
// FREELIST PAGE CODEC LAYOUT
// Changing any of these changes the on-disk format.
// ============================================================================

/// Magic number identifying a serialized freelist payload ("BRFL").
pub const FREELIST_MAGIC: u32 = 0x4252_464C;

/// Size of the codec header that precedes the id array, in bytes.
pub const FREELIST_HEADER_SIZE: usize = 16;

/// Width of one serialized page id, in bytes (little-endian u64).
pub const PAGE_ID_SIZE: usize = 8;

/// Maximum number of page ids a single freelist page can hold.
/// Longer freelists continue on overflow pages managed by the pager.
pub const MAX_IDS_PER_PAGE: usize =
    (PAGE_SIZE - PAGE_HEADER_SIZE - FREELIST_HEADER_SIZE) / PAGE_ID_SIZE;

const _: () = assert!(
    MAX_IDS_PER_PAGE > 0,
    "a freelist page must hold at least one page id"
);
