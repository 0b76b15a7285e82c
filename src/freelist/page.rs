//! # Freelist Page Codec
//!
//! This module serializes the freelist's id list into the payload region of
//! a freelist page and reads it back. The pager owns the page itself (and
//! its standard page header); this codec operates on the usable payload
//! slice the pager hands it and performs no I/O.
//!
//! ## Payload Layout
//!
//! ```text
//! Offset  Size  Field      Description
//! ------  ----  ---------  ----------------------------------------
//! 0       4     magic      0x4252464C ("BRFL")
//! 4       4     id_count   Number of page ids that follow
//! 8       8     checksum   CRC-64/ECMA-182 over the id array
//! 16      8*N   ids        Page ids, u64 little-endian, ascending
//! ```
//!
//! With 16KB pages, a 16-byte page header, and the 16-byte codec header,
//! one page holds 2044 ids; longer freelists continue on overflow pages
//! chained by the pager, each framed with this same layout.
//!
//! ## What Gets Written
//!
//! At commit the engine serializes [`Freelist::copy_all_ids`], free and
//! pending merged: a crash between commits must not leak quarantined pages.
//! On open it feeds the decoded list to [`Freelist::init`].
//!
//! ## Corruption Handling
//!
//! Unlike the in-memory index, a damaged page image is *recoverable* state:
//! the engine falls back to its second meta page or rebuilds the freelist by
//! scanning the file. Every validation failure here (bad magic, short
//! buffer, checksum mismatch, out-of-order or reserved ids) is therefore an
//! `eyre::Result` error with context, never a panic.
//!
//! [`Freelist::copy_all_ids`]: super::Freelist::copy_all_ids
//! [`Freelist::init`]: super::Freelist::init

use crc::{Crc, CRC_64_ECMA_182};
use eyre::{bail, ensure, Result};
use zerocopy::little_endian::{U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::Pgid;
use crate::config::{FIRST_DATA_PAGE, FREELIST_HEADER_SIZE, FREELIST_MAGIC, PAGE_ID_SIZE};

const CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_ECMA_182);

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct FreelistPageHeader {
    magic: U32,
    id_count: U32,
    checksum: U64,
}

const _: () = assert!(
    size_of::<FreelistPageHeader>() == FREELIST_HEADER_SIZE,
    "FreelistPageHeader must match the layout constant"
);

impl FreelistPageHeader {
    pub fn new(id_count: u32, checksum: u64) -> Self {
        Self {
            magic: U32::new(FREELIST_MAGIC),
            id_count: U32::new(id_count),
            checksum: U64::new(checksum),
        }
    }

    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        ensure!(
            data.len() >= size_of::<Self>(),
            "buffer too small for FreelistPageHeader: {} < {}",
            data.len(),
            size_of::<Self>()
        );

        Self::ref_from_bytes(&data[..size_of::<Self>()])
            .map_err(|e| eyre::eyre!("failed to read FreelistPageHeader: {:?}", e))
    }

    pub fn from_bytes_mut(data: &mut [u8]) -> Result<&mut Self> {
        ensure!(
            data.len() >= size_of::<Self>(),
            "buffer too small for FreelistPageHeader: {} < {}",
            data.len(),
            size_of::<Self>()
        );

        Self::mut_from_bytes(&mut data[..size_of::<Self>()])
            .map_err(|e| eyre::eyre!("failed to read FreelistPageHeader: {:?}", e))
    }

    pub fn write_to(&self, data: &mut [u8]) -> Result<()> {
        ensure!(
            data.len() >= size_of::<Self>(),
            "buffer too small for FreelistPageHeader: {} < {}",
            data.len(),
            size_of::<Self>()
        );

        data[..size_of::<Self>()].copy_from_slice(self.as_bytes());
        Ok(())
    }

    zerocopy_accessors! {
        magic: u32,
        id_count: u32,
        checksum: u64,
    }
}

/// Bytes needed to serialize `count` page ids.
pub const fn required_len(count: usize) -> usize {
    FREELIST_HEADER_SIZE + count * PAGE_ID_SIZE
}

/// Number of page ids a payload buffer of `len` bytes can hold.
pub const fn page_capacity(len: usize) -> usize {
    if len < FREELIST_HEADER_SIZE {
        0
    } else {
        (len - FREELIST_HEADER_SIZE) / PAGE_ID_SIZE
    }
}

/// Serializes a strictly ascending id list into `buf`, which must be the
/// payload region of a freelist page (after the pager's page header).
///
/// Fails on an undersized buffer or an input that is not strictly ascending
/// or reaches into the reserved meta pages; nothing is written on failure
/// paths that reject the input itself.
pub fn write_ids(ids: &[Pgid], buf: &mut [u8]) -> Result<()> {
    ensure!(
        buf.len() >= required_len(ids.len()),
        "freelist payload of {} ids needs {} bytes, buffer has {}",
        ids.len(),
        required_len(ids.len()),
        buf.len()
    );
    ensure!(
        ids.len() <= u32::MAX as usize,
        "freelist of {} ids exceeds the id_count field",
        ids.len()
    );
    if let Some(&first) = ids.first() {
        ensure!(
            first >= FIRST_DATA_PAGE,
            "freelist contains reserved meta page {first}"
        );
    }
    for pair in ids.windows(2) {
        ensure!(
            pair[0] < pair[1],
            "freelist ids not strictly ascending: {} followed by {}",
            pair[0],
            pair[1]
        );
    }

    let ids_end = required_len(ids.len());
    let dst = <[U64]>::mut_from_bytes(&mut buf[FREELIST_HEADER_SIZE..ids_end])
        .map_err(|e| eyre::eyre!("failed to map freelist id array: {:?}", e))?;
    for (slot, &id) in dst.iter_mut().zip(ids) {
        *slot = U64::new(id);
    }

    let checksum = CRC64.checksum(&buf[FREELIST_HEADER_SIZE..ids_end]);
    FreelistPageHeader::new(ids.len() as u32, checksum).write_to(buf)
}

/// Decodes and validates a freelist payload written by [`write_ids`].
///
/// The returned list is strictly ascending and free of reserved ids; any
/// violation (wrong magic, truncation, checksum mismatch, disorder) is
/// reported as corruption of the page image.
pub fn read_ids(buf: &[u8]) -> Result<Vec<Pgid>> {
    let header = FreelistPageHeader::from_bytes(buf)?;
    ensure!(
        header.magic() == FREELIST_MAGIC,
        "bad freelist page magic {:#010x} (expected {:#010x})",
        header.magic(),
        FREELIST_MAGIC
    );

    let count = header.id_count() as usize;
    ensure!(
        count <= page_capacity(buf.len()),
        "freelist page claims {} ids but buffer holds at most {}",
        count,
        page_capacity(buf.len())
    );

    let payload = &buf[FREELIST_HEADER_SIZE..required_len(count)];
    let computed = CRC64.checksum(payload);
    ensure!(
        computed == header.checksum(),
        "freelist page checksum mismatch: stored {:#018x}, computed {computed:#018x}",
        header.checksum()
    );

    let src = <[U64]>::ref_from_bytes(payload)
        .map_err(|e| eyre::eyre!("failed to map freelist id array: {:?}", e))?;

    let mut ids = Vec::with_capacity(count);
    let mut prev: Option<Pgid> = None;
    for slot in src {
        let id = slot.get();
        if id < FIRST_DATA_PAGE {
            bail!("freelist page contains reserved meta page {id}");
        }
        if let Some(prev) = prev {
            ensure!(
                id > prev,
                "freelist page ids not strictly ascending: {prev} followed by {id}"
            );
        }
        prev = Some(id);
        ids.push(id);
    }
    Ok(ids)
}
