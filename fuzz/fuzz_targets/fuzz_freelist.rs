//! Fuzz testing for freelist operations.
//!
//! This fuzz target applies arbitrary operation sequences to a `Freelist`
//! while mirroring them into a naive reference model, and asserts the two
//! agree on counts and on the exported id list. Operations are guarded the
//! same way the engine guards them (only allocated pages are freed, each
//! page at most once per life), so any divergence or internal panic is a
//! real bug in the index.

#![no_main]

use std::collections::{BTreeMap, BTreeSet};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use burrowdb_freelist::{Freelist, Pgid, Txid};

#[derive(Debug, Arbitrary)]
struct FreelistInput {
    initial: Vec<u16>,
    operations: Vec<FreelistOp>,
}

#[derive(Debug, Arbitrary)]
enum FreelistOp {
    Allocate { n: u8 },
    Free { slot: u16 },
    QueueRefresh { id: u16 },
    Rollback,
    NextTx,
    Reclaim { back: u8 },
    Export,
    CopyAll,
}

fuzz_target!(|input: FreelistInput| {
    if input.operations.len() > 512 || input.initial.len() > 2048 {
        return;
    }

    let mut ids: Vec<Pgid> = input.initial.iter().map(|&v| v as Pgid + 2).collect();
    ids.sort_unstable();
    ids.dedup();

    let mut list = Freelist::new();
    list.init(&ids);

    let mut free: BTreeSet<Pgid> = ids.iter().copied().collect();
    let mut allocated: BTreeSet<Pgid> = BTreeSet::new();
    let mut pending: BTreeMap<Txid, Vec<Pgid>> = BTreeMap::new();
    let mut txid: Txid = 1;

    for op in &input.operations {
        match op {
            FreelistOp::Allocate { n } => {
                let n = *n as u64 % 9;
                if let Some(start) = list.allocate(txid, n) {
                    for id in start..start + n {
                        assert!(free.remove(&id), "allocated page {id} was not free");
                        allocated.insert(id);
                    }
                }
            }
            FreelistOp::Free { slot } => {
                if allocated.is_empty() {
                    continue;
                }
                let nth = *slot as usize % allocated.len();
                let id = *allocated.iter().nth(nth).unwrap();
                allocated.remove(&id);

                list.free(txid, id);
                pending.entry(txid).or_default().push(id);
            }
            FreelistOp::QueueRefresh { id } => {
                list.queue_refresh(txid, *id as Pgid + 2);
            }
            FreelistOp::Rollback => {
                list.rollback(txid);
                if let Some(dropped) = pending.remove(&txid) {
                    allocated.extend(dropped);
                }
                txid += 1;
            }
            FreelistOp::NextTx => {
                txid += 1;
            }
            FreelistOp::Reclaim { back } => {
                let oldest = txid.saturating_sub(*back as u64 % 4);
                list.reclaim(oldest);

                let released: Vec<Txid> = pending.range(..=oldest).map(|(&t, _)| t).collect();
                for t in released {
                    for id in pending.remove(&t).unwrap() {
                        free.insert(id);
                    }
                }
            }
            FreelistOp::Export => {
                let expected: Vec<Pgid> = free.iter().copied().collect();
                assert_eq!(list.free_page_ids(), expected);
            }
            FreelistOp::CopyAll => {
                let all = list.copy_all_ids();
                assert!(all.windows(2).all(|w| w[0] < w[1]));
                assert_eq!(all.len() as u64, list.count());
            }
        }

        assert_eq!(list.free_count(), free.len() as u64);
    }
});
