//! # Freelist Model Tests
//!
//! Long randomized operation sequences cross-checked against a naive
//! reference model built on `BTreeSet`. The model tracks three page
//! populations (free, allocated, pending-per-transaction) and after every
//! operation the freelist must agree with it on counts, and periodically on
//! the full expanded id list.
//!
//! The sequences are deterministic: a fixed-seed xorshift generator drives
//! operation selection, so failures reproduce exactly.

use std::collections::{BTreeMap, BTreeSet};

use burrowdb_freelist::{Freelist, Pgid, Txid};

struct Xorshift(u64);

impl Xorshift {
    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

#[derive(Default)]
struct Model {
    free: BTreeSet<Pgid>,
    allocated: BTreeSet<Pgid>,
    pending: BTreeMap<Txid, Vec<Pgid>>,
}

impl Model {
    fn pending_total(&self) -> u64 {
        self.pending.values().map(|ids| ids.len() as u64).sum()
    }
}

fn max_free_run(free: &BTreeSet<Pgid>) -> u64 {
    let mut best = 0u64;
    let mut run = 0u64;
    let mut prev: Option<Pgid> = None;
    for &id in free {
        run = match prev {
            Some(p) if id == p + 1 => run + 1,
            _ => 1,
        };
        best = best.max(run);
        prev = Some(id);
    }
    best
}

fn assert_counts(list: &Freelist, model: &Model) {
    assert_eq!(
        list.free_count(),
        model.free.len() as u64,
        "free count diverged from model"
    );
    assert_eq!(
        list.pending_count(),
        model.pending_total(),
        "pending count diverged from model"
    );
}

fn assert_full_state(list: &Freelist, model: &Model) {
    let expected: Vec<Pgid> = model.free.iter().copied().collect();
    assert_eq!(list.free_page_ids(), expected, "free set diverged from model");
}

fn run_workload(seed: u64, ops: usize) {
    let mut rng = Xorshift(seed);

    // A gappy initial free set keeps both merge directions exercised.
    let initial: Vec<Pgid> = (2u64..800)
        .filter(|_| rng.below(100) < 55)
        .collect();

    let mut list = Freelist::new();
    list.init(&initial);

    let mut model = Model::default();
    model.free.extend(initial.iter().copied());

    let mut txid: Txid = 10;

    for step in 0..ops {
        match rng.below(100) {
            // Allocate a small run.
            0..=39 => {
                let n = 1 + rng.below(8);
                match list.allocate(txid, n) {
                    Some(start) => {
                        for id in start..start + n {
                            assert!(
                                model.free.remove(&id),
                                "seed {seed} step {step}: allocated page {id} was not free"
                            );
                            model.allocated.insert(id);
                        }
                        assert_eq!(list.allocation_owner(start), Some(txid));
                    }
                    None => {
                        assert!(
                            max_free_run(&model.free) < n,
                            "seed {seed} step {step}: allocation of {n} failed with a \
                             sufficient run available"
                        );
                    }
                }
            }
            // Free one previously allocated page under the current tx.
            40..=69 => {
                if model.allocated.is_empty() {
                    continue;
                }
                let nth = rng.below(model.allocated.len() as u64) as usize;
                let id = *model.allocated.iter().nth(nth).unwrap();
                model.allocated.remove(&id);

                list.free(txid, id);
                model.pending.entry(txid).or_default().push(id);

                assert!(list.is_pending(id));
            }
            // Abort the current transaction.
            70..=74 => {
                list.rollback(txid);
                if let Some(ids) = model.pending.remove(&txid) {
                    // Dropped pages stay allocated-and-uncommitted; the
                    // workload may free them again under a later tx.
                    model.allocated.extend(ids);
                }
                txid += 1;
            }
            // Reclaim up to some recent transaction.
            75..=89 => {
                let oldest = txid.saturating_sub(rng.below(3));
                list.reclaim(oldest);

                let released: Vec<Txid> = model
                    .pending
                    .range(..=oldest)
                    .map(|(&t, _)| t)
                    .collect();
                for t in released {
                    let ids = model.pending.remove(&t).unwrap();
                    for id in ids {
                        model.free.insert(id);
                    }
                }
                assert_full_state(&list, &model);
            }
            // Move to the next transaction.
            _ => {
                txid += 1;
            }
        }

        assert_counts(&list, &model);
        if step % 64 == 0 {
            assert_full_state(&list, &model);
        }
    }

    // Drain everything and do a final exact comparison plus a round trip.
    list.reclaim(u64::MAX);
    for (_, ids) in std::mem::take(&mut model.pending) {
        model.free.extend(ids);
    }
    assert_full_state(&list, &model);

    let exported = list.free_page_ids();
    let mut reopened = Freelist::new();
    reopened.init(&exported);
    assert_eq!(reopened.free_page_ids(), exported);
    assert_eq!(reopened.free_count(), list.free_count());
}

#[test]
fn workload_matches_model_seed_1() {
    run_workload(0x9E37_79B9_7F4A_7C15, 4000);
}

#[test]
fn workload_matches_model_seed_2() {
    run_workload(42, 4000);
}

#[test]
fn workload_matches_model_seed_3() {
    run_workload(7, 4000);
}

#[test]
fn churn_returns_to_initial_state() {
    // Allocate the whole file page by page, free it all, reclaim, and the
    // freelist must collapse back to the single original span.
    let initial: Vec<Pgid> = (2u64..1026).collect();
    let mut list = Freelist::new();
    list.init(&initial);
    assert_eq!(list.free_count(), 1024);

    let mut allocated = Vec::new();
    while let Some(start) = list.allocate(500, 3) {
        allocated.push(start);
    }
    assert!(list.free_count() < 3);

    for start in allocated {
        list.free_run(501, start, 3);
    }
    list.reclaim(501);

    assert_eq!(list.free_page_ids(), initial);
    assert_eq!(list.count(), 1024);
}
