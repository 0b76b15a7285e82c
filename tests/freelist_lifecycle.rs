//! # Freelist Lifecycle Tests
//!
//! Engine-shaped flows: commit and reopen through the page codec, the
//! writer-rollback-plus-reload path, refresh-list plumbing across reclaim,
//! and page conservation over a chain of sequential write transactions.

use burrowdb_freelist::config::PAGE_USABLE_SIZE;
use burrowdb_freelist::{read_ids, write_ids, Freelist, Pgid};

#[test]
fn commit_reopen_restores_free_and_pending() {
    let mut list = Freelist::new();
    list.init(&[5, 6, 7, 10, 11, 12, 13, 20]);

    list.allocate(100, 2).unwrap();
    list.free(100, 30);
    list.free(100, 31);

    // A commit persists free and pending merged; a crash between commits
    // must not leak the quarantined pages.
    let committed = list.copy_all_ids();
    let mut page = vec![0u8; PAGE_USABLE_SIZE];
    write_ids(&committed, &mut page).unwrap();

    let mut reopened = Freelist::new();
    reopened.init(&read_ids(&page).unwrap());

    assert_eq!(reopened.free_page_ids(), committed);
    assert_eq!(reopened.free_count(), list.count());
}

#[test]
fn writer_rollback_reload_filters_pending() {
    // The committed image contains pages 8 and 9, freed by tx 200 whose
    // reader gate has not passed yet: they sit in the image *and* in the
    // in-memory pending queue.
    let committed = vec![5, 6, 7, 8, 9, 20];
    let mut list = Freelist::new();
    list.init(&[5, 6, 7, 20]);
    list.free(200, 8);
    list.free(200, 9);

    // Writer tx 300 allocates, then aborts; the engine re-reads the last
    // committed freelist page.
    list.allocate(300, 3).unwrap();
    list.rollback(300);
    list.reload(&committed);

    assert_eq!(list.free_page_ids(), vec![5, 6, 7, 20]);
    assert!(list.is_pending(8));
    assert!(list.is_pending(9));

    list.reclaim(200);

    assert_eq!(list.free_page_ids(), vec![5, 6, 7, 8, 9, 20]);
}

#[test]
fn refresh_lists_survive_until_reclaim() {
    let mut list = Freelist::new();
    list.init(&[5, 6, 7, 10, 11, 12, 13, 20]);

    list.queue_refresh(100, 50);
    list.queue_refresh(101, 51);
    list.queue_refresh(101, 50);
    list.free(101, 40);

    assert!(list.reclaim(99).is_empty());
    assert!(list.is_pending(40));

    let refresh = list.reclaim(101);

    assert_eq!(refresh, vec![50, 51]);
    assert!(!list.is_pending(40));
    assert_eq!(list.free_count(), 9);
    assert!(list.reclaim(u64::MAX).is_empty());
}

#[test]
fn sequential_write_transactions_conserve_pages() {
    // Each tx allocates a fresh run for its dirty nodes and frees the run
    // of the previous tx; the engine reclaims with oldest = tx - 1 at the
    // start of the next one. No page may ever leak or duplicate.
    let initial: Vec<Pgid> = (2u64..130).collect();
    let mut list = Freelist::new();
    list.init(&initial);

    let mut live: Option<(Pgid, u64)> = None;
    for tx in 10u64..40 {
        list.reclaim(tx - 1);

        let n = 1 + (tx % 4);
        let start = list.allocate(tx, n).expect("file never needs to grow");
        if let Some((old_start, old_n)) = live {
            list.free_run(tx, old_start, old_n);
        }
        live = Some((start, n));

        // Every page is exactly one of: free, pending, or the live run.
        assert_eq!(list.count() + n, 128);
    }

    list.reclaim(u64::MAX);
    let (_, last_n) = live.unwrap();
    assert_eq!(list.count() + last_n, 128);
}
