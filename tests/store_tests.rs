use std::collections::HashSet;

use fairsched::scheduler::{Bucket, Pref, Task, TaskInput, TaskStore};

fn task(id: u64, host: &str) -> Task {
    Task::new(id, "map", vec![TaskInput::new(format!("disco://{}", id), host)])
}

#[test]
fn bucket_counts_track_pushes_and_pops() {
    let mut bucket = Bucket::default();
    assert_eq!(bucket.queued(), 0);
    assert_eq!(bucket.lifetime(), 0);

    bucket.push(task(1, "h1"));
    bucket.push(task(2, "h1"));
    assert_eq!(bucket.queued(), 2);
    assert_eq!(bucket.lifetime(), 2);

    // Newest at the front.
    assert_eq!(bucket.peek().map(|t| t.task_id), Some(2));
    assert_eq!(bucket.pop().map(|t| t.task_id), Some(2));

    // Lifetime never decrements.
    assert_eq!(bucket.queued(), 1);
    assert_eq!(bucket.lifetime(), 2);
    assert!(bucket.lifetime() >= bucket.queued() as u64);
}

#[test]
fn store_starts_with_empty_nopref_bucket() {
    let store = TaskStore::new();
    assert!(store.nopref().is_empty());
    assert_eq!(store.queued_total(), 0);
    assert!(store.bucket(&Pref::NoPref).is_some());
    assert!(store.bucket(&Pref::Node("h1".to_string())).is_none());
}

#[test]
fn per_node_buckets_are_created_lazily() {
    let mut store = TaskStore::new();
    assert_eq!(store.queued_at(&"h1".to_string()), 0);

    store.push_task(Pref::Node("h1".to_string()), task(1, "h1"));
    store.push_task(Pref::NoPref, task(2, "h9"));

    assert_eq!(store.queued_at(&"h1".to_string()), 1);
    assert_eq!(store.nopref().queued(), 1);
    assert_eq!(store.queued_total(), 2);
}

#[test]
fn busiest_prefers_largest_queue_then_smallest_key() {
    let mut store = TaskStore::new();
    store.push_task(Pref::Node("a".to_string()), task(1, "a"));
    store.push_task(Pref::Node("b".to_string()), task(2, "b"));
    store.push_task(Pref::Node("b".to_string()), task(3, "b"));
    store.push_task(Pref::Node("c".to_string()), task(4, "c"));
    store.push_task(Pref::Node("c".to_string()), task(5, "c"));

    let keys = store.occupied_nodes();
    assert_eq!(
        keys,
        vec![
            Pref::Node("a".to_string()),
            Pref::Node("b".to_string()),
            Pref::Node("c".to_string()),
        ]
    );

    // b and c tie at two tasks; the smaller key wins.
    assert_eq!(store.busiest(&keys), Some(Pref::Node("b".to_string())));

    // Empty buckets are skipped entirely.
    let empty = TaskStore::new();
    assert_eq!(empty.busiest(&[Pref::NoPref]), None);
}

#[test]
fn drain_departed_keeps_live_buckets_and_rebuilds_nopref() {
    let mut store = TaskStore::new();
    store.push_task(Pref::Node("h1".to_string()), task(1, "h1"));
    store.push_task(Pref::Node("h2".to_string()), task(2, "h2"));
    store.push_task(Pref::NoPref, task(3, "h9"));

    let live: HashSet<String> = ["h1".to_string()].into_iter().collect();
    let orphaned = store.drain_departed(&live);

    // h2's task first (key order), then the nopref task.
    let ids: Vec<u64> = orphaned.iter().map(|t| t.task_id).collect();
    assert_eq!(ids, vec![2, 3]);

    assert_eq!(store.queued_at(&"h1".to_string()), 1);
    assert_eq!(store.queued_at(&"h2".to_string()), 0);
    assert!(store.bucket(&Pref::Node("h2".to_string())).is_none());

    // The nopref bucket is rebuilt fresh, counters included.
    assert!(store.nopref().is_empty());
    assert_eq!(store.nopref().lifetime(), 0);
}

#[test]
fn surviving_buckets_keep_lifetime_counters() {
    let mut store = TaskStore::new();
    store.push_task(Pref::Node("h1".to_string()), task(1, "h1"));
    store.push_task(Pref::Node("h1".to_string()), task(2, "h1"));
    let _ = store.pop_head(&Pref::Node("h1".to_string()));

    let live: HashSet<String> = ["h1".to_string()].into_iter().collect();
    store.drain_departed(&live);

    let bucket = store.bucket(&Pref::Node("h1".to_string())).unwrap();
    assert_eq!(bucket.queued(), 1);
    assert_eq!(bucket.lifetime(), 2);
}
