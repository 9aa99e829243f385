//! Flush selection across both buffers

use crate::common::*;

#[test]
fn flush_cycle_commits_everything_once() {
    init_tracing();
    let vq = VQueue::new();
    for i in 0..20usize {
        vq.push_insert(&format!("k{}", i), vector_for(i, 2), i as Timestamp + 1);
    }
    vq.push_delete("k3", 100);
    vq.push_delete("k4", 2);

    // k3 is shadowed and dropped; k4 (ts 5) is newer than its tombstone
    let inserts = drain_inserts(&vq, 1_000);
    assert_eq!(inserts.len(), 19);
    assert!(inserts.iter().all(|(k, _)| k != "k3"));
    assert!(inserts.windows(2).all(|w| w[0].1 >= w[1].1));

    let deletes = drain_deletes(&vq, 1_000);
    assert_eq!(
        deletes,
        vec![("k3".to_string(), 100), ("k4".to_string(), 2)]
    );
    assert_eq!((vq.ivq_len(), vq.dvq_len()), (0, 0));
}

#[test]
fn entries_past_cutoff_wait_for_next_flush() {
    let vq = VQueue::new();
    vq.push_insert("early", vector(&[1.0]), 10);
    vq.push_insert("late", vector(&[1.0]), 30);
    vq.push_delete("early-del", 10);
    vq.push_delete("late-del", 30);

    assert_eq!(drain_inserts(&vq, 20), vec![("early".to_string(), 10)]);
    assert_eq!(drain_deletes(&vq, 20), vec![("early-del".to_string(), 10)]);
    assert_eq!((vq.ivq_len(), vq.dvq_len()), (1, 1));

    assert_eq!(drain_inserts(&vq, 30), vec![("late".to_string(), 30)]);
    assert_eq!(drain_deletes(&vq, 30), vec![("late-del".to_string(), 30)]);
}

#[test]
fn delete_flush_retires_equal_timestamp_insert() {
    let vq = VQueue::new();
    vq.push_insert("k", vector(&[1.0]), 10);
    vq.push_delete("k", 10);

    // The insert is hidden from reads but stays buffered until the
    // tombstone is flushed
    assert!(vq.get_vector("k").is_none());
    let stats = vq.range_pop_delete(10, &CancelToken::new(), |_, _| true);
    assert_eq!(stats.delivered, 1);
    assert_eq!(stats.discarded, 1);
    assert_eq!(vq.ivq_len(), 0);
}

#[test]
fn cancelled_before_start_delivers_nothing() {
    let vq = VQueue::new();
    vq.push_insert("a", vector(&[1.0]), 1);
    vq.push_delete("b", 1);
    let cancel = CancelToken::new();
    cancel.cancel();

    let stats = vq.range_pop_insert(10, &cancel, |_, _, _| true);
    assert_eq!(stats.delivered, 0);
    assert!(stats.stopped_early);
    let stats = vq.range_pop_delete(10, &cancel, |_, _| true);
    assert_eq!(stats.delivered, 0);
    assert_eq!((vq.ivq_len(), vq.dvq_len()), (1, 1));
}
