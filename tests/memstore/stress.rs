//! Concurrent readers, writers and timestamp updates on a shared manager

use crate::common::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

const THREADS: usize = 8;
const KEYS: u32 = 32;

#[test]
fn concurrent_updates_only_fail_with_decision_errors() {
    let dm = shared_manager();
    for k in 0..KEYS {
        dm.kvs().set(&format!("k{}", k), k, 1).unwrap();
    }
    let barrier = Arc::new(Barrier::new(THREADS));
    let applied = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..THREADS)
        .map(|thread_id| {
            let dm = Arc::clone(&dm);
            let barrier = Arc::clone(&barrier);
            let applied = Arc::clone(&applied);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..500i64 {
                    let key = format!("k{}", (i as u32 + thread_id as u32) % KEYS);
                    let ts = 10 + i * THREADS as i64 + thread_id as i64;
                    match thread_id % 3 {
                        0 => match dm.update_timestamp(&key, ts, false, Some(&index_source)) {
                            Ok(()) => {
                                applied.fetch_add(1, Ordering::Relaxed);
                            }
                            Err(Error::NewerObjectExists { .. })
                            | Err(Error::NothingToUpdate(_)) => {}
                            Err(other) => panic!("unexpected error: {}", other),
                        },
                        1 => {
                            dm.vqueue().push_insert(&key, vector(&[1.0]), ts);
                        }
                        _ => {
                            dm.vqueue().push_delete(&key, ts);
                            let _ = dm.exists(&key);
                        }
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(applied.load(Ordering::Relaxed) > 0);
    // Committed rows never disappear through updates
    assert_eq!(dm.kvs().len(), KEYS as usize);
    for k in 0..KEYS {
        assert!(dm.kvs().get(&format!("k{}", k)).unwrap().timestamp >= 1);
    }
}

#[test]
fn readers_see_consistent_objects_while_flushing() {
    let dm = shared_manager();
    for k in 0..KEYS {
        dm.vqueue().push_insert(&format!("k{}", k), vector(&[k as f32]), 10);
    }
    let barrier = Arc::new(Barrier::new(3));

    let flusher = {
        let dm = Arc::clone(&dm);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            let mut oid = 0;
            dm.vqueue()
                .range_pop_insert(10, &CancelToken::new(), |key, _, ts| {
                    oid += 1;
                    dm.kvs().set(key, oid, ts).is_ok()
                });
        })
    };
    let readers: Vec<_> = (0..2)
        .map(|_| {
            let dm = Arc::clone(&dm);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..50 {
                    for k in 0..KEYS {
                        // Committed before popped, so never absent
                        assert!(dm.exists(&format!("k{}", k)).is_some());
                    }
                }
            })
        })
        .collect();
    flusher.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(dm.vqueue().ivq_len(), 0);
    assert_eq!(dm.uuids().len(), KEYS as usize);
}
