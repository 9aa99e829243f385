//! Property tests against a sequential model of the buffers

use crate::common::*;
use proptest::prelude::*;
use std::collections::HashMap;

#[derive(Debug, Clone)]
enum Op {
    Insert(u8, Timestamp),
    Delete(u8, Timestamp),
    PopInsert(u8),
    PopDelete(u8),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u8..8, 1i64..50).prop_map(|(k, ts)| Op::Insert(k, ts)),
        2 => (0u8..8, 1i64..50).prop_map(|(k, ts)| Op::Delete(k, ts)),
        1 => (0u8..8).prop_map(Op::PopInsert),
        1 => (0u8..8).prop_map(Op::PopDelete),
    ]
}

fn key(k: u8) -> String {
    format!("key-{}", k)
}

#[derive(Default)]
struct Model {
    inserts: HashMap<String, Timestamp>,
    deletes: HashMap<String, Timestamp>,
}

impl Model {
    fn apply(&mut self, op: &Op) {
        match op {
            Op::Insert(k, ts) => {
                let k = key(*k);
                if self.deletes.get(&k).is_some_and(|dts| dts >= ts) {
                    return;
                }
                if self.inserts.get(&k).map_or(true, |its| ts > its) {
                    self.inserts.insert(k, *ts);
                }
            }
            Op::Delete(k, ts) => {
                let k = key(*k);
                if self.deletes.get(&k).map_or(true, |dts| ts > dts) {
                    self.deletes.insert(k, *ts);
                }
            }
            Op::PopInsert(k) => {
                self.inserts.remove(&key(*k));
            }
            Op::PopDelete(k) => {
                self.deletes.remove(&key(*k));
            }
        }
    }
}

fn apply(vq: &VQueue, op: &Op) {
    match op {
        Op::Insert(k, ts) => {
            vq.push_insert(&key(*k), vector(&[*ts as f32]), *ts);
        }
        Op::Delete(k, ts) => {
            vq.push_delete(&key(*k), *ts);
        }
        Op::PopInsert(k) => {
            vq.pop_insert(&key(*k));
        }
        Op::PopDelete(k) => {
            vq.pop_delete(&key(*k));
        }
    }
}

proptest! {
    #[test]
    fn counts_track_live_entries(ops in prop::collection::vec(op_strategy(), 0..200)) {
        let vq = VQueue::new();
        let mut model = Model::default();
        for op in &ops {
            apply(&vq, op);
            model.apply(op);
            prop_assert_eq!(vq.ivq_len(), model.inserts.len());
            prop_assert_eq!(vq.dvq_len(), model.deletes.len());
        }
        for k in 0u8..8 {
            let lookup = vq.get_vector_with_timestamp(&key(k));
            let its = model.inserts.get(&key(k)).copied().unwrap_or(0);
            let dts = model.deletes.get(&key(k)).copied().unwrap_or(0);
            prop_assert_eq!(lookup.insert_ts, its);
            prop_assert_eq!(lookup.delete_ts, dts);
            prop_assert_eq!(lookup.exists, its != 0 && its > dts);
        }
    }

    #[test]
    fn newest_insert_wins(timestamps in prop::collection::vec(1i64..1_000, 1..50)) {
        let vq = VQueue::new();
        for ts in &timestamps {
            vq.push_insert("k", vector(&[*ts as f32]), *ts);
        }
        let max = timestamps.iter().copied().max().unwrap();
        let (vec, ts) = vq.get_vector("k").unwrap();
        prop_assert_eq!(ts, max);
        prop_assert_eq!(vec[0], max as f32);
        prop_assert_eq!(vq.ivq_len(), 1);
    }

    #[test]
    fn flush_respects_cutoff_and_order(
        ops in prop::collection::vec(op_strategy(), 0..200),
        cutoff in 0i64..60,
    ) {
        let vq = VQueue::new();
        for op in &ops {
            apply(&vq, op);
        }

        let inserts = drain_inserts(&vq, cutoff);
        prop_assert!(inserts.iter().all(|(_, ts)| *ts <= cutoff));
        prop_assert!(inserts.windows(2).all(|w| w[0].1 >= w[1].1));

        let deletes = drain_deletes(&vq, cutoff);
        prop_assert!(deletes.iter().all(|(_, ts)| *ts <= cutoff));
        prop_assert!(deletes.windows(2).all(|w| w[0].1 >= w[1].1));

        // Nothing at or below the cutoff survives a full flush cycle
        vq.range(&CancelToken::new(), |_, _, ts| {
            assert!(ts > cutoff);
            true
        });
        prop_assert!(drain_deletes(&vq, cutoff).is_empty());
    }
}
