//! Property tests for pending change accumulation.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use proptest::prelude::*;

use podsync::watcher::PendingChangeSet;

#[derive(Debug, Clone)]
enum Op {
    Change(u8),
    Delete(u8),
}

fn op() -> impl Strategy<Value = Op> {
    // A small path space so the same path is hit repeatedly
    prop_oneof![
        (0u8..8).prop_map(Op::Change),
        (0u8..8).prop_map(Op::Delete),
    ]
}

fn path(n: u8) -> PathBuf {
    PathBuf::from(format!("/src/app/file{n}.txt"))
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: the last event for a path decides its set, and the sets never overlap.
    #[test]
    fn property_last_event_wins(ops in proptest::collection::vec(op(), 0..64)) {
        let mut state = PendingChangeSet::new();
        let mut expected: BTreeMap<u8, bool> = BTreeMap::new();

        for op in &ops {
            match *op {
                Op::Change(n) => {
                    state.record_change(path(n));
                    expected.insert(n, true);
                }
                Op::Delete(n) => {
                    state.record_delete(path(n));
                    expected.insert(n, false);
                }
            }
        }

        for (&n, &changed) in &expected {
            prop_assert_eq!(state.is_changed(&path(n)), changed);
            prop_assert_eq!(state.is_deleted(&path(n)), !changed);
        }

        let batch = state.take_batch();
        for p in &batch.changed {
            prop_assert!(!batch.deleted.contains(p));
        }
        prop_assert_eq!(batch.changed.len() + batch.deleted.len(), expected.len());
    }

    /// PROPERTY: dirty holds exactly when there is something to push.
    #[test]
    fn property_dirty_iff_non_empty(ops in proptest::collection::vec(op(), 0..32)) {
        let mut state = PendingChangeSet::new();
        for op in &ops {
            match *op {
                Op::Change(n) => state.record_change(path(n)),
                Op::Delete(n) => state.record_delete(path(n)),
            }
        }

        prop_assert_eq!(state.is_dirty(), !ops.is_empty());
        let batch = state.take_batch();
        prop_assert_eq!(batch.is_empty(), ops.is_empty());
        prop_assert!(!state.is_dirty());
        prop_assert!(state.take_batch().is_empty());
    }

    /// PROPERTY: a batch is never settled before the delay has passed since the last change.
    #[test]
    fn property_not_settled_before_delay(
        delay_ms in 1u64..5_000,
        gaps in proptest::collection::vec(0u64..2_000, 1..16),
    ) {
        let delay = Duration::from_millis(delay_ms);
        let start = Instant::now();
        let mut state = PendingChangeSet::new();

        let mut at = start;
        for (i, gap) in gaps.iter().enumerate() {
            at += Duration::from_millis(*gap);
            state.record_change_at(path(i as u8), at);
        }

        prop_assert!(!state.is_settled(delay, at));
        prop_assert!(!state.is_settled(delay, at + delay - Duration::from_millis(1)));
        prop_assert!(state.is_settled(delay, at + delay));
    }
}
