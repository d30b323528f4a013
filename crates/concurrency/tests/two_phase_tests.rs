//! 2PL engine integration tests
//!
//! These exercise the lock manager and executor through full schedules:
//! blocking, wait queues, cascading grant-on-release, upgrades, and the
//! accepted permanent-blocking behavior of wait cycles.
//!
//! ## Test Categories
//!
//! 1. **Granting & Blocking** - compatibility rule over whole schedules
//! 2. **Release & Wakeup** - UNLOCK/LOCK/UNBLOCK cascades
//! 3. **Upgrades** - S→X in place
//! 4. **Degenerate Schedules** - wait cycles, finished transactions

use lockstep_concurrency::TwoPhaseEngine;
use lockstep_core::{
    EventBody, Key, LockMode, OpKind, OpResult, Operation, TraceEvent, TxnId, Value,
};
use std::collections::BTreeMap;

// ============================================================================
// Test Helpers
// ============================================================================

fn initial(pairs: &[(&str, i64)]) -> BTreeMap<Key, Value> {
    pairs
        .iter()
        .map(|(k, v)| (Key::from(*k), Value::Int(*v)))
        .collect()
}

fn run(schedule: &[Operation], seed: &BTreeMap<Key, Value>) -> (Vec<TraceEvent>, BTreeMap<Key, Value>) {
    let mut engine = TwoPhaseEngine::new(seed);
    for op in schedule {
        engine.apply(op);
    }
    engine.into_outcome()
}

fn begin(t: u32) -> Operation {
    Operation::Begin { t: TxnId(t) }
}

fn read(t: u32, item: &str) -> Operation {
    Operation::Read {
        t: TxnId(t),
        item: Key::from(item),
    }
}

fn write(t: u32, item: &str, value: i64) -> Operation {
    Operation::Write {
        t: TxnId(t),
        item: Key::from(item),
        value: Value::Int(value),
    }
}

fn commit(t: u32) -> Operation {
    Operation::Commit { t: TxnId(t) }
}

fn event(step: u64, body: EventBody) -> TraceEvent {
    TraceEvent { step, body }
}

// ============================================================================
// SECTION 1: Granting & Blocking
// ============================================================================

mod granting_and_blocking {
    use super::*;

    /// A writer holding X(A) blocks a reader; the reader's request is
    /// parked and produces no value until the writer commits.
    #[test]
    fn test_reader_blocks_behind_writer() {
        let schedule = [begin(1), write(1, "A", 50), begin(2), read(2, "A"), commit(1)];
        let (trace, state) = run(&schedule, &initial(&[("A", 100)]));

        let expected = vec![
            event(1, EventBody::op(TxnId(1), OpKind::Begin)),
            event(
                2,
                EventBody::Lock {
                    item: Key::from("A"),
                    grant: LockMode::Exclusive,
                    to: TxnId(1),
                },
            ),
            event(
                3,
                EventBody::op(TxnId(1), OpKind::Write)
                    .with_item(Key::from("A"))
                    .with_value(Value::Int(50)),
            ),
            event(4, EventBody::op(TxnId(2), OpKind::Begin)),
            event(
                5,
                EventBody::op(TxnId(2), OpKind::Read)
                    .with_item(Key::from("A"))
                    .blocked("waiting for X(A)"),
            ),
            event(6, EventBody::op(TxnId(1), OpKind::Commit)),
            event(
                7,
                EventBody::Unlock {
                    item: Key::from("A"),
                    t: TxnId(1),
                    mode: LockMode::Exclusive,
                },
            ),
            event(
                8,
                EventBody::Lock {
                    item: Key::from("A"),
                    grant: LockMode::Shared,
                    to: TxnId(2),
                },
            ),
            event(
                9,
                EventBody::Unblock {
                    t: TxnId(2),
                    op: OpKind::Read,
                    item: Key::from("A"),
                },
            ),
            // the deferred read observes the committed value, not the
            // value at block time
            event(
                10,
                EventBody::op(TxnId(2), OpKind::Read)
                    .with_item(Key::from("A"))
                    .with_value(Value::Int(50)),
            ),
        ];
        assert_eq!(trace, expected);
        assert_eq!(state[&Key::from("A")], Value::Int(50));
    }

    /// Co-readers share a key without blocking each other.
    #[test]
    fn test_shared_readers_do_not_block() {
        let schedule = [begin(1), begin(2), read(1, "A"), read(2, "A")];
        let (trace, _) = run(&schedule, &initial(&[("A", 100)]));

        assert!(trace.iter().all(|e| !matches!(
            &e.body,
            EventBody::Op {
                result: Some(OpResult::Blocked),
                ..
            }
        )));
    }

    /// A writer blocks behind any reader it does not own.
    #[test]
    fn test_writer_blocks_behind_foreign_reader() {
        let schedule = [begin(1), begin(2), read(1, "A"), write(2, "A", 7)];
        let (trace, state) = run(&schedule, &initial(&[("A", 100)]));

        match &trace.last().unwrap().body {
            EventBody::Op { result, why, .. } => {
                assert_eq!(result, &Some(OpResult::Blocked));
                assert_eq!(why.as_deref(), Some("waiting for X(A)"));
            }
            other => panic!("expected OP event, got {:?}", other),
        }
        // the blocked write took no effect
        assert_eq!(state[&Key::from("A")], Value::Int(100));
    }

    /// A blocked WRITE still records the value it carried.
    #[test]
    fn test_blocked_write_event_carries_value() {
        let schedule = [begin(1), write(1, "A", 1), begin(2), write(2, "A", 2)];
        let (trace, _) = run(&schedule, &initial(&[("A", 100)]));

        match &trace.last().unwrap().body {
            EventBody::Op { op, value, result, .. } => {
                assert_eq!(*op, OpKind::Write);
                assert_eq!(value, &Some(Value::Int(2)));
                assert_eq!(result, &Some(OpResult::Blocked));
            }
            other => panic!("expected OP event, got {:?}", other),
        }
    }
}

// ============================================================================
// SECTION 2: Release & Wakeup
// ============================================================================

mod release_and_wakeup {
    use super::*;

    /// One EXCLUSIVE release wakes every compatible SHARED waiter in a
    /// single pass, while an EXCLUSIVE waiter behind them stays parked.
    #[test]
    fn test_release_wakes_multiple_shared_waiters() {
        let schedule = [
            begin(1),
            write(1, "A", 1),
            begin(2),
            read(2, "A"),
            begin(3),
            read(3, "A"),
            begin(4),
            write(4, "A", 9),
            commit(1),
        ];
        let (trace, state) = run(&schedule, &initial(&[("A", 100)]));

        let unblocked: Vec<TxnId> = trace
            .iter()
            .filter_map(|e| match &e.body {
                EventBody::Unblock { t, .. } => Some(*t),
                _ => None,
            })
            .collect();
        assert_eq!(unblocked, vec![TxnId(2), TxnId(3)]);

        // both woken reads observed the committed value
        let woken_reads: Vec<&Option<Value>> = trace
            .iter()
            .filter_map(|e| match &e.body {
                EventBody::Op {
                    t,
                    op: OpKind::Read,
                    value,
                    result: None,
                    ..
                } if *t == TxnId(2) || *t == TxnId(3) => Some(value),
                _ => None,
            })
            .collect();
        assert_eq!(woken_reads, vec![&Some(Value::Int(1)), &Some(Value::Int(1))]);

        // transaction 4's write never ran
        assert_eq!(state[&Key::from("A")], Value::Int(1));
    }

    /// A deferred WRITE applies its value at wake time, inside the
    /// releasing commit.
    #[test]
    fn test_deferred_write_applies_on_wakeup() {
        let schedule = [
            begin(1),
            write(1, "A", 1),
            begin(2),
            write(2, "A", 2),
            commit(1),
        ];
        let (trace, state) = run(&schedule, &initial(&[("A", 100)]));

        // UNLOCK, then LOCK/UNBLOCK/OP for the woken writer
        let tail: Vec<&EventBody> = trace.iter().map(|e| &e.body).skip(6).collect();
        assert_eq!(
            tail,
            vec![
                &EventBody::Unlock {
                    item: Key::from("A"),
                    t: TxnId(1),
                    mode: LockMode::Exclusive,
                },
                &EventBody::Lock {
                    item: Key::from("A"),
                    grant: LockMode::Exclusive,
                    to: TxnId(2),
                },
                &EventBody::Unblock {
                    t: TxnId(2),
                    op: OpKind::Write,
                    item: Key::from("A"),
                },
                &EventBody::op(TxnId(2), OpKind::Write)
                    .with_item(Key::from("A"))
                    .with_value(Value::Int(2)),
            ]
        );
        assert_eq!(state[&Key::from("A")], Value::Int(2));
    }

    /// Locks release in acquisition order, each followed by its own wait
    /// queue scan.
    #[test]
    fn test_unlocks_follow_acquisition_order() {
        let schedule = [begin(1), write(1, "B", 1), read(1, "A"), commit(1)];
        let (trace, _) = run(&schedule, &initial(&[("A", 100), ("B", 100)]));

        let unlocked: Vec<(Key, LockMode)> = trace
            .iter()
            .filter_map(|e| match &e.body {
                EventBody::Unlock { item, mode, .. } => Some((item.clone(), *mode)),
                _ => None,
            })
            .collect();
        assert_eq!(
            unlocked,
            vec![
                (Key::from("B"), LockMode::Exclusive),
                (Key::from("A"), LockMode::Shared),
            ]
        );
    }

    /// Waking one transaction's request can chain into granting the next:
    /// a reader queued behind a writer queued behind a reader.
    #[test]
    fn test_wakeup_cascade_stops_at_incompatible_waiter() {
        let schedule = [
            begin(1),
            write(1, "A", 1),
            begin(2),
            write(2, "A", 2),
            begin(3),
            read(3, "A"),
            commit(1),
        ];
        let (trace, state) = run(&schedule, &initial(&[("A", 100)]));

        // commit(1) wakes the queued writer; the reader behind it must
        // stay parked because the woken writer now holds X
        let unblocked: Vec<TxnId> = trace
            .iter()
            .filter_map(|e| match &e.body {
                EventBody::Unblock { t, .. } => Some(*t),
                _ => None,
            })
            .collect();
        assert_eq!(unblocked, vec![TxnId(2)]);
        assert_eq!(state[&Key::from("A")], Value::Int(2));
    }
}

// ============================================================================
// SECTION 3: Upgrades
// ============================================================================

mod upgrades {
    use super::*;

    /// A sole SHARED holder writing the same key upgrades S→X in place.
    #[test]
    fn test_sole_reader_upgrades_in_place() {
        let schedule = [begin(1), read(1, "A"), write(1, "A", 5), commit(1)];
        let (trace, state) = run(&schedule, &initial(&[("A", 100)]));

        let expected = vec![
            event(1, EventBody::op(TxnId(1), OpKind::Begin)),
            event(
                2,
                EventBody::Lock {
                    item: Key::from("A"),
                    grant: LockMode::Shared,
                    to: TxnId(1),
                },
            ),
            event(
                3,
                EventBody::op(TxnId(1), OpKind::Read)
                    .with_item(Key::from("A"))
                    .with_value(Value::Int(100)),
            ),
            event(
                4,
                EventBody::Lock {
                    item: Key::from("A"),
                    grant: LockMode::Exclusive,
                    to: TxnId(1),
                },
            ),
            event(
                5,
                EventBody::op(TxnId(1), OpKind::Write)
                    .with_item(Key::from("A"))
                    .with_value(Value::Int(5)),
            ),
            event(6, EventBody::op(TxnId(1), OpKind::Commit)),
            // a single UNLOCK: the upgrade replaced the S entry rather
            // than adding a second one
            event(
                7,
                EventBody::Unlock {
                    item: Key::from("A"),
                    t: TxnId(1),
                    mode: LockMode::Exclusive,
                },
            ),
        ];
        assert_eq!(trace, expected);
        assert_eq!(state[&Key::from("A")], Value::Int(5));
    }

    /// An upgrade blocked by a co-reader waits for "X(key)".
    #[test]
    fn test_upgrade_blocked_by_co_reader() {
        let schedule = [begin(1), begin(2), read(1, "A"), read(2, "A"), write(1, "A", 5)];
        let (trace, _) = run(&schedule, &initial(&[("A", 100)]));

        match &trace.last().unwrap().body {
            EventBody::Op { result, why, .. } => {
                assert_eq!(result, &Some(OpResult::Blocked));
                assert_eq!(why.as_deref(), Some("waiting for X(A)"));
            }
            other => panic!("expected OP event, got {:?}", other),
        }
    }

    /// An EXCLUSIVE holder reading its own key keeps EXCLUSIVE — the
    /// re-grant never downgrades.
    #[test]
    fn test_writer_rereading_keeps_exclusive() {
        let schedule = [begin(1), write(1, "A", 5), read(1, "A"), commit(1)];
        let (trace, _) = run(&schedule, &initial(&[("A", 100)]));

        let grants: Vec<LockMode> = trace
            .iter()
            .filter_map(|e| match &e.body {
                EventBody::Lock { grant, .. } => Some(*grant),
                _ => None,
            })
            .collect();
        assert_eq!(grants, vec![LockMode::Exclusive, LockMode::Exclusive]);

        // and the eventual UNLOCK releases X
        let unlock_modes: Vec<LockMode> = trace
            .iter()
            .filter_map(|e| match &e.body {
                EventBody::Unlock { mode, .. } => Some(*mode),
                _ => None,
            })
            .collect();
        assert_eq!(unlock_modes, vec![LockMode::Exclusive]);
    }
}

// ============================================================================
// SECTION 4: Degenerate Schedules
// ============================================================================

mod degenerate_schedules {
    use super::*;

    /// Two transactions each holding what the other needs block forever.
    /// No error, no timeout: the schedule just ends with both parked.
    #[test]
    fn test_wait_cycle_blocks_forever() {
        let schedule = [
            begin(1),
            write(1, "A", 1),
            begin(2),
            write(2, "B", 2),
            write(1, "B", 3),
            write(2, "A", 4),
        ];
        let (trace, state) = run(&schedule, &initial(&[("A", 0), ("B", 0)]));

        let blocked_count = trace
            .iter()
            .filter(|e| {
                matches!(
                    &e.body,
                    EventBody::Op {
                        result: Some(OpResult::Blocked),
                        ..
                    }
                )
            })
            .count();
        assert_eq!(blocked_count, 2);
        assert!(!trace
            .iter()
            .any(|e| matches!(&e.body, EventBody::Unblock { .. })));

        // neither deferred write ran
        assert_eq!(state[&Key::from("A")], Value::Int(1));
        assert_eq!(state[&Key::from("B")], Value::Int(2));
    }

    /// Operations naming an already-committed transaction degrade to
    /// ABORT-result events instead of touching locks or the store.
    #[test]
    fn test_committed_transaction_is_not_active() {
        let schedule = [begin(1), commit(1), read(1, "A"), commit(1)];
        let (trace, _) = run(&schedule, &initial(&[("A", 100)]));

        for e in &trace[2..] {
            match &e.body {
                EventBody::Op { result, why, .. } => {
                    assert_eq!(result, &Some(OpResult::Abort));
                    assert_eq!(why.as_deref(), Some("not active"));
                }
                other => panic!("expected OP event, got {:?}", other),
            }
        }
    }

    /// A transaction that never issued BEGIN may still lock: it is
    /// registered implicitly on first use.
    #[test]
    fn test_implicit_registration_on_first_use() {
        let schedule = [write(1, "A", 5), commit(1)];
        let (trace, state) = run(&schedule, &initial(&[("A", 100)]));

        assert_eq!(state[&Key::from("A")], Value::Int(5));
        assert!(trace
            .iter()
            .any(|e| matches!(&e.body, EventBody::Lock { .. })));
    }
}

// ============================================================================
// SECTION 5: Trace Shape
// ============================================================================

mod trace_shape {
    use super::*;

    /// Steps are monotonic and gapless across every emitted event.
    #[test]
    fn test_steps_are_gapless() {
        let schedule = [
            begin(1),
            write(1, "A", 1),
            begin(2),
            read(2, "A"),
            commit(1),
            commit(2),
        ];
        let (trace, _) = run(&schedule, &initial(&[("A", 100)]));

        for (i, e) in trace.iter().enumerate() {
            assert_eq!(e.step, i as u64 + 1);
        }
    }

    /// One input record can yield several events (grant) or exactly one
    /// (block), never zero once it reaches the executor.
    #[test]
    fn test_granted_write_emits_lock_then_op() {
        let schedule = [begin(1), write(1, "A", 1)];
        let (trace, _) = run(&schedule, &initial(&[("A", 100)]));

        assert!(matches!(&trace[1].body, EventBody::Lock { .. }));
        assert!(matches!(
            &trace[2].body,
            EventBody::Op {
                op: OpKind::Write,
                result: None,
                ..
            }
        ));
    }
}
