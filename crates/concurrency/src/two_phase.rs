//! Strict two-phase locking executor
//!
//! Processes schedule records one at a time against a lock table and an
//! in-place store. READ requests SHARED, WRITE requests EXCLUSIVE; a
//! request that cannot be granted is recorded as BLOCKED and parked in the
//! key's wait queue. COMMIT releases every lock the transaction holds
//! (strict 2PL: nothing is released early), and each release re-scans that
//! key's wait queue front-to-back so one release can wake several
//! compatible waiters in a single pass.
//!
//! There is no deadlock detection. A wait cycle leaves its requests parked
//! forever; the replay simply ends with them still queued. That is an
//! accepted property of the model, not an error.
//!
//! Operations naming a transaction that already committed are rejected
//! with `result: ABORT, why: "not active"` and have no lock or store
//! effect. A transaction never begun is registered implicitly on first
//! use; locks do not require a prior BEGIN.

use crate::lock::{DeferredOp, LockDecision, LockTable, WaitingOp};
use crate::trace_log::TraceLog;
use lockstep_core::{EventBody, Key, LockMode, OpKind, Operation, TraceEvent, TxnId, Value};
use std::collections::{BTreeMap, HashSet};

const NOT_ACTIVE: &str = "not active";

/// One 2PL replay in progress
///
/// Owns the store, the lock table, and the trace log; created per
/// schedule, discarded after. The seed state is cloned, never mutated in
/// the caller's hands.
#[derive(Debug)]
pub struct TwoPhaseEngine {
    store: BTreeMap<Key, Value>,
    locks: LockTable,
    registered: HashSet<TxnId>,
    committed: HashSet<TxnId>,
    log: TraceLog,
}

impl TwoPhaseEngine {
    /// Create an engine over a snapshot of `initial_state`
    pub fn new(initial_state: &BTreeMap<Key, Value>) -> Self {
        TwoPhaseEngine {
            store: initial_state.clone(),
            locks: LockTable::new(),
            registered: HashSet::new(),
            committed: HashSet::new(),
            log: TraceLog::new(),
        }
    }

    /// Process one schedule record
    pub fn apply(&mut self, op: &Operation) {
        match op {
            Operation::Begin { t } => self.begin(*t),
            Operation::Read { t, item } => self.read(*t, item),
            Operation::Write { t, item, value } => self.write(*t, item, value),
            Operation::Commit { t } => self.commit(*t),
        }
    }

    /// Finish the replay, yielding the trace and the final store contents
    ///
    /// The final state for 2PL is simply the live in-place value of every
    /// key. Requests still parked at this point stay parked forever.
    pub fn into_outcome(self) -> (Vec<TraceEvent>, BTreeMap<Key, Value>) {
        let still_blocked = self.locks.total_waiting();
        if still_blocked > 0 {
            tracing::debug!(
                parked = still_blocked,
                "schedule finished with requests still blocked"
            );
        }
        (self.log.into_events(), self.store)
    }

    fn begin(&mut self, t: TxnId) {
        if self.committed.contains(&t) {
            self.log
                .emit(EventBody::op(t, OpKind::Begin).aborted(Some(NOT_ACTIVE)));
            return;
        }
        self.registered.insert(t);
        self.log.emit(EventBody::op(t, OpKind::Begin));
    }

    fn read(&mut self, t: TxnId, item: &Key) {
        if self.committed.contains(&t) {
            self.log.emit(
                EventBody::op(t, OpKind::Read)
                    .with_item(item.clone())
                    .aborted(Some(NOT_ACTIVE)),
            );
            return;
        }
        self.registered.insert(t);

        match self.locks.check(t, item, LockMode::Shared) {
            LockDecision::Granted => {
                let effective = self.locks.grant(t, item, LockMode::Shared);
                self.log.emit(EventBody::Lock {
                    item: item.clone(),
                    grant: effective,
                    to: t,
                });
                let value = self.stored_value(item);
                self.log.emit(
                    EventBody::op(t, OpKind::Read)
                        .with_item(item.clone())
                        .with_value(value),
                );
            }
            LockDecision::Wait { why } => {
                tracing::debug!(txn = %t, key = %item, "read blocked");
                self.log.emit(
                    EventBody::op(t, OpKind::Read)
                        .with_item(item.clone())
                        .blocked(why),
                );
                self.locks.enqueue(
                    item,
                    WaitingOp {
                        txn: t,
                        mode: LockMode::Shared,
                        deferred: DeferredOp::Read,
                    },
                );
            }
        }
    }

    fn write(&mut self, t: TxnId, item: &Key, value: &Value) {
        if self.committed.contains(&t) {
            self.log.emit(
                EventBody::op(t, OpKind::Write)
                    .with_item(item.clone())
                    .with_value(value.clone())
                    .aborted(Some(NOT_ACTIVE)),
            );
            return;
        }
        self.registered.insert(t);

        match self.locks.check(t, item, LockMode::Exclusive) {
            LockDecision::Granted => {
                let effective = self.locks.grant(t, item, LockMode::Exclusive);
                self.log.emit(EventBody::Lock {
                    item: item.clone(),
                    grant: effective,
                    to: t,
                });
                self.store.insert(item.clone(), value.clone());
                self.log.emit(
                    EventBody::op(t, OpKind::Write)
                        .with_item(item.clone())
                        .with_value(value.clone()),
                );
            }
            LockDecision::Wait { why } => {
                tracing::debug!(txn = %t, key = %item, "write blocked");
                self.log.emit(
                    EventBody::op(t, OpKind::Write)
                        .with_item(item.clone())
                        .with_value(value.clone())
                        .blocked(why),
                );
                self.locks.enqueue(
                    item,
                    WaitingOp {
                        txn: t,
                        mode: LockMode::Exclusive,
                        deferred: DeferredOp::Write {
                            value: value.clone(),
                        },
                    },
                );
            }
        }
    }

    fn commit(&mut self, t: TxnId) {
        if self.committed.contains(&t) {
            self.log
                .emit(EventBody::op(t, OpKind::Commit).aborted(Some(NOT_ACTIVE)));
            return;
        }
        self.log.emit(EventBody::op(t, OpKind::Commit));
        self.committed.insert(t);
        self.release_and_wake(t);
    }

    /// Release every lock `t` holds; after each UNLOCK, re-scan that key's
    /// wait queue and grant whatever has become compatible
    fn release_and_wake(&mut self, t: TxnId) {
        for (key, mode) in self.locks.release_all(t) {
            self.log.emit(EventBody::Unlock {
                item: key.clone(),
                t,
                mode,
            });
            self.wake_waiters(&key);
        }
    }

    /// Single front-to-back pass over `key`'s wait queue
    ///
    /// Each entry is re-tested against the live lock table, so a grant
    /// earlier in the pass affects later entries: an EXCLUSIVE release can
    /// wake several SHARED waiters in one pass, while an EXCLUSIVE waiter
    /// behind them stays parked. The queue is drained and rebuilt from the
    /// still-blocked remainder rather than edited mid-scan.
    fn wake_waiters(&mut self, key: &Key) {
        let queue = self.locks.take_queue(key);
        let mut still_blocked = std::collections::VecDeque::new();

        for waiter in queue {
            match self.locks.check(waiter.txn, key, waiter.mode) {
                LockDecision::Granted => {
                    let effective = self.locks.grant(waiter.txn, key, waiter.mode);
                    self.log.emit(EventBody::Lock {
                        item: key.clone(),
                        grant: effective,
                        to: waiter.txn,
                    });
                    let kind = match waiter.deferred {
                        DeferredOp::Read => OpKind::Read,
                        DeferredOp::Write { .. } => OpKind::Write,
                    };
                    self.log.emit(EventBody::Unblock {
                        t: waiter.txn,
                        op: kind,
                        item: key.clone(),
                    });
                    tracing::debug!(txn = %waiter.txn, key = %key, "woke blocked request");

                    // the deferred effect runs now, inside the release
                    match waiter.deferred {
                        DeferredOp::Read => {
                            let value = self.stored_value(key);
                            self.log.emit(
                                EventBody::op(waiter.txn, OpKind::Read)
                                    .with_item(key.clone())
                                    .with_value(value),
                            );
                        }
                        DeferredOp::Write { value } => {
                            self.store.insert(key.clone(), value.clone());
                            self.log.emit(
                                EventBody::op(waiter.txn, OpKind::Write)
                                    .with_item(key.clone())
                                    .with_value(value),
                            );
                        }
                    }
                }
                LockDecision::Wait { .. } => still_blocked.push_back(waiter),
            }
        }

        self.locks.restore_queue(key, still_blocked);
    }

    fn stored_value(&self, key: &Key) -> Value {
        self.store.get(key).cloned().unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn test_read_of_unknown_key_observes_null() {
        let (trace, _) = run(
            &[
                Operation::Begin { t: TxnId(1) },
                Operation::Read {
                    t: TxnId(1),
                    item: Key::from("missing"),
                },
            ],
            &initial(&[]),
        );
        match &trace[2].body {
            EventBody::Op { value, .. } => assert_eq!(value, &Some(Value::Null)),
            other => panic!("expected OP event, got {:?}", other),
        }
    }

    #[test]
    fn test_operation_on_committed_txn_is_rejected() {
        let (trace, state) = run(
            &[
                Operation::Begin { t: TxnId(1) },
                Operation::Commit { t: TxnId(1) },
                Operation::Write {
                    t: TxnId(1),
                    item: Key::from("A"),
                    value: Value::Int(1),
                },
            ],
            &initial(&[("A", 100)]),
        );
        match &trace[2].body {
            EventBody::Op { result, why, .. } => {
                assert_eq!(result, &Some(lockstep_core::OpResult::Abort));
                assert_eq!(why.as_deref(), Some("not active"));
            }
            other => panic!("expected OP event, got {:?}", other),
        }
        // no store effect
        assert_eq!(state[&Key::from("A")], Value::Int(100));
    }

    #[test]
    fn test_seed_state_is_not_mutated() {
        let seed = initial(&[("A", 100)]);
        let (_, state) = run(
            &[
                Operation::Begin { t: TxnId(1) },
                Operation::Write {
                    t: TxnId(1),
                    item: Key::from("A"),
                    value: Value::Int(5),
                },
            ],
            &seed,
        );
        assert_eq!(seed[&Key::from("A")], Value::Int(100));
        assert_eq!(state[&Key::from("A")], Value::Int(5));
    }
}
