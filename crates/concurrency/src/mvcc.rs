//! MVCC engine with snapshot isolation
//!
//! Each key carries an append-only chain of committed versions ordered by
//! commit timestamp; the seed state sits at timestamp 0. A transaction
//! reads the newest version no younger than its start timestamp
//! (snapshot isolation) except for its own buffered writes, which it
//! always observes (read-your-writes). Writes are buffered, invisible to
//! everyone else, and installed only at COMMIT — and only if no other
//! commit has installed a newer version of any written key since the
//! transaction started (first-committer-wins). A losing transaction
//! aborts: its buffer is discarded and nothing is installed.
//!
//! Timestamps come from the trace log's step counter: a transaction's
//! start timestamp is the step of its BEGIN event, its commit timestamp
//! the step of its COMMIT event. There is no other clock.

use crate::trace_log::TraceLog;
use lockstep_core::{EventBody, Key, OpKind, Operation, TraceEvent, TxnId, Value};
use std::collections::{BTreeMap, HashMap};

/// One committed version of a key
#[derive(Debug, Clone, PartialEq)]
struct Version {
    value: Value,
    commit_ts: u64,
}

/// Lifecycle state of a transaction
///
/// `Committed` and `Aborted` are terminal; ids are never reused within a
/// schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxnStatus {
    Active,
    Committed,
    Aborted,
}

/// Per-transaction bookkeeping
#[derive(Debug)]
struct TxnRecord {
    /// Step of the BEGIN event (or of the first WRITE for lazily created
    /// transactions); fixes the snapshot this transaction reads
    start_ts: u64,
    /// Buffered writes, invisible until commit; key-ordered so installs
    /// are reproducible
    writes: BTreeMap<Key, Value>,
    status: TxnStatus,
}

impl TxnRecord {
    fn active(start_ts: u64) -> Self {
        TxnRecord {
            start_ts,
            writes: BTreeMap::new(),
            status: TxnStatus::Active,
        }
    }

    fn is_active(&self) -> bool {
        self.status == TxnStatus::Active
    }
}

/// One MVCC replay in progress
#[derive(Debug)]
pub struct MvccEngine {
    /// key → versions, ascending commit timestamp, seeded at ts 0
    chains: BTreeMap<Key, Vec<Version>>,
    transactions: HashMap<TxnId, TxnRecord>,
    log: TraceLog,
}

impl MvccEngine {
    /// Create an engine with every initial-state key seeded at timestamp 0
    pub fn new(initial_state: &BTreeMap<Key, Value>) -> Self {
        let chains = initial_state
            .iter()
            .map(|(key, value)| {
                (
                    key.clone(),
                    vec![Version {
                        value: value.clone(),
                        commit_ts: 0,
                    }],
                )
            })
            .collect();
        MvccEngine {
            chains,
            transactions: HashMap::new(),
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

    /// Finish the replay, yielding the trace and the newest committed
    /// version of every key
    pub fn into_outcome(self) -> (Vec<TraceEvent>, BTreeMap<Key, Value>) {
        let final_state = self
            .chains
            .iter()
            .filter_map(|(key, chain)| {
                chain
                    .last()
                    .map(|version| (key.clone(), version.value.clone()))
            })
            .collect();
        (self.log.into_events(), final_state)
    }

    fn begin(&mut self, t: TxnId) {
        let start_ts = self.log.current_step();
        self.transactions.insert(t, TxnRecord::active(start_ts));
        self.log.emit(EventBody::op(t, OpKind::Begin));
    }

    fn read(&mut self, t: TxnId, item: &Key) {
        let txn = match self.transactions.get(&t) {
            Some(txn) if txn.is_active() => txn,
            // no transaction context: degenerate null read
            _ => {
                self.log.emit(
                    EventBody::op(t, OpKind::Read)
                        .with_item(item.clone())
                        .with_value(Value::Null),
                );
                return;
            }
        };

        // read-your-writes: the own buffer wins regardless of timestamps
        let value = if let Some(buffered) = txn.writes.get(item) {
            buffered.clone()
        } else {
            Self::visible_version(&self.chains, item, txn.start_ts)
        };

        self.log.emit(
            EventBody::op(t, OpKind::Read)
                .with_item(item.clone())
                .with_value(value),
        );
    }

    fn write(&mut self, t: TxnId, item: &Key, value: &Value) {
        // schedules may write without an explicit BEGIN; the transaction
        // is created lazily with the current step as its start timestamp
        let start_ts = self.log.current_step();
        let txn = self
            .transactions
            .entry(t)
            .or_insert_with(|| {
                tracing::debug!(txn = %t, start_ts, "transaction created on first write");
                TxnRecord::active(start_ts)
            });

        if !txn.is_active() {
            self.log.emit(
                EventBody::op(t, OpKind::Write)
                    .with_item(item.clone())
                    .with_value(value.clone())
                    .aborted(None),
            );
            return;
        }

        txn.writes.insert(item.clone(), value.clone());
        self.log.emit(
            EventBody::op(t, OpKind::Write)
                .with_item(item.clone())
                .with_value(value.clone()),
        );
    }

    fn commit(&mut self, t: TxnId) {
        let txn = match self.transactions.get_mut(&t) {
            Some(txn) if txn.is_active() => txn,
            _ => {
                self.log
                    .emit(EventBody::op(t, OpKind::Commit).aborted(Some("not active")));
                return;
            }
        };

        // first-committer-wins: another commit installed a newer version
        // of something we wrote since we started
        let conflict = txn.writes.keys().any(|key| {
            Self::latest_commit_ts(&self.chains, key) > txn.start_ts
        });

        if conflict {
            txn.status = TxnStatus::Aborted;
            tracing::debug!(txn = %t, "commit aborted on write-write conflict");
            self.log.emit(EventBody::Abort { t });
            self.log
                .emit(EventBody::op(t, OpKind::Commit).aborted(Some("conflict")));
            return;
        }

        // the commit timestamp is the step the COMMIT event is about to get
        let commit_ts = self.log.current_step();
        for (key, value) in &txn.writes {
            self.chains.entry(key.clone()).or_default().push(Version {
                value: value.clone(),
                commit_ts,
            });
        }
        txn.status = TxnStatus::Committed;
        self.log.emit(EventBody::op(t, OpKind::Commit));
    }

    /// Newest version of `key` visible at `start_ts`
    ///
    /// Scans the chain newest to oldest for the first version whose commit
    /// timestamp does not exceed `start_ts`. Seeded keys always hit at
    /// least the timestamp-0 version; a key outside the initial state that
    /// no one has committed yet reads as null.
    fn visible_version(chains: &BTreeMap<Key, Vec<Version>>, key: &Key, start_ts: u64) -> Value {
        chains
            .get(key)
            .and_then(|chain| {
                chain
                    .iter()
                    .rev()
                    .find(|version| version.commit_ts <= start_ts)
            })
            .map(|version| version.value.clone())
            .unwrap_or(Value::Null)
    }

    /// Commit timestamp of `key`'s newest version, 0 when no chain exists
    fn latest_commit_ts(chains: &BTreeMap<Key, Vec<Version>>, key: &Key) -> u64 {
        chains
            .get(key)
            .and_then(|chain| chain.last())
            .map_or(0, |version| version.commit_ts)
    }
}
