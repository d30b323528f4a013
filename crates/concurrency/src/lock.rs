//! 2PL lock table
//!
//! Book-keeping for strict two-phase locking: which transaction holds
//! which mode on which key, the inverse held-locks index used at release,
//! and the FIFO wait queue parked requests sit in until a release on their
//! key re-evaluates them.
//!
//! This is a pure data structure. Deciding *when* to check, grant, or
//! release — and emitting the corresponding trace events — belongs to the
//! executor in `two_phase`.
//!
//! Invariants maintained here:
//! - A key has either any number of SHARED holders or exactly one
//!   EXCLUSIVE holder, never both.
//! - A transaction holds at most one mode per key; an S→X upgrade replaces
//!   the entry in place, and an EXCLUSIVE holder never downgrades.
//! - The held-locks index lists keys in acquisition order, which fixes the
//!   UNLOCK order at release.

use lockstep_core::{Key, LockMode, TxnId, Value};
use std::collections::{HashMap, VecDeque};

/// Outcome of a compatibility check for a lock request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockDecision {
    /// The request is compatible with the current holders
    Granted,
    /// The request must wait; carries the trace-facing reason
    Wait {
        /// Human-readable reason, e.g. `waiting for X(A)`
        why: String,
    },
}

/// The deferred effect of a parked request, performed on wakeup
#[derive(Debug, Clone, PartialEq)]
pub enum DeferredOp {
    /// A read; observes the stored value at wakeup time
    Read,
    /// A write; applies `value` to the store at wakeup time
    Write {
        /// Value the blocked WRITE carried
        value: Value,
    },
}

/// One entry in a key's wait queue
#[derive(Debug, Clone, PartialEq)]
pub struct WaitingOp {
    /// Transaction that was blocked
    pub txn: TxnId,
    /// Mode it requested
    pub mode: LockMode,
    /// What to do once granted
    pub deferred: DeferredOp,
}

/// Lock table for one 2PL replay
#[derive(Debug, Default)]
pub struct LockTable {
    /// key → current holders; multiple SHARED or a single EXCLUSIVE
    holders: HashMap<Key, Vec<(TxnId, LockMode)>>,
    /// txn → (key, mode) held, in acquisition order
    held: HashMap<TxnId, Vec<(Key, LockMode)>>,
    /// key → parked requests, FIFO
    wait_queues: HashMap<Key, VecDeque<WaitingOp>>,
}

impl LockTable {
    /// Create an empty lock table
    pub fn new() -> Self {
        Self::default()
    }

    /// Compatibility rule for a request `(txn, mode)` on `key`
    ///
    /// Grants when: the key has no holders; `txn` already holds `mode`
    /// (idempotent); `txn` upgrades S→X as the sole holder; `txn` already
    /// holds EXCLUSIVE; or `txn` holds nothing and the holders are
    /// compatible (SHARED against co-readers, EXCLUSIVE against nobody).
    /// Every other combination waits.
    pub fn check(&self, txn: TxnId, key: &Key, mode: LockMode) -> LockDecision {
        let holders = match self.holders.get(key) {
            Some(h) if !h.is_empty() => h,
            _ => return LockDecision::Granted,
        };

        let wait = || LockDecision::Wait {
            why: format!("waiting for X({})", key),
        };

        if let Some((_, held_mode)) = holders.iter().find(|(owner, _)| *owner == txn) {
            if *held_mode == mode {
                return LockDecision::Granted;
            }
            if *held_mode == LockMode::Shared && mode == LockMode::Exclusive {
                // upgrade S → X: only when txn is the sole holder
                if holders.iter().any(|(owner, _)| *owner != txn) {
                    return wait();
                }
                return LockDecision::Granted;
            }
            // holding EXCLUSIVE already covers any request
            return LockDecision::Granted;
        }

        match mode {
            LockMode::Shared => {
                if holders
                    .iter()
                    .any(|(_, held)| *held == LockMode::Exclusive)
                {
                    wait()
                } else {
                    LockDecision::Granted
                }
            }
            LockMode::Exclusive => wait(),
        }
    }

    /// Record a granted request and return the mode now held
    ///
    /// Must only be called after `check` returned `Granted`. An existing
    /// entry is modified only for a genuine S→X upgrade; a redundant
    /// request while holding EXCLUSIVE keeps EXCLUSIVE, so the returned
    /// mode is what LOCK events should carry.
    pub fn grant(&mut self, txn: TxnId, key: &Key, mode: LockMode) -> LockMode {
        let holders = self.holders.entry(key.clone()).or_default();

        if let Some(slot) = holders.iter_mut().find(|(owner, _)| *owner == txn) {
            if slot.1 == LockMode::Shared && mode == LockMode::Exclusive {
                slot.1 = LockMode::Exclusive;
                if let Some(held) = self.held.get_mut(&txn) {
                    if let Some(entry) = held.iter_mut().find(|(k, _)| k == key) {
                        entry.1 = LockMode::Exclusive;
                    }
                }
                tracing::debug!(txn = %txn, key = %key, "upgraded lock S -> X");
            }
            return slot.1;
        }

        holders.push((txn, mode));
        self.held
            .entry(txn)
            .or_default()
            .push((key.clone(), mode));
        tracing::debug!(txn = %txn, key = %key, mode = %mode, "granted lock");
        mode
    }

    /// Drop every lock held by `txn`, returning `(key, mode)` pairs in
    /// acquisition order
    ///
    /// The caller emits UNLOCK events and re-evaluates each key's wait
    /// queue.
    pub fn release_all(&mut self, txn: TxnId) -> Vec<(Key, LockMode)> {
        let held = self.held.remove(&txn).unwrap_or_default();
        for (key, _) in &held {
            if let Some(holders) = self.holders.get_mut(key) {
                holders.retain(|(owner, _)| *owner != txn);
                if holders.is_empty() {
                    self.holders.remove(key);
                }
            }
        }
        held
    }

    /// Park a blocked request at the back of `key`'s wait queue
    pub fn enqueue(&mut self, key: &Key, waiting: WaitingOp) {
        self.wait_queues
            .entry(key.clone())
            .or_default()
            .push_back(waiting);
    }

    /// Drain `key`'s wait queue for a grant scan
    ///
    /// The executor walks the drained queue front-to-back, granting what
    /// it can, and hands the still-blocked remainder to `restore_queue`.
    /// Draining and rebuilding avoids removing entries from a queue while
    /// scanning it.
    pub fn take_queue(&mut self, key: &Key) -> VecDeque<WaitingOp> {
        self.wait_queues.remove(key).unwrap_or_default()
    }

    /// Put the still-blocked remainder of a scan back, preserving order
    pub fn restore_queue(&mut self, key: &Key, remainder: VecDeque<WaitingOp>) {
        if !remainder.is_empty() {
            self.wait_queues.insert(key.clone(), remainder);
        }
    }

    /// Current holders of `key`, in acquisition order
    pub fn holders(&self, key: &Key) -> &[(TxnId, LockMode)] {
        self.holders.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of requests parked on `key`
    pub fn waiting_on(&self, key: &Key) -> usize {
        self.wait_queues.get(key).map_or(0, VecDeque::len)
    }

    /// Total parked requests across all keys
    ///
    /// Nonzero after a full replay means the schedule ended with requests
    /// blocked forever (e.g. a deadlock cycle).
    pub fn total_waiting(&self) -> usize {
        self.wait_queues.values().map(VecDeque::len).sum()
    }
}
