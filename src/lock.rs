//! Lock module provides hierarchical locking over path prefixes.
//!
//! Every public tree operation locks the full prefix chain of its path,
//! root-to-leaf, before touching the backend: to operate on `/a/b/c` it
//! locks `/a`, then `/a/b`, then `/a/b/c`. That fixed global acquisition
//! order is the sole deadlock-avoidance mechanism — two operations on
//! overlapping paths can never take their shared locks in conflicting
//! orders. Reads take shared guards and run concurrently; mutations take
//! upgradable guards and escalate to exclusive only at the depths whose
//! records they actually write.
//!
//! Locks are registered per prefix (structural equality on the segment
//! sequence) in a table that lives as long as the store. Guards are owned
//! (`arc_lock`), so a chain releases every lock on drop, on every exit
//! path.

use crate::path::TreePath;
use parking_lot::lock_api::{
    ArcRwLockReadGuard, ArcRwLockUpgradableReadGuard, ArcRwLockWriteGuard,
};
use parking_lot::{Mutex, RawRwLock, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

type ReadGuard = ArcRwLockReadGuard<RawRwLock, ()>;
type UpgradableGuard = ArcRwLockUpgradableReadGuard<RawRwLock, ()>;
type WriteGuard = ArcRwLockWriteGuard<RawRwLock, ()>;

/// Registry mapping each path prefix to its reader/writer lock.
///
/// Entries are created on demand and live for the life of the table.
#[derive(Default)]
pub struct LockTable {
    locks: Mutex<HashMap<Vec<String>, Arc<RwLock<()>>>>,
}

impl LockTable {
    /// Creates an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock registered for one prefix, created if absent.
    ///
    /// The table mutex is released before the returned lock is acquired,
    /// so a contended prefix never blocks lookups of other prefixes.
    fn lock_for(&self, prefix: &[String]) -> Arc<RwLock<()>> {
        let mut locks = self.locks.lock();
        if let Some(lock) = locks.get(prefix) {
            return Arc::clone(lock);
        }
        let lock = Arc::new(RwLock::new(()));
        locks.insert(prefix.to_vec(), Arc::clone(&lock));
        lock
    }

    /// Acquires shared locks on every prefix of `path`, root-to-leaf.
    pub fn lock_read(&self, path: &TreePath) -> ReadChain {
        let mut guards = Vec::with_capacity(path.len());
        for depth in 1..=path.len() {
            let lock = self.lock_for(&path.segments()[..depth]);
            guards.push(lock.read_arc());
        }
        ReadChain { _guards: guards }
    }

    /// Acquires upgradable locks on every prefix of `path`, root-to-leaf.
    ///
    /// Upgradable guards admit concurrent readers but exclude each other,
    /// so two mutations sharing a prefix serialize at that prefix.
    pub fn lock_upgradable(&self, path: &TreePath) -> WriteChain {
        let mut guards = Vec::with_capacity(path.len());
        for depth in 1..=path.len() {
            let lock = self.lock_for(&path.segments()[..depth]);
            guards.push(PrefixGuard::Upgradable(lock.upgradable_read_arc()));
        }
        WriteChain { guards }
    }
}

/// Shared guards over a full prefix chain. Dropping releases all of them.
pub struct ReadChain {
    _guards: Vec<ReadGuard>,
}

enum PrefixGuard {
    Upgradable(UpgradableGuard),
    Write(WriteGuard),
    // Transient state while a guard is moved through an upgrade.
    Moving,
}

/// Upgradable guards over a full prefix chain, escalating per depth.
pub struct WriteChain {
    guards: Vec<PrefixGuard>,
}

impl WriteChain {
    /// Escalates the guard at `depth` (1-based) to an exclusive lock.
    ///
    /// Idempotent; the guard stays exclusive for the rest of the chain's
    /// lifetime. Callers escalate exactly the depths whose records they
    /// write, keeping the exclusivity window to those records.
    ///
    /// Escalations must follow the same root-to-leaf order as acquisition:
    /// upgrading a shallow prefix after a deeper one can wait on a reader
    /// that is itself queued behind the deeper write lock. Operations
    /// therefore plan their writes first and escalate ascending.
    ///
    /// # Panics
    /// Panics if `depth` is zero or deeper than the locked path.
    pub fn escalate(&mut self, depth: usize) {
        assert!(depth >= 1 && depth <= self.guards.len());
        let slot = &mut self.guards[depth - 1];
        if matches!(slot, PrefixGuard::Upgradable(_)) {
            match std::mem::replace(slot, PrefixGuard::Moving) {
                PrefixGuard::Upgradable(guard) => {
                    *slot = PrefixGuard::Write(ArcRwLockUpgradableReadGuard::upgrade(guard));
                }
                other => *slot = other,
            }
        }
    }
}
