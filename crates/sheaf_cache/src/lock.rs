//! Per-fingerprint mutual exclusion around compiles.
//!
//! [`InProcessLock`] serialises threads of one process. Deployments where
//! several processes share a cache directory can plug in their own
//! [`CompileLock`] (for example one built on lock files next to the
//! artifacts) through [`CompileCache::with_lock`](crate::CompileCache::with_lock).
//! Without one, such processes may compile the same fingerprint redundantly;
//! atomic renames still keep every visible artifact complete.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::fingerprint::Fingerprint;

/// Runs work exclusively per fingerprint.
pub trait CompileLock: Send + Sync {
    /// Runs `work` while no other caller holds the lock for `fingerprint`.
    fn run_exclusive(&self, fingerprint: &Fingerprint, work: &mut dyn FnMut());
}

/// A [`CompileLock`] covering the threads of the current process.
#[derive(Debug, Default)]
pub struct InProcessLock {
    slots: Mutex<HashMap<Fingerprint, Arc<Mutex<()>>>>,
}

impl InProcessLock {
    /// Creates a lock with no slots held.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fingerprints currently locked or waited on.
    pub fn active(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl CompileLock for InProcessLock {
    fn run_exclusive(&self, fingerprint: &Fingerprint, work: &mut dyn FnMut()) {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(*fingerprint).or_default())
        };
        let release = SlotRelease {
            owner: self,
            fingerprint: *fingerprint,
            slot,
        };

        let _guard = release.slot.lock().unwrap_or_else(PoisonError::into_inner);
        work();
    }
}

/// Drops a fingerprint's slot from the map once its last user is done, even
/// when the work panicked.
struct SlotRelease<'a> {
    owner: &'a InProcessLock,
    fingerprint: Fingerprint,
    slot: Arc<Mutex<()>>,
}

impl Drop for SlotRelease<'_> {
    fn drop(&mut self) {
        let mut slots = self
            .owner
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Only the map and this caller still hold the slot: nobody is waiting.
        if Arc::strong_count(&self.slot) == 2 {
            slots.remove(&self.fingerprint);
        }
    }
}
