//! Per-key serialisation
//!
//! Check-then-create is only idempotent if no other task creates the same
//! entity in between. [`KeyLocks`] hands out one async mutex per
//! (kind, name, scope); holders of distinct keys never wait on each other.
//! A key's entry is dropped again once its last guard is released.

use dashmap::DashMap;
use mig_model::{EntityKind, Scope};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockKey = (EntityKind, String, Scope);

/// Registry of per-key mutexes
#[derive(Debug, Default)]
pub struct KeyLocks {
    locks: DashMap<LockKey, Arc<Mutex<()>>>,
}

impl KeyLocks {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive use of a key
    ///
    /// The guard releases the key when dropped.
    pub async fn lock(&self, kind: EntityKind, name: &str, scope: Scope) -> KeyGuard<'_> {
        let key = (kind, name.trim().to_string(), scope);
        let mutex = self.locks.entry(key.clone()).or_default().clone();
        let guard = mutex.lock_owned().await;
        KeyGuard {
            locks: self,
            key,
            guard: Some(guard),
        }
    }

    /// Number of keys currently locked or waited on
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no key is locked or waited on
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Exclusive use of one key; releases and prunes on drop
#[must_use]
pub struct KeyGuard<'a> {
    locks: &'a KeyLocks,
    key: LockKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Waiters hold their own clone, so a count of one means only the map is left
        self.locks
            .locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

impl fmt::Debug for KeyGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyGuard")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
