//! Per-key writer locks
//!
//! Each cache key gets one lazily created mutex that serializes writers for
//! that key. Handles are never removed: one small allocation per distinct key
//! seen during the process lifetime.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use super::key::CacheKey;

/// Registry of per-key locks owned by a single cache store
#[derive(Debug, Default)]
pub struct KeyLocks {
    locks: Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the lock handle for a key, creating it on first use
    ///
    /// The registry guard covers the whole lookup-or-create step, so two
    /// threads racing on a new key always receive the same handle.
    pub fn handle(&self, key: &CacheKey) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(locks.entry(key.clone()).or_default())
    }

    /// Number of keys that have ever been locked
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
