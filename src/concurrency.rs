//! Per-user write serialization
//!
//! Reconciliation and tree mutations assume a single writer per user tree.
//! Backends take the user's write lock around every such operation; requests
//! for different users proceed concurrently.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-user lock manager
pub struct UserLockManager {
    locks: Arc<RwLock<HashMap<String, Arc<RwLock<()>>>>>,
}

impl UserLockManager {
    pub fn new() -> Self {
        Self {
            locks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Lock guarding the tree of `uid`, created on first use
    pub fn get_lock(&self, uid: &str) -> Arc<RwLock<()>> {
        {
            let map = self.locks.read();
            if let Some(lock) = map.get(uid) {
                return lock.clone();
            }
        }

        let mut map = self.locks.write();
        // Another thread may have created it between the two lookups.
        map.entry(uid.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }
}

impl Default for UserLockManager {
    fn default() -> Self {
        Self::new()
    }
}
