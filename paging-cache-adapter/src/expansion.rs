use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::ItemKey;

/// The set of expanded item keys, shared between a [`crate::TreeDataSource`] and the
/// `is_expanded` predicate it installs on its controller.
pub struct ExpandedKeys<K> {
    keys: Arc<RwLock<HashSet<K>>>,
}

impl<K> Clone for ExpandedKeys<K> {
    fn clone(&self) -> Self {
        Self {
            keys: Arc::clone(&self.keys),
        }
    }
}

impl<K> Default for ExpandedKeys<K> {
    fn default() -> Self {
        Self {
            keys: Arc::new(RwLock::new(HashSet::new())),
        }
    }
}

impl<K: ItemKey> ExpandedKeys<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.keys.read().contains(key)
    }

    /// Returns `true` if the key was not expanded before.
    pub fn insert(&self, key: K) -> bool {
        self.keys.write().insert(key)
    }

    /// Returns `true` if the key was expanded before.
    pub fn remove(&self, key: &K) -> bool {
        self.keys.write().remove(key)
    }

    pub fn replace(&self, keys: impl IntoIterator<Item = K>) {
        let next: HashSet<K> = keys.into_iter().collect();
        *self.keys.write() = next;
    }

    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }

    /// Copies the current keys out, in no particular order.
    pub fn snapshot(&self) -> Vec<K> {
        self.keys.read().iter().cloned().collect()
    }
}

impl<K: core::fmt::Debug> core::fmt::Debug for ExpandedKeys<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.keys.read().iter()).finish()
    }
}
