//! Process-wide registry of conversation managers.
//!
//! Exactly one manager exists per `(agent_key, session_id)` while it is in
//! use: managers carry in-process state (running summary, counters) that
//! every caller must observe consistently. The registry is an explicit value
//! handed to call sites, never a global.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lru::LruCache;

use parley_types::config::GlobalConfig;

type RegistryKey = (String, String);

/// Keyed, LRU-bounded map from thread identity to a shared manager.
pub struct ManagerRegistry<M> {
    entries: Mutex<LruCache<RegistryKey, Arc<M>>>,
    capacity: Option<NonZeroUsize>,
}

impl<M> ManagerRegistry<M> {
    /// A registry that never evicts.
    pub fn unbounded() -> Self {
        Self {
            entries: Mutex::new(LruCache::unbounded()),
            capacity: None,
        }
    }

    /// A registry keeping at most `capacity` managers (`0` = unbounded).
    ///
    /// Only idle managers are evicted: one still held by a caller stays, and
    /// the registry temporarily exceeds its capacity instead.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(LruCache::unbounded()),
            capacity: NonZeroUsize::new(capacity),
        }
    }

    /// A registry bounded by `registry_capacity` from the global config.
    pub fn from_config(config: &GlobalConfig) -> Self {
        Self::with_capacity(config.registry_capacity)
    }

    /// The manager for `(agent_key, session_id)`, built by `factory` on first access.
    ///
    /// The factory runs under the registry lock, so concurrent first accesses
    /// construct exactly one instance. It must not call back into the registry.
    pub fn get_or_create<F>(&self, agent_key: &str, session_id: &str, factory: F) -> Arc<M>
    where
        F: FnOnce() -> M,
    {
        let key = (agent_key.to_string(), session_id.to_string());
        let mut entries = self.lock();

        if let Some(existing) = entries.get(&key) {
            return Arc::clone(existing);
        }

        let manager = Arc::new(factory());
        entries.put(key, Arc::clone(&manager));
        tracing::debug!(agent_key, session_id, live = entries.len(), "manager created");

        if let Some(capacity) = self.capacity {
            evict_idle(&mut entries, capacity.get());
        }
        manager
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Whether a manager is registered for the key. Does not touch recency.
    pub fn contains(&self, agent_key: &str, session_id: &str) -> bool {
        self.lock()
            .contains(&(agent_key.to_string(), session_id.to_string()))
    }

    // The map only holds `Arc`s, so it is consistent even if a factory panicked.
    fn lock(&self) -> MutexGuard<'_, LruCache<RegistryKey, Arc<M>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Drop least recently used managers that nobody else holds until the
/// registry fits `capacity` or only held managers remain.
fn evict_idle<M>(entries: &mut LruCache<RegistryKey, Arc<M>>, capacity: usize) {
    while entries.len() > capacity {
        let idle = entries
            .iter()
            .rev()
            .find(|(_, manager)| Arc::strong_count(manager) == 1)
            .map(|(key, _)| key.clone());

        let Some(key) = idle else {
            tracing::debug!(live = entries.len(), capacity, "all managers in use, over capacity");
            return;
        };
        entries.pop(&key);
        tracing::debug!(agent_key = %key.0, session_id = %key.1, "evicted idle manager");
    }
}
