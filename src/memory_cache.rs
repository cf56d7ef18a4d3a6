use crate::Cache;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// # in-memory cache
/// Because there is no external
/// persistence, this cache is ephemeral and will be cleared
/// on server restart.
///
/// Clones share the same entries.
///
/// # ***READ THIS BEFORE USING IN A PRODUCTION DEPLOYMENT***
///
/// Storing sessions only in memory brings the following problems:
///
/// 1. All sessions must fit in available memory (important for high load services)
/// 2. Entries are never removed, as this cache does not support sweeping.
///    If the service runs long enough, this might result in OOM
/// 3. All sessions will be lost on shutdown
/// 4. If the service is clustered particular session will be stored only on a single instance.
///    This might be solved by using load balancers with sticky sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.entries().get(key).cloned())
    }

    async fn forever(&self, key: &str, value: Vec<u8>) -> anyhow::Result<()> {
        self.entries().insert(key.to_owned(), value);
        Ok(())
    }
}

impl MemoryCache {
    /// Create a new empty memory cache.
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns the number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries are only ever replaced whole, so a panic while holding the lock cannot corrupt them.
    fn entries(&self) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
