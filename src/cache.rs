use crate::file_cache::FileCache;
use async_trait::async_trait;
use std::fmt::Debug;

/// A key/value cache service, used by [`CacheStore`](crate::CacheStore) as session storage.
///
/// The cache does not need to expire entries.
/// The session store checks expiry itself, based on the last activity of a session.
#[async_trait]
pub trait Cache: Debug + Send + Sync {
    /// Returns the bytes stored under `key`, if any.
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;

    /// Store `value` under `key` without expiry, replacing any previous value.
    async fn forever(&self, key: &str, value: Vec<u8>) -> anyhow::Result<()>;

    /// Returns this cache as a [`FileCache`] if it is one.
    fn as_file_cache(&self) -> Option<&FileCache> {
        None
    }
}
