use crate::cookie::{RequestCookies, ResponseCookies, SetCookieCommand};
use crate::{
    Cache, CacheStore, Error, Result, SessionRecord, SessionStoreImplementation, Sweeper,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{trace, warn};
use std::io::ErrorKind;

/// A session store implementation keeping each session in its own file, through a [`FileCache`](crate::FileCache).
///
/// It works like a [`CacheStore`], and can additionally sweep the cache directory for expired sessions.
#[derive(Debug)]
pub struct FileStore<C> {
    inner: CacheStore<C>,
}

impl<C: Cache> FileStore<C> {
    /// Create a new file store on top of `cache`.
    ///
    /// Fails with [`Error::FileCacheRequired`] if `cache` is not a [`FileCache`](crate::FileCache).
    pub fn new(cache: C) -> Result<Self> {
        if cache.as_file_cache().is_none() {
            return Err(Error::FileCacheRequired);
        }

        Ok(Self {
            inner: CacheStore::new(cache),
        })
    }

    /// Returns a reference to the cache.
    pub fn cache(&self) -> &C {
        self.inner.cache()
    }
}

#[async_trait]
impl<C: Cache> SessionStoreImplementation for FileStore<C> {
    async fn retrieve_session(
        &self,
        id: &str,
        request: &dyn RequestCookies,
    ) -> Result<Option<SessionRecord>> {
        self.inner.retrieve_session(id, request).await
    }

    async fn create_session(
        &mut self,
        id: &str,
        record: &SessionRecord,
        cookie: &SetCookieCommand,
        response: &mut dyn ResponseCookies,
    ) -> Result {
        self.inner.create_session(id, record, cookie, response).await
    }

    async fn update_session(
        &mut self,
        id: &str,
        record: &SessionRecord,
        cookie: &SetCookieCommand,
        response: &mut dyn ResponseCookies,
    ) -> Result {
        self.inner.update_session(id, record, cookie, response).await
    }

    fn sweeper(&mut self) -> Option<&mut dyn Sweeper> {
        Some(self)
    }
}

#[async_trait]
impl<C: Cache> Sweeper for FileStore<C> {
    /// Delete every session file last modified before `expiration`.
    ///
    /// Files that vanish or cannot be deleted are skipped, so concurrent requests never fail the sweep.
    async fn sweep(&mut self, expiration: DateTime<Utc>) -> Result {
        let file_cache = self
            .inner
            .cache()
            .as_file_cache()
            .ok_or(Error::FileCacheRequired)?;
        let files = file_cache.filesystem();

        let mut deleted = 0usize;
        for file in files.files(file_cache.directory()).await? {
            let last_modified = match files.last_modified(&file).await {
                Ok(last_modified) => last_modified,
                Err(error) if error.kind() == ErrorKind::NotFound => continue,
                Err(error) => {
                    warn!("Skipping session file {}: {error}", file.display());
                    continue;
                }
            };

            if last_modified < expiration {
                match files.delete(&file).await {
                    Ok(()) => deleted += 1,
                    Err(error) if error.kind() == ErrorKind::NotFound => {}
                    Err(error) => {
                        warn!("Failed to delete session file {}: {error}", file.display())
                    }
                }
            }
        }

        trace!("Deleted {deleted} expired session files");
        Ok(())
    }
}
