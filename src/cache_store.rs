use crate::cookie::{RequestCookies, ResponseCookies, SetCookieCommand};
use crate::{Cache, Result, SessionRecord, SessionStoreImplementation};
use async_trait::async_trait;
use log::debug;

/// A session store implementation keeping each session in a [`Cache`], keyed by its id.
///
/// Sessions are stored without expiry.
/// The session store ignores sessions that outlived their lifetime,
/// but they stay in the cache until the cache evicts them.
#[derive(Debug, Clone)]
pub struct CacheStore<C> {
    cache: C,
}

impl<C: Cache> CacheStore<C> {
    /// Create a new cache store on top of `cache`.
    pub fn new(cache: C) -> Self {
        Self { cache }
    }

    /// Returns a reference to the cache.
    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Consume the store and return its cache.
    pub fn into_inner(self) -> C {
        self.cache
    }

    async fn write_session(&self, id: &str, record: &SessionRecord) -> Result {
        let payload = serde_json::to_vec(record)?;
        self.cache.forever(id, payload).await?;
        Ok(())
    }
}

#[async_trait]
impl<C: Cache> SessionStoreImplementation for CacheStore<C> {
    async fn retrieve_session(
        &self,
        id: &str,
        _request: &dyn RequestCookies,
    ) -> Result<Option<SessionRecord>> {
        let Some(payload) = self.cache.get(id).await? else {
            return Ok(None);
        };

        match serde_json::from_slice(&payload) {
            Ok(record) => Ok(Some(record)),
            Err(error) => {
                debug!("Discarding unreadable session {id}: {error}");
                Ok(None)
            }
        }
    }

    async fn create_session(
        &mut self,
        id: &str,
        record: &SessionRecord,
        _cookie: &SetCookieCommand,
        _response: &mut dyn ResponseCookies,
    ) -> Result {
        self.write_session(id, record).await
    }
}
