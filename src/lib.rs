//! HTTP sessions with flash data.
//!
//! This crate loads a session at the start of a request, offers a key/value interface to it,
//! and persists it through a pluggable backend at the end of the request, setting the session cookie.
//!
//! # Lifecycle
//!
//! [`SessionStore::start`] reads the session cookie of a request and retrieves the session it identifies.
//! Missing, unreadable and expired sessions are replaced by a fresh session with a new random id.
//! Handlers then read and write the returned [`Session`].
//! [`SessionStore::finish`] consumes the session, ages its flash data, creates or updates it in the backend,
//! and attaches the session cookie to the response.
//!
//! # Flash data
//!
//! Values written with [`Session::flash`] are visible for the rest of the current request
//! and during the next request, then they are gone.
//! [`Session::reflash`] and [`Session::keep`] extend them by one more request.
//!
//! # Backends
//!
//! Backends implement [`SessionStoreImplementation`]:
//!
//! * [`CacheStore`] keeps sessions in any [`Cache`], such as a [`MemoryCache`].
//! * [`CookieStore`] keeps sessions on the client, in a plain or encrypted payload cookie.
//! * [`FileStore`] keeps sessions in a [`FileCache`], and is a [`Sweeper`]:
//!   on a configurable share of requests it deletes the files of expired sessions.
//!
//! # Example
//!
//! ```
//! use flash_session::{CacheStore, MemoryCache, SessionStore, SetCookieCommand};
//! use serde_json::json;
//! use std::collections::HashMap;
//!
//! # fn main() -> flash_session::Result {
//! # async_std::task::block_on(async {
//! let mut store = SessionStore::new(CacheStore::new(MemoryCache::new()));
//!
//! // The first request carries no session cookie, so a fresh session is started.
//! let request: HashMap<String, String> = HashMap::new();
//! let mut session = store.start(&request).await?;
//! assert!(!session.exists());
//! session.put("user_id", 42);
//! session.flash("status", "Welcome!");
//!
//! let mut response: Vec<SetCookieCommand> = Vec::new();
//! let cookie = store.finish(session, &mut response).await?;
//! assert_eq!(cookie.name, "illuminate_session");
//!
//! // The next request sends the cookie back and gets the same session.
//! let request = HashMap::from([(cookie.name, cookie.value)]);
//! let session = store.start(&request).await?;
//! assert!(session.exists());
//! assert_eq!(session.get("user_id"), Some(&json!(42)));
//! assert_eq!(session.get("status"), Some(&json!("Welcome!")));
//! #
//! # Ok(()) }) }
//! ```

#![forbid(unsafe_code)]
#![deny(
    future_incompatible,
    missing_debug_implementations,
    nonstandard_style,
    missing_docs,
    unreachable_pub,
    missing_copy_implementations,
    unused_qualifications
)]

mod cache;
mod cache_store;
mod clock;
mod config;
mod cookie;
mod cookie_store;
mod encrypter;
mod error;
mod file_cache;
mod file_store;
mod memory_cache;
mod session;
mod session_store;

pub use error::Error;
/// A result with this crate's [`Error`] and default return type of ()
pub type Result<T = ()> = std::result::Result<T, Error>;

pub use cache::Cache;
pub use cache_store::CacheStore;
pub use clock::{Clock, MockClock, SystemClock};
pub use config::SessionConfig;
pub use cookie::{CookieConfig, RequestCookies, ResponseCookies, SetCookieCommand};
pub use cookie_store::{CookieStore, DEFAULT_PAYLOAD_COOKIE_NAME};
pub use encrypter::{Encrypter, NoEncryption};
pub use file_cache::{FileCache, Filesystem, LocalFilesystem};
pub use file_store::FileStore;
pub use memory_cache::MemoryCache;
pub use session::{FlashData, Session, SessionData, SessionRecord};
pub use session_store::{
    DebugSessionIdGenerator, DefaultSessionIdGenerator, SessionIdGenerator, SessionStore,
    SessionStoreImplementation, Sweeper, DEFAULT_LIFETIME_MINUTES, SESSION_ID_LENGTH,
};
