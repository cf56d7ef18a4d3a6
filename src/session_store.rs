use crate::clock::{Clock, SystemClock};
use crate::cookie::{CookieConfig, RequestCookies, ResponseCookies, SetCookieCommand};
use crate::session::{Session, SessionRecord};
use crate::{Error, Result, SessionConfig};
use async_trait::async_trait;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use log::{debug, trace, warn};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::fmt::{Debug, Formatter};

mod id_generator;

pub use id_generator::{
    DebugSessionIdGenerator, DefaultSessionIdGenerator, SessionIdGenerator, SESSION_ID_LENGTH,
};

/// The session lifetime used unless configured otherwise, in minutes.
pub const DEFAULT_LIFETIME_MINUTES: u32 = 120;

/// A session store.
///
/// This is the user-facing interface of the session store.
/// It drives the lifecycle of a session over one request:
/// [`start`](Self::start) loads the session identified by the request's session cookie, or creates a fresh one,
/// and [`finish`](Self::finish) persists it through the [`SessionStoreImplementation`] and sets the session cookie.
///
/// Time and randomness are injected, see [`with_clock`](Self::with_clock) and [`with_lottery_rng`](Self::with_lottery_rng).
pub struct SessionStore<Implementation, Generator = DefaultSessionIdGenerator> {
    implementation: Implementation,
    id_generator: Generator,
    clock: Box<dyn Clock>,
    lottery_rng: Box<dyn RngCore + Send>,
    lifetime_minutes: u32,
    sweep_odds: SweepOdds,
    cookie: CookieConfig,
}

/// Sweep `chance` out of `out_of` finished sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SweepOdds {
    chance: u32,
    out_of: u32,
}

impl SweepOdds {
    fn new(chance: u32, out_of: u32) -> Result<Self> {
        if out_of == 0 || chance > out_of {
            Err(Error::InvalidSweepOdds { chance, out_of })
        } else {
            Ok(Self { chance, out_of })
        }
    }

    fn draw(&self, rng: &mut impl Rng) -> bool {
        rng.gen_range(1..=self.out_of) <= self.chance
    }
}

impl Default for SweepOdds {
    fn default() -> Self {
        Self {
            chance: 2,
            out_of: 100,
        }
    }
}

impl<Implementation: SessionStoreImplementation> SessionStore<Implementation> {
    /// Create a new session store with the given implementation and the default session id generator.
    pub fn new(implementation: Implementation) -> Self {
        Self::new_with_id_generator(implementation, DefaultSessionIdGenerator::default())
    }
}

impl<Implementation: SessionStoreImplementation, Generator: SessionIdGenerator>
    SessionStore<Implementation, Generator>
{
    /// Create a new session store with the given implementation and session id generator.
    pub fn new_with_id_generator(implementation: Implementation, id_generator: Generator) -> Self {
        Self {
            implementation,
            id_generator,
            clock: Box::new(SystemClock),
            lottery_rng: Box::new(StdRng::from_entropy()),
            lifetime_minutes: DEFAULT_LIFETIME_MINUTES,
            sweep_odds: SweepOdds::default(),
            cookie: CookieConfig::default(),
        }
    }

    /// Use `clock` instead of the system clock.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Use `rng` to draw the sweep lottery.
    pub fn with_lottery_rng(mut self, rng: impl RngCore + Send + 'static) -> Self {
        self.lottery_rng = Box::new(rng);
        self
    }

    /// Load the session of a request.
    ///
    /// If the request carries a session cookie, the session it identifies is retrieved from the implementation.
    /// If there is no such session, or it is expired, a fresh session with a new id is returned instead.
    /// Nothing is persisted until [`finish`](Self::finish) is called.
    ///
    /// Errors are only returned if the implementation fails to reach its storage.
    /// Unreadable sessions are treated as missing.
    pub async fn start(&mut self, request: &dyn RequestCookies) -> Result<Session> {
        let record = match request.get_cookie(&self.cookie.name) {
            Some(id) => self.implementation.retrieve_session(&id, request).await?,
            None => None,
        };

        match record {
            Some(record) if !self.is_expired(&record) => {
                trace!("Loaded session {}", record.id());
                Ok(Session::new_from_session_store(record))
            }
            record => {
                if let Some(record) = record {
                    debug!("Session {} is expired, starting a fresh session", record.id());
                }
                Ok(Session::new_fresh(SessionRecord::new(
                    self.id_generator.generate_id(),
                )))
            }
        }
    }

    /// Returns true if `record` must not be used anymore.
    ///
    /// A record is expired if more than the session lifetime passed since its last activity.
    /// Records that were never persisted, or whose last activity lies in the future, are expired as well.
    pub fn is_expired(&self, record: &SessionRecord) -> bool {
        let Some(last_activity) = record.last_activity() else {
            return true;
        };
        let elapsed = self.clock.now().timestamp() - last_activity.timestamp();
        elapsed < 0 || elapsed > self.lifetime().num_seconds()
    }

    /// Assign a new id to `session`, returning it.
    /// Finishing the session then creates it under the new id, instead of updating the old one.
    ///
    /// Call this whenever the privileges of a session change, e.g. on login, to prevent session fixation.
    pub fn regenerate_session<'session>(
        &mut self,
        session: &'session mut Session,
    ) -> &'session str {
        session.regenerate(self.id_generator.generate_id());
        session.id()
    }

    /// Persist the session of a request and set the session cookie on the response.
    ///
    /// This stamps the last activity, ages the flash data, creates or updates the session in the implementation,
    /// possibly sweeps expired sessions, and finally attaches the session cookie to `response`.
    /// The attached cookie is also returned.
    ///
    /// Sweeping never fails the request: its errors are logged and ignored.
    pub async fn finish(
        &mut self,
        mut session: Session,
        response: &mut dyn ResponseCookies,
    ) -> Result<SetCookieCommand> {
        let now = self.clock.now();
        session.touch(now);
        session.age_flash_data();

        let cookie = self
            .cookie
            .to_command(session.id().to_owned(), now + self.lifetime());
        if session.exists() {
            trace!("Updating session {}", session.id());
            self.implementation
                .update_session(session.id(), session.record(), &cookie, response)
                .await?;
        } else {
            trace!("Creating session {}", session.id());
            self.implementation
                .create_session(session.id(), session.record(), &cookie, response)
                .await?;
        }

        // Expiry is decided in whole seconds, so the cutoff must not keep sub-second precision.
        self.run_sweep_lottery((now - self.lifetime()).trunc_subsecs(0)).await;

        response.attach_cookie(cookie.clone());
        Ok(cookie)
    }

    async fn run_sweep_lottery(&mut self, expiration: DateTime<Utc>) {
        let Some(sweeper) = self.implementation.sweeper() else {
            return;
        };
        if !self.sweep_odds.draw(&mut self.lottery_rng) {
            return;
        }

        trace!("Sweeping sessions inactive since {expiration}");
        if let Err(error) = sweeper.sweep(expiration).await {
            warn!("Sweeping expired sessions failed: {error}");
        }
    }

    /// Apply the lifetime, sweep lottery and cookie settings of `config`.
    pub fn apply_config(&mut self, config: &SessionConfig) -> Result {
        let [chance, out_of] = config.lottery;
        self.set_sweep_odds(chance, out_of)?;
        self.set_lifetime_minutes(config.lifetime);
        self.set_cookie_config(config.cookie.clone());
        Ok(())
    }
}

impl<Implementation, Generator> SessionStore<Implementation, Generator> {
    /// The session lifetime.
    pub fn lifetime(&self) -> Duration {
        Duration::minutes(i64::from(self.lifetime_minutes))
    }

    /// The session lifetime in minutes.
    pub fn lifetime_minutes(&self) -> u32 {
        self.lifetime_minutes
    }

    /// Set the session lifetime in minutes.
    pub fn set_lifetime_minutes(&mut self, minutes: u32) {
        self.lifetime_minutes = minutes;
    }

    /// The sweep lottery odds as `(chance, out_of)`.
    pub fn sweep_odds(&self) -> (u32, u32) {
        (self.sweep_odds.chance, self.sweep_odds.out_of)
    }

    /// Sweep expired sessions on `chance` out of `out_of` finished sessions,
    /// if the implementation is a [`Sweeper`].
    ///
    /// Fails if `out_of` is zero or smaller than `chance`.
    pub fn set_sweep_odds(&mut self, chance: u32, out_of: u32) -> Result {
        self.sweep_odds = SweepOdds::new(chance, out_of)?;
        Ok(())
    }

    /// The session cookie attributes.
    pub fn cookie_config(&self) -> &CookieConfig {
        &self.cookie
    }

    /// Replace all session cookie attributes.
    pub fn set_cookie_config(&mut self, cookie: CookieConfig) {
        self.cookie = cookie;
    }

    /// Set the name of the session cookie.
    pub fn set_cookie_name(&mut self, name: impl Into<String>) {
        self.cookie.name = name.into();
    }

    /// Set the path attribute of the session cookie.
    pub fn set_cookie_path(&mut self, path: impl Into<String>) {
        self.cookie.path = path.into();
    }

    /// Set the domain attribute of the session cookie.
    pub fn set_cookie_domain(&mut self, domain: Option<String>) {
        self.cookie.domain = domain;
    }

    /// Set the secure attribute of the session cookie.
    pub fn set_cookie_secure(&mut self, secure: bool) {
        self.cookie.secure = secure;
    }

    /// Set the http-only attribute of the session cookie.
    pub fn set_cookie_http_only(&mut self, http_only: bool) {
        self.cookie.http_only = http_only;
    }

    /// Returns a reference to the implementation.
    pub fn implementation(&self) -> &Implementation {
        &self.implementation
    }

    /// Returns a mutable reference to the implementation.
    pub fn implementation_mut(&mut self) -> &mut Implementation {
        &mut self.implementation
    }

    /// Consume the session store and return its implementation.
    pub fn into_inner(self) -> Implementation {
        self.implementation
    }
}

impl<Implementation: Debug, Generator: Debug> Debug for SessionStore<Implementation, Generator> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("implementation", &self.implementation)
            .field("id_generator", &self.id_generator)
            .field("clock", &self.clock)
            .field("lifetime_minutes", &self.lifetime_minutes)
            .field("sweep_odds", &self.sweep_odds)
            .field("cookie", &self.cookie)
            .finish_non_exhaustive()
    }
}

/// This is the backend-facing interface of the session store.
/// It defines how session records are retrieved and persisted.
///
/// The session id is expected to be the primary key, uniquely identifying a session.
/// Implementations do not need to check expiry, the session store does that.
#[async_trait]
pub trait SessionStoreImplementation: Send + Sync {
    /// Retrieve the session with the given `id`.
    ///
    /// `request` is available for implementations that keep sessions on the client.
    /// A missing or unreadable session is `Ok(None)`.
    async fn retrieve_session(
        &self,
        id: &str,
        request: &dyn RequestCookies,
    ) -> Result<Option<SessionRecord>>;

    /// Create a session with the given `id` and `record`.
    ///
    /// `cookie` is the session cookie that will be attached to `response` after this call.
    /// Implementations that keep sessions on the client attach their own cookies to `response`.
    async fn create_session(
        &mut self,
        id: &str,
        record: &SessionRecord,
        cookie: &SetCookieCommand,
        response: &mut dyn ResponseCookies,
    ) -> Result;

    /// Update the session with the given `id` to `record`.
    ///
    /// Defaults to [`create_session`](Self::create_session), i.e. an upsert.
    async fn update_session(
        &mut self,
        id: &str,
        record: &SessionRecord,
        cookie: &SetCookieCommand,
        response: &mut dyn ResponseCookies,
    ) -> Result {
        self.create_session(id, record, cookie, response).await
    }

    /// Returns this implementation as a [`Sweeper`] if it can sweep expired sessions.
    fn sweeper(&mut self) -> Option<&mut dyn Sweeper> {
        None
    }
}

/// The ability of a [`SessionStoreImplementation`] to actively delete expired sessions.
#[async_trait]
pub trait Sweeper: Send {
    /// Delete all sessions that were last active before `expiration`.
    async fn sweep(&mut self, expiration: DateTime<Utc>) -> Result;
}
