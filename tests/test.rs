use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use flash_session::{
    DebugSessionIdGenerator, Error, MockClock, RequestCookies, ResponseCookies, SessionConfig,
    SessionIdGenerator, SessionRecord, SessionStore, SessionStoreImplementation,
    SetCookieCommand, Sweeper, SESSION_ID_LENGTH,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use std::collections::HashMap;

type Response = Vec<SetCookieCommand>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Operation {
    Create { id: String, record: SessionRecord },
    Update { id: String, record: SessionRecord },
    Sweep { expiration: DateTime<Utc> },
}

/// An in-memory implementation that logs every call.
#[derive(Debug, Default)]
struct LoggingStore {
    sessions: HashMap<String, SessionRecord>,
    log: Vec<Operation>,
    can_sweep: bool,
    fail_sweep: bool,
}

impl LoggingStore {
    fn sweeping() -> Self {
        Self {
            can_sweep: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl SessionStoreImplementation for LoggingStore {
    async fn retrieve_session(
        &self,
        id: &str,
        _request: &dyn RequestCookies,
    ) -> flash_session::Result<Option<SessionRecord>> {
        Ok(self.sessions.get(id).cloned())
    }

    async fn create_session(
        &mut self,
        id: &str,
        record: &SessionRecord,
        _cookie: &SetCookieCommand,
        _response: &mut dyn ResponseCookies,
    ) -> flash_session::Result {
        self.log.push(Operation::Create {
            id: id.to_owned(),
            record: record.clone(),
        });
        self.sessions.insert(id.to_owned(), record.clone());
        Ok(())
    }

    async fn update_session(
        &mut self,
        id: &str,
        record: &SessionRecord,
        _cookie: &SetCookieCommand,
        _response: &mut dyn ResponseCookies,
    ) -> flash_session::Result {
        self.log.push(Operation::Update {
            id: id.to_owned(),
            record: record.clone(),
        });
        self.sessions.insert(id.to_owned(), record.clone());
        Ok(())
    }

    fn sweeper(&mut self) -> Option<&mut dyn Sweeper> {
        if self.can_sweep {
            Some(self)
        } else {
            None
        }
    }
}

#[async_trait]
impl Sweeper for LoggingStore {
    async fn sweep(&mut self, expiration: DateTime<Utc>) -> flash_session::Result {
        self.log.push(Operation::Sweep { expiration });
        if self.fail_sweep {
            Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "permission denied",
            )))
        } else {
            Ok(())
        }
    }
}

fn start_time() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

fn new_store(
    implementation: LoggingStore,
) -> (SessionStore<LoggingStore, DebugSessionIdGenerator>, MockClock) {
    let clock = MockClock::new(start_time());
    let store =
        SessionStore::new_with_id_generator(implementation, DebugSessionIdGenerator::default())
            .with_clock(clock.clone())
            .with_lottery_rng(StdRng::seed_from_u64(0));
    (store, clock)
}

fn no_cookies() -> HashMap<String, String> {
    HashMap::new()
}

fn cookies_from(cookie: &SetCookieCommand) -> HashMap<String, String> {
    HashMap::from([(cookie.name.clone(), cookie.value.clone())])
}

fn nth_id(n: usize) -> String {
    let mut generator = DebugSessionIdGenerator::default();
    (0..n).for_each(|_| {
        generator.generate_id();
    });
    generator.generate_id()
}

/// Without a session cookie, nothing is retrieved and a fresh session is started.
#[async_std::test]
async fn test_start_without_cookie() {
    let (mut store, _) = new_store(LoggingStore::default());
    let session = store.start(&no_cookies()).await.unwrap();
    assert!(!session.exists());
    assert_eq!(session.id().len(), SESSION_ID_LENGTH);
    assert_eq!(session.id(), nth_id(0));
    assert_eq!(session.last_activity(), None);
    assert!(session.all().is_empty());
    assert!(store.into_inner().log.is_empty());
}

/// A session cookie identifying no session also starts a fresh session.
#[async_std::test]
async fn test_start_with_unknown_cookie() {
    let (mut store, _) = new_store(LoggingStore::default());
    let request = HashMap::from([("illuminate_session".to_owned(), "unknown".to_owned())]);
    let session = store.start(&request).await.unwrap();
    assert!(!session.exists());
    assert_ne!(session.id(), "unknown");
    assert_eq!(session.id().len(), SESSION_ID_LENGTH);
}

/// A fresh session is created, never updated, and its id is sent in the session cookie.
#[async_std::test]
async fn test_finish_creates_fresh_session() {
    let (mut store, _) = new_store(LoggingStore::default());
    assert_eq!(store.lifetime_minutes(), 120);

    let mut session = store.start(&no_cookies()).await.unwrap();
    session.put("user_id", 42);
    let id = session.id().to_owned();

    let mut response = Response::new();
    let cookie = store.finish(session, &mut response).await.unwrap();
    assert_eq!(cookie.name, "illuminate_session");
    assert_eq!(cookie.value, id);
    assert_eq!(cookie.expiry, start_time() + Duration::seconds(7200));
    assert_eq!(cookie.path, "/");
    assert_eq!(cookie.domain, None);
    assert!(cookie.http_only);
    assert!(!cookie.secure);
    assert_eq!(response, vec![cookie]);

    let log = store.into_inner().log;
    assert_eq!(log.len(), 1);
    let Operation::Create { id: created_id, record } = &log[0] else {
        panic!("expected a create, got {log:?}")
    };
    assert_eq!(created_id, &id);
    assert_eq!(record.last_activity(), Some(start_time()));
    assert_eq!(record.data().values.get("user_id"), Some(&json!(42)));
}

/// A session loaded from the store is updated when finished.
#[async_std::test]
async fn test_finish_updates_existing_session() {
    let (mut store, clock) = new_store(LoggingStore::default());
    let mut session = store.start(&no_cookies()).await.unwrap();
    session.put("count", 1);
    let cookie = store.finish(session, &mut Response::new()).await.unwrap();

    clock.advance(Duration::minutes(5));
    let mut session = store.start(&cookies_from(&cookie)).await.unwrap();
    assert!(session.exists());
    assert_eq!(session.id(), cookie.value);
    assert_eq!(session.last_activity(), Some(start_time()));
    assert_eq!(session.get("count"), Some(&json!(1)));
    session.put("count", 2);
    let second_cookie = store.finish(session, &mut Response::new()).await.unwrap();
    assert_eq!(second_cookie.value, cookie.value);
    assert_eq!(
        second_cookie.expiry,
        start_time() + Duration::minutes(5) + Duration::minutes(120)
    );

    let log = store.into_inner().log;
    assert!(matches!(&log[0], Operation::Create { .. }));
    let Operation::Update { id, record } = &log[1] else {
        panic!("expected an update, got {log:?}")
    };
    assert_eq!(id, &cookie.value);
    assert_eq!(record.data().values.get("count"), Some(&json!(2)));
    assert_eq!(
        record.last_activity(),
        Some(start_time() + Duration::minutes(5))
    );
}

/// A session idle for exactly its lifetime is valid, one second more and it is expired.
#[async_std::test]
async fn test_expiry_boundary() {
    let (mut store, clock) = new_store(LoggingStore::default());
    let session = store.start(&no_cookies()).await.unwrap();
    let cookie = store.finish(session, &mut Response::new()).await.unwrap();

    clock.advance(Duration::seconds(7200));
    let session = store.start(&cookies_from(&cookie)).await.unwrap();
    assert!(session.exists());
    assert_eq!(session.id(), cookie.value);

    clock.advance(Duration::seconds(1));
    let session = store.start(&cookies_from(&cookie)).await.unwrap();
    assert!(!session.exists());
    assert_ne!(session.id(), cookie.value);
}

#[test]
fn test_is_expired() {
    let (store, clock) = new_store(LoggingStore::default());
    let record = |last_activity| {
        SessionRecord::from_parts("id".to_owned(), Default::default(), last_activity)
    };
    let now = start_time();

    assert!(!store.is_expired(&record(Some(now))));
    assert!(!store.is_expired(&record(Some(now - Duration::minutes(120)))));
    assert!(store.is_expired(&record(Some(
        now - Duration::minutes(120) - Duration::seconds(1)
    ))));
    // Never persisted.
    assert!(store.is_expired(&record(None)));
    // The clock moved backwards.
    assert!(store.is_expired(&record(Some(now + Duration::seconds(1)))));

    clock.advance(Duration::seconds(1));
    assert!(!store.is_expired(&record(Some(now + Duration::seconds(1)))));
}

/// Regenerating gives the session a new id, which is then created instead of updated.
#[async_std::test]
async fn test_regenerate_session() {
    let (mut store, _) = new_store(LoggingStore::default());
    let session = store.start(&no_cookies()).await.unwrap();
    let cookie = store.finish(session, &mut Response::new()).await.unwrap();

    let mut session = store.start(&cookies_from(&cookie)).await.unwrap();
    assert!(session.exists());
    session.put("user_id", 7);
    let new_id = store.regenerate_session(&mut session).to_owned();
    assert_ne!(new_id, cookie.value);
    assert_eq!(new_id.len(), SESSION_ID_LENGTH);
    assert_eq!(session.id(), new_id);
    assert!(!session.exists());
    assert_eq!(session.get("user_id"), Some(&json!(7)));

    let new_cookie = store.finish(session, &mut Response::new()).await.unwrap();
    assert_eq!(new_cookie.value, new_id);
    let log = store.into_inner().log;
    assert!(matches!(&log[1], Operation::Create { id, .. } if id == &new_id));
}

/// Flash data survives exactly one following request.
#[async_std::test]
async fn test_flash_data_across_requests() {
    let (mut store, _) = new_store(LoggingStore::default());

    let mut session = store.start(&no_cookies()).await.unwrap();
    session.flash("status", "saved");
    session.flash("notice", "hello");
    assert_eq!(session.get("status"), Some(&json!("saved")));
    let cookie = store.finish(session, &mut Response::new()).await.unwrap();

    let mut session = store.start(&cookies_from(&cookie)).await.unwrap();
    assert_eq!(session.get("status"), Some(&json!("saved")));
    assert_eq!(session.get("notice"), Some(&json!("hello")));
    session.keep(["notice"]);
    store.finish(session, &mut Response::new()).await.unwrap();

    let session = store.start(&cookies_from(&cookie)).await.unwrap();
    assert_eq!(session.get("status"), None);
    assert_eq!(session.get("notice"), Some(&json!("hello")));
    store.finish(session, &mut Response::new()).await.unwrap();

    let session = store.start(&cookies_from(&cookie)).await.unwrap();
    assert_eq!(session.get_or("notice", json!("default")), json!("default"));
}

/// Reflashing keeps all old flash data, preferring newly flashed values.
#[async_std::test]
async fn test_reflash_across_requests() {
    let (mut store, _) = new_store(LoggingStore::default());

    let mut session = store.start(&no_cookies()).await.unwrap();
    session.flash("a", 1);
    session.flash("b", 1);
    let cookie = store.finish(session, &mut Response::new()).await.unwrap();

    let mut session = store.start(&cookies_from(&cookie)).await.unwrap();
    session.flash("b", 2);
    session.reflash();
    store.finish(session, &mut Response::new()).await.unwrap();

    let session = store.start(&cookies_from(&cookie)).await.unwrap();
    assert_eq!(session.get("a"), Some(&json!(1)));
    assert_eq!(session.get("b"), Some(&json!(2)));
}

/// With odds 100 out of 100, every finish sweeps sessions older than the lifetime.
#[async_std::test]
async fn test_sweep_lottery_always() {
    let (mut store, clock) = new_store(LoggingStore::sweeping());
    store.set_sweep_odds(100, 100).unwrap();

    for _ in 0..3 {
        let session = store.start(&no_cookies()).await.unwrap();
        store.finish(session, &mut Response::new()).await.unwrap();
        clock.advance(Duration::minutes(1));
    }

    let sweeps: Vec<_> = store
        .into_inner()
        .log
        .into_iter()
        .filter_map(|operation| match operation {
            Operation::Sweep { expiration } => Some(expiration),
            _ => None,
        })
        .collect();
    assert_eq!(
        sweeps,
        (0..3)
            .map(|minute| start_time() + Duration::minutes(minute) - Duration::minutes(120))
            .collect::<Vec<_>>()
    );
}

/// With odds 0 out of 100, no finish sweeps.
#[async_std::test]
async fn test_sweep_lottery_never() {
    let (mut store, _) = new_store(LoggingStore::sweeping());
    store.set_sweep_odds(0, 100).unwrap();

    for _ in 0..50 {
        let session = store.start(&no_cookies()).await.unwrap();
        store.finish(session, &mut Response::new()).await.unwrap();
    }

    let log = store.into_inner().log;
    assert!(log
        .iter()
        .all(|operation| !matches!(operation, Operation::Sweep { .. })));
}

/// Implementations without the sweep capability are never swept.
#[async_std::test]
async fn test_no_sweep_without_sweeper() {
    let (mut store, _) = new_store(LoggingStore::default());
    store.set_sweep_odds(1, 1).unwrap();
    let session = store.start(&no_cookies()).await.unwrap();
    store.finish(session, &mut Response::new()).await.unwrap();
    assert_eq!(store.into_inner().log.len(), 1);
}

/// A failing sweep does not fail the request.
#[async_std::test]
async fn test_failing_sweep_is_ignored() {
    let (mut store, _) = new_store(LoggingStore {
        fail_sweep: true,
        ..LoggingStore::sweeping()
    });
    store.set_sweep_odds(1, 1).unwrap();
    let session = store.start(&no_cookies()).await.unwrap();
    let mut response = Response::new();
    let cookie = store.finish(session, &mut response).await.unwrap();
    assert_eq!(response, vec![cookie]);
    assert!(matches!(
        store.into_inner().log.last(),
        Some(Operation::Sweep { .. })
    ));
}

#[test]
fn test_invalid_sweep_odds() {
    let (mut store, _) = new_store(LoggingStore::default());
    assert!(matches!(
        store.set_sweep_odds(1, 0),
        Err(Error::InvalidSweepOdds { chance: 1, out_of: 0 })
    ));
    assert!(store.set_sweep_odds(3, 2).is_err());
    assert_eq!(store.sweep_odds(), (2, 100));
}

/// The configured cookie name and attributes are used for reading and writing the session cookie.
#[async_std::test]
async fn test_apply_config() {
    let (mut store, _) = new_store(LoggingStore::default());
    let config: SessionConfig = serde_json::from_value(json!({
        "lifetime": 30,
        "lottery": [5, 10],
        "cookie": {"name": "app_session", "domain": "example.com", "secure": true},
    }))
    .unwrap();
    store.apply_config(&config).unwrap();
    assert_eq!(store.lifetime_minutes(), 30);
    assert_eq!(store.sweep_odds(), (5, 10));

    let session = store.start(&no_cookies()).await.unwrap();
    let cookie = store.finish(session, &mut Response::new()).await.unwrap();
    assert_eq!(cookie.name, "app_session");
    assert_eq!(cookie.domain.as_deref(), Some("example.com"));
    assert!(cookie.secure);
    assert!(cookie.http_only);
    assert_eq!(cookie.path, "/");
    assert_eq!(cookie.expiry, start_time() + Duration::minutes(30));

    // The default cookie name is not read anymore.
    let request = HashMap::from([("illuminate_session".to_owned(), cookie.value.clone())]);
    assert!(!store.start(&request).await.unwrap().exists());
    assert!(store.start(&cookies_from(&cookie)).await.unwrap().exists());
}

#[test]
fn test_cookie_setters() {
    let (mut store, _) = new_store(LoggingStore::default());
    store.set_cookie_name("sid");
    store.set_cookie_path("/app");
    store.set_cookie_domain(Some("example.org".to_owned()));
    store.set_cookie_secure(true);
    store.set_cookie_http_only(false);
    let config = store.cookie_config();
    assert_eq!(config.name, "sid");
    assert_eq!(config.path, "/app");
    assert_eq!(config.domain.as_deref(), Some("example.org"));
    assert!(config.secure);
    assert!(!config.http_only);
}

/// Stored records without a last activity cannot be validated and are replaced.
#[async_std::test]
async fn test_record_without_last_activity_is_invalid() {
    let mut implementation = LoggingStore::default();
    implementation
        .sessions
        .insert("stale".to_owned(), SessionRecord::new("stale".to_owned()));
    let (mut store, _) = new_store(implementation);
    let request = HashMap::from([("illuminate_session".to_owned(), "stale".to_owned())]);
    let session = store.start(&request).await.unwrap();
    assert!(!session.exists());
    assert_ne!(session.id(), "stale");
}

/// Flushing removes all data, which is then persisted.
#[async_std::test]
async fn test_flush_is_persisted() {
    let (mut store, _) = new_store(LoggingStore::default());
    let mut session = store.start(&no_cookies()).await.unwrap();
    session.put("a", 1);
    session.flash("b", 2);
    let cookie = store.finish(session, &mut Response::new()).await.unwrap();

    let mut session = store.start(&cookies_from(&cookie)).await.unwrap();
    session.flush();
    assert_eq!(session.get_or("a", json!(0)), json!(0));
    assert_eq!(session.get_or("b", json!(0)), json!(0));
    store.finish(session, &mut Response::new()).await.unwrap();

    let session = store.start(&cookies_from(&cookie)).await.unwrap();
    assert!(session.exists());
    assert!(!session.has("a"));
    assert!(!session.has("b"));
}
