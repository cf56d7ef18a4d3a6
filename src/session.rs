use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The persisted form of a session.
///
/// This is what a [`SessionStoreImplementation`](crate::SessionStoreImplementation) stores and retrieves.
/// Its serialized form is stable: maps are ordered and the last activity is stored in unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    id: String,
    data: SessionData,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_seconds_option"
    )]
    last_activity: Option<DateTime<Utc>>,
}

/// The data of a session: the ordinary key/value pairs and the two flash generations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    /// Values written with [`Session::put`].
    pub values: BTreeMap<String, Value>,
    /// Values written with [`Session::flash`].
    pub flash: FlashData,
}

/// The two generations of flash data.
///
/// Values flashed during request `N` are in `new` until the end of request `N`,
/// then in `old` until the end of request `N + 1`, then gone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashData {
    /// Values flashed by the previous request.
    pub old: BTreeMap<String, Value>,
    /// Values flashed by the current request.
    pub new: BTreeMap<String, Value>,
}

impl SessionRecord {
    /// Create a record that was never persisted, with empty data and no last activity.
    pub fn new(id: String) -> Self {
        Self {
            id,
            data: Default::default(),
            last_activity: None,
        }
    }

    /// Create a record from all of its parts.
    ///
    /// **This method should only be called by session store implementations and tests.**
    pub fn from_parts(id: String, data: SessionData, last_activity: Option<DateTime<Utc>>) -> Self {
        Self {
            id,
            data,
            last_activity,
        }
    }

    /// The id of the session.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The data of the session.
    pub fn data(&self) -> &SessionData {
        &self.data
    }

    /// The time this record was last persisted, or `None` if it never was.
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.last_activity
    }
}

/// A session with a client, for the duration of one request.
///
/// It is returned by [`SessionStore::start`](crate::SessionStore::start) and
/// marked `#[must_use]`, as dropping it will not update the session store.
/// Instead, it should be passed to [`SessionStore::finish`](crate::SessionStore::finish).
///
/// # Example
///
/// ```rust
/// # use flash_session::{Session, SessionRecord};
/// use serde_json::json;
///
/// let mut session = Session::new_fresh(SessionRecord::new("id".to_string()));
/// session.put("user_id", 42);
/// session.flash("status", "saved");
/// assert_eq!(session.get("user_id"), Some(&json!(42)));
/// assert_eq!(session.get("status"), Some(&json!("saved")));
/// assert_eq!(session.get_or("missing", json!(0)), json!(0));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct Session {
    record: SessionRecord,
    exists: bool,
}

impl Session {
    /// Wrap a record that has not been persisted under its id yet.
    pub fn new_fresh(record: SessionRecord) -> Self {
        Self {
            record,
            exists: false,
        }
    }

    /// **This method should only be called by a session store!**
    ///
    /// Wrap a record that was retrieved from the session store and is still valid.
    pub fn new_from_session_store(record: SessionRecord) -> Self {
        Self {
            record,
            exists: true,
        }
    }

    /// The id of the session.
    pub fn id(&self) -> &str {
        &self.record.id
    }

    /// Returns true if the session is already persisted under its id,
    /// i.e. finishing it updates instead of creates.
    pub fn exists(&self) -> bool {
        self.exists
    }

    /// The time the session was last persisted, or `None` if it never was.
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.record.last_activity
    }

    /// The underlying record.
    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    /// Extract the underlying record while consuming the session.
    pub fn into_record(self) -> SessionRecord {
        self.record
    }

    /// Get the value of `key`.
    ///
    /// Ordinary values take precedence over values flashed in this request,
    /// which take precedence over values flashed in the previous request.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let data = &self.record.data;
        data.values
            .get(key)
            .or_else(|| data.flash.new.get(key))
            .or_else(|| data.flash.old.get(key))
    }

    /// Get the value of `key`, or `default` if there is none.
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).cloned().unwrap_or(default)
    }

    /// Get the value of `key`, or the result of `default` if there is none.
    /// `default` is only called if there is no value.
    pub fn get_or_else(&self, key: &str, default: impl FnOnce() -> Value) -> Value {
        self.get(key).cloned().unwrap_or_else(default)
    }

    /// Returns true if [`get`](Self::get) finds a value for `key`.
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// All ordinary values, without flash data.
    pub fn all(&self) -> &BTreeMap<String, Value> {
        &self.record.data.values
    }

    /// Set the value of `key`, overwriting any previous value.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.record.data.values.insert(key.into(), value.into());
    }

    /// Flash the value of `key`.
    /// It is visible for the rest of this request and for the next request.
    pub fn flash(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.record.data.flash.new.insert(key.into(), value.into());
    }

    /// Keep all values flashed by the previous request for one more request.
    /// Values flashed by this request win over previous values of the same key.
    pub fn reflash(&mut self) {
        let flash = &mut self.record.data.flash;
        for (key, value) in &flash.old {
            flash
                .new
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }

    /// Flash the current value of each of `keys` again, wherever it currently lives.
    /// Keys without a value are ignored.
    pub fn keep<Key: AsRef<str>>(&mut self, keys: impl IntoIterator<Item = Key>) {
        for key in keys {
            let key = key.as_ref();
            if let Some(value) = self.get(key).cloned() {
                self.record.data.flash.new.insert(key.to_owned(), value);
            }
        }
    }

    /// Remove the ordinary value of `key`, returning it.
    /// Flash data is not affected.
    pub fn forget(&mut self, key: &str) -> Option<Value> {
        self.record.data.values.remove(key)
    }

    /// Remove all values, including flash data.
    pub fn flush(&mut self) {
        self.record.data = SessionData::default();
    }

    pub(crate) fn age_flash_data(&mut self) {
        let flash = &mut self.record.data.flash;
        flash.old = std::mem::take(&mut flash.new);
    }

    pub(crate) fn regenerate(&mut self, id: String) {
        self.record.id = id;
        self.exists = false;
    }

    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.record.last_activity = Some(now);
    }
}
