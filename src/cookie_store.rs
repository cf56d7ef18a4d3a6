use crate::cookie::{RequestCookies, ResponseCookies, SetCookieCommand};
use crate::{Encrypter, NoEncryption, Result, SessionRecord, SessionStoreImplementation};
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use log::debug;

/// The name of the payload cookie unless configured otherwise.
pub const DEFAULT_PAYLOAD_COOKIE_NAME: &str = "illuminate_payload";

/// A session store implementation keeping the whole session on the client, in a payload cookie.
///
/// There is no server-side storage.
/// The record is serialized, encrypted with `E` and base64url encoded into the payload cookie,
/// which is sent alongside the session cookie with the same expiry and attributes.
/// Payloads that cannot be decoded, decrypted or deserialized are treated as missing sessions.
///
/// # Security
///
/// The client holds the full session state, so confidentiality and integrity rely entirely on `E`.
/// A plain store (see [`CookieStore::plain`]) lets the client read **and modify** all session values.
/// Use [`CookieStore::encrypted`] with an authenticating [`Encrypter`] for anything sensitive.
///
/// Cookies are limited to about 4KB by browsers, so this only suits small sessions.
#[derive(Debug, Clone)]
pub struct CookieStore<E = NoEncryption> {
    encrypter: E,
    payload_name: String,
}

impl CookieStore<NoEncryption> {
    /// Create a cookie store that does **not** encrypt the payload.
    /// Session values are visible to the client and not protected against tampering.
    pub fn plain() -> Self {
        Self::encrypted(NoEncryption)
    }
}

impl<E: Encrypter> CookieStore<E> {
    /// Create a cookie store that encrypts the payload with `encrypter`.
    pub fn encrypted(encrypter: E) -> Self {
        Self {
            encrypter,
            payload_name: DEFAULT_PAYLOAD_COOKIE_NAME.to_owned(),
        }
    }

    /// Use `name` for the payload cookie.
    pub fn with_payload_name(mut self, name: impl Into<String>) -> Self {
        self.set_payload_name(name);
        self
    }

    /// Set the name of the payload cookie.
    pub fn set_payload_name(&mut self, name: impl Into<String>) {
        self.payload_name = name.into();
    }

    /// The name of the payload cookie.
    pub fn payload_name(&self) -> &str {
        &self.payload_name
    }

    /// Returns a reference to the encrypter.
    pub fn encrypter(&self) -> &E {
        &self.encrypter
    }

    /// Turn `record` into a payload cookie value.
    pub fn encode_payload(&self, record: &SessionRecord) -> Result<String> {
        let serialized = serde_json::to_vec(record)?;
        let encrypted = self.encrypter.encrypt(&serialized)?;
        Ok(URL_SAFE_NO_PAD.encode(encrypted))
    }

    /// Turn a payload cookie value back into a record.
    /// Returns `None` if any step fails.
    pub fn decode_payload(&self, value: &str) -> Option<SessionRecord> {
        let encrypted = URL_SAFE_NO_PAD
            .decode(value)
            .map_err(|error| debug!("Discarding session payload with invalid encoding: {error}"))
            .ok()?;
        let serialized = self
            .encrypter
            .decrypt(&encrypted)
            .map_err(|error| debug!("Discarding session payload that fails to decrypt: {error}"))
            .ok()?;
        serde_json::from_slice(&serialized)
            .map_err(|error| debug!("Discarding unreadable session payload: {error}"))
            .ok()
    }
}

impl Default for CookieStore<NoEncryption> {
    fn default() -> Self {
        Self::plain()
    }
}

#[async_trait]
impl<E: Encrypter> SessionStoreImplementation for CookieStore<E> {
    async fn retrieve_session(
        &self,
        _id: &str,
        request: &dyn RequestCookies,
    ) -> Result<Option<SessionRecord>> {
        Ok(request
            .get_cookie(&self.payload_name)
            .and_then(|value| self.decode_payload(&value)))
    }

    async fn create_session(
        &mut self,
        _id: &str,
        record: &SessionRecord,
        cookie: &SetCookieCommand,
        response: &mut dyn ResponseCookies,
    ) -> Result {
        let value = self.encode_payload(record)?;
        response.attach_cookie(cookie.sibling(&self.payload_name, value));
        Ok(())
    }
}
