use crate::cookie::CookieConfig;
use crate::session_store::DEFAULT_LIFETIME_MINUTES;
use serde::{Deserialize, Serialize};

/// Session settings, as typically read from an application's configuration file.
///
/// All fields have defaults, so a partial configuration deserializes fine.
///
/// # Example
///
/// ```rust
/// # use flash_session::SessionConfig;
/// let config: SessionConfig = serde_json::from_str(r#"{"lifetime": 30, "lottery": [1, 50]}"#).unwrap();
/// assert_eq!(config.lifetime, 30);
/// assert_eq!(config.lottery, [1, 50]);
/// assert_eq!(config.cookie.name, "illuminate_session");
/// assert_eq!(config.payload, "illuminate_payload");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// The number of minutes a session may stay idle before it expires.
    pub lifetime: u32,
    /// The sweep lottery odds: sweep `lottery[0]` out of `lottery[1]` finished sessions.
    pub lottery: [u32; 2],
    /// The session cookie attributes.
    pub cookie: CookieConfig,
    /// The name of the payload cookie of a [`CookieStore`](crate::CookieStore).
    pub payload: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lifetime: DEFAULT_LIFETIME_MINUTES,
            lottery: [2, 100],
            cookie: CookieConfig::default(),
            payload: crate::cookie_store::DEFAULT_PAYLOAD_COOKIE_NAME.to_owned(),
        }
    }
}
