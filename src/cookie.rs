use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Read access to the cookies sent with a request.
pub trait RequestCookies: Sync {
    /// Returns the value of the cookie called `name`, if the request has one.
    fn get_cookie(&self, name: &str) -> Option<String>;
}

/// Write access to the cookies of a response.
pub trait ResponseCookies: Send {
    /// Attach `cookie` to the response.
    fn attach_cookie(&mut self, cookie: SetCookieCommand);
}

/// Indicates that the client should store a cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookieCommand {
    /// The name of the cookie.
    pub name: String,
    /// The value of the cookie.
    pub value: String,
    /// The expiry time of the cookie.
    pub expiry: DateTime<Utc>,
    /// The path attribute of the cookie.
    pub path: String,
    /// The domain attribute of the cookie.
    pub domain: Option<String>,
    /// If true, the cookie is only sent over secure connections.
    pub secure: bool,
    /// If true, the cookie is not accessible to scripts.
    pub http_only: bool,
}

/// The attributes of the session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieConfig {
    /// The name of the session cookie.
    pub name: String,
    /// The path attribute.
    pub path: String,
    /// The domain attribute.
    pub domain: Option<String>,
    /// The secure attribute.
    pub secure: bool,
    /// The http-only attribute.
    pub http_only: bool,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: "illuminate_session".to_owned(),
            path: "/".to_owned(),
            domain: None,
            secure: false,
            http_only: true,
        }
    }
}

impl CookieConfig {
    /// Build a command setting the cookie described by this config.
    pub fn to_command(&self, value: String, expiry: DateTime<Utc>) -> SetCookieCommand {
        SetCookieCommand {
            name: self.name.clone(),
            value,
            expiry,
            path: self.path.clone(),
            domain: self.domain.clone(),
            secure: self.secure,
            http_only: self.http_only,
        }
    }
}

impl SetCookieCommand {
    /// A cookie with the same attributes and expiry as this one, but a different name and value.
    pub fn sibling(&self, name: &str, value: String) -> Self {
        Self {
            name: name.to_owned(),
            value,
            ..self.clone()
        }
    }
}

impl RequestCookies for HashMap<String, String> {
    fn get_cookie(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl RequestCookies for BTreeMap<String, String> {
    fn get_cookie(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl ResponseCookies for Vec<SetCookieCommand> {
    fn attach_cookie(&mut self, cookie: SetCookieCommand) {
        self.push(cookie);
    }
}
