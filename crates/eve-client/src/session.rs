//! Login session
//!
//! EVE-NG authenticates with a cookie handed out by `/api/auth/login`. The
//! session holds the `Cookie` header value built from that response and is
//! never modified after the client is connected.

use reqwest::Url;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, SET_COOKIE};
use std::fmt;

/// Cookie-based EVE-NG session
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    cookie: Option<String>,
}

impl Session {
    /// Session with no cookie; requests go out unauthenticated
    #[must_use]
    pub fn anonymous() -> Self {
        Self { cookie: None }
    }

    /// Session from a ready-made `Cookie` header value (e.g. `unetlab_session=abc`)
    pub fn from_cookie(cookie: impl Into<String>) -> Self {
        let cookie = cookie.into();
        Self {
            cookie: (!cookie.trim().is_empty()).then_some(cookie),
        }
    }

    /// Build a session from the `Set-Cookie` headers of a login response
    ///
    /// The headers go through a cookie jar scoped to `url`, so expired
    /// cookies (`Max-Age=0`, past `expires`) are dropped and a name set twice
    /// keeps its last value. No live cookie yields an anonymous session.
    #[must_use]
    pub fn from_set_cookie_headers(headers: &HeaderMap, url: &Url) -> Self {
        let jar = Jar::default();
        jar.set_cookies(&mut headers.get_all(SET_COOKIE).iter(), url);

        jar.cookies(url)
            .and_then(|value| value.to_str().ok().map(str::to_string))
            .map_or_else(Self::anonymous, Self::from_cookie)
    }

    /// `Cookie` header value, if logged in
    #[must_use]
    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    /// Whether login produced a cookie
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.cookie.is_some()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}
