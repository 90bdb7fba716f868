//! Common utilities for the EVE-NG API client
//!
//! Provides the authenticated HTTP wrapper shared by all API operations.

pub mod uri;

use crate::error::EveError;
use crate::models::ApiEnvelope;
use crate::session::Session;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONNECTION, COOKIE, REFERER, USER_AGENT};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tracing::debug;

const LEGACY_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_3) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/80.0.3987.149 Safari/537.36";

/// HTTP client wrapper carrying the session cookie
#[derive(Debug)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    session: Session,
    browser_headers: bool,
}

impl HttpClient {
    /// Create a new HTTP client wrapper
    pub fn new(client: Client, base_url: String, session: Session, browser_headers: bool) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
            browser_headers,
        }
    }

    /// Replace the session, keeping the connection pool
    #[must_use]
    pub fn with_session(self, session: Session) -> Self {
        Self { session, ..self }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the session
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Get the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Full URL of an API-relative URI, without the cache buster
    pub fn api_url(&self, uri: &str) -> String {
        format!("{}/api/{}", self.base_url, uri.trim_start_matches('/'))
    }

    /// Full URL of an API-relative URI with a fresh cache-busting parameter
    pub fn build_url(&self, uri: &str) -> String {
        uri::with_cache_buster(&self.api_url(uri), uri::cache_buster())
    }

    /// Attach `Accept`, the session cookie and optionally the legacy header set
    fn decorate(&self, builder: RequestBuilder) -> RequestBuilder {
        let mut builder = if self.browser_headers {
            builder.header(ACCEPT, "application/json, text/javascript, */*; q=0.01")
        } else {
            builder.header(ACCEPT, "application/json")
        };

        if self.browser_headers {
            builder = builder
                .header(CONNECTION, "keep-alive")
                .header("DNT", "1")
                .header("X-Requested-With", "XMLHttpRequest")
                .header(USER_AGENT, LEGACY_USER_AGENT)
                .header(REFERER, format!("{}/legacy/", self.base_url))
                .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9");
        }

        if let Some(cookie) = self.session.cookie() {
            builder = builder.header(COOKIE, cookie);
        }

        builder
    }

    /// Make a GET request
    pub async fn get(&self, uri: &str) -> Result<Value, EveError> {
        self.request(Method::GET, uri, None).await
    }

    /// Make a PUT request with an optional JSON body
    pub async fn put(&self, uri: &str, body: Option<&Value>) -> Result<Value, EveError> {
        self.request(Method::PUT, uri, body).await
    }

    /// Send an authenticated request and decode the JSON answer
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<&Value>,
    ) -> Result<Value, EveError> {
        let url = self.build_url(uri);
        debug!("{} {}", method, url);

        let mut builder = self.decorate(self.client.request(method, &url));
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(EveError::Http)?;
        decode_response(uri, response).await
    }
}

/// Map an EVE-NG response onto a JSON value or a typed error
pub(crate) async fn decode_response(uri: &str, response: Response) -> Result<Value, EveError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = error_message(&body);
        return Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::PRECONDITION_FAILED => {
                EveError::Authentication(format!("{uri}: {status} - {message}"))
            }
            StatusCode::NOT_FOUND => EveError::NotFound(format!("{uri}: {message}")),
            _ => EveError::Api {
                status: status.as_u16(),
                message,
            },
        });
    }

    if body.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&body).map_err(|e| EveError::Decode {
        uri: uri.to_string(),
        message: format!("{} - Response (first 500 chars): {}", e, truncate(&body)),
    })
}

/// Prefer the `message` field of an EVE-NG envelope over the raw body
fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.message)
        .unwrap_or_else(|| truncate(body))
}

fn truncate(body: &str) -> String {
    body.chars().take(500).collect()
}
