//! Client configuration
//!
//! Connection parameters for an EVE-NG server. Defaults match a fresh EVE-NG
//! install (`admin`/`password` over HTTPS with a self-signed certificate).
//! Values can also be loaded from `EVE_*` environment variables.

use crate::error::EveError;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of per-node calls `lab_action` keeps in flight
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// URL scheme used to reach the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    /// Plain HTTP
    Http,
    /// HTTPS
    #[default]
    Https,
}

impl Protocol {
    /// Scheme string as used in URLs
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = EveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            other => Err(EveError::InvalidConfig(format!(
                "unsupported protocol '{other}', expected http or https"
            ))),
        }
    }
}

/// EVE-NG connection settings
#[derive(Clone)]
pub struct EveConfig {
    /// Server host, optionally with port (e.g. `eve.lab.local` or `10.0.0.5:8443`)
    pub server: String,
    /// Login username
    pub username: String,
    /// Login password
    pub password: String,
    /// URL scheme
    pub protocol: Protocol,
    /// Verify the server TLS certificate
    pub verify_tls: bool,
    /// Per-request timeout
    pub timeout: Duration,
    /// Upper bound on concurrent per-node requests in `lab_action`
    pub max_concurrency: usize,
    /// Send the legacy web UI header set alongside `Accept`
    pub browser_headers: bool,
}

impl EveConfig {
    /// Create a configuration for `server` with default credentials and settings
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            username: "admin".to_string(),
            password: "password".to_string(),
            protocol: Protocol::Https,
            verify_tls: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            browser_headers: false,
        }
    }

    /// Set login credentials
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Set the URL scheme
    #[must_use]
    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Enable or disable TLS certificate verification
    #[must_use]
    pub fn with_verify_tls(mut self, verify_tls: bool) -> Self {
        self.verify_tls = verify_tls;
        self
    }

    /// Set the per-request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the `lab_action` fan-out limit (clamped to at least 1)
    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Send the legacy browser-style header set
    #[must_use]
    pub fn with_browser_headers(mut self, enabled: bool) -> Self {
        self.browser_headers = enabled;
        self
    }

    /// `{protocol}://{server}` without a trailing slash
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.server.trim_end_matches('/'))
    }

    /// Load configuration from environment variables
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `EVE_SERVER` | required |
    /// | `EVE_USERNAME` | `admin` |
    /// | `EVE_PASSWORD` | `password` |
    /// | `EVE_PROTOCOL` | `https` |
    /// | `EVE_VERIFY_TLS` | `false` |
    /// | `EVE_TIMEOUT_SECS` | `30` |
    /// | `EVE_MAX_CONCURRENCY` | `4` |
    /// | `EVE_BROWSER_HEADERS` | `false` |
    pub fn from_env() -> Result<Self, EveError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, EveError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server = lookup("EVE_SERVER")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                EveError::InvalidConfig("EVE_SERVER environment variable is required".to_string())
            })?;

        let mut config = Self::new(server.trim());

        if let Some(username) = lookup("EVE_USERNAME") {
            config.username = username;
        }
        if let Some(password) = lookup("EVE_PASSWORD") {
            config.password = password;
        }
        if let Some(protocol) = lookup("EVE_PROTOCOL") {
            config.protocol = protocol.parse()?;
        }
        if let Some(verify) = lookup("EVE_VERIFY_TLS") {
            config.verify_tls = parse_bool("EVE_VERIFY_TLS", &verify)?;
        }
        if let Some(timeout) = lookup("EVE_TIMEOUT_SECS") {
            let secs = timeout.trim().parse::<u64>().map_err(|e| {
                EveError::InvalidConfig(format!("EVE_TIMEOUT_SECS '{timeout}': {e}"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(limit) = lookup("EVE_MAX_CONCURRENCY") {
            let limit = limit.trim().parse::<usize>().map_err(|e| {
                EveError::InvalidConfig(format!("EVE_MAX_CONCURRENCY '{limit}': {e}"))
            })?;
            config = config.with_max_concurrency(limit);
        }
        if let Some(browser) = lookup("EVE_BROWSER_HEADERS") {
            config.browser_headers = parse_bool("EVE_BROWSER_HEADERS", &browser)?;
        }

        Ok(config)
    }
}

impl fmt::Debug for EveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EveConfig")
            .field("server", &self.server)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("protocol", &self.protocol)
            .field("verify_tls", &self.verify_tls)
            .field("timeout", &self.timeout)
            .field("max_concurrency", &self.max_concurrency)
            .field("browser_headers", &self.browser_headers)
            .finish()
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, EveError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(EveError::InvalidConfig(format!(
            "{key} '{other}' is not a boolean"
        ))),
    }
}
