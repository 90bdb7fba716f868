//! EVE-NG client errors

use thiserror::Error;

/// Errors that can occur when interacting with the EVE-NG API
#[derive(Debug, Error)]
pub enum EveError {
    /// Transport failure: connection refused, TLS failure, timeout
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not valid JSON
    #[error("Failed to decode response from {uri}: {message}")]
    Decode {
        /// API path that produced the body
        uri: String,
        /// Decoder message followed by the start of the body
        message: String,
    },

    /// Login rejected, or the server refused an unauthenticated call
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// EVE-NG answered with a non-success status
    #[error("EVE-NG API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// `message` field of the EVE-NG envelope, or the raw body
        message: String,
    },

    /// Response parsed as JSON but does not have the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Invalid client configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// JSON serialization error for a request body
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EveError {
    /// Whether the error means the session is not (or no longer) authenticated
    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }

    /// Whether the request never got an HTTP response
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_))
    }
}
