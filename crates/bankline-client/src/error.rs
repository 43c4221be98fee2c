//! Client error types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::ConfigError;
use crate::error_handler::NormalizedError;
use crate::request::status_text;

/// A failed HTTP exchange as seen inside the pipeline.
///
/// Status `0` means the server was never reached (network failure, CORS,
/// connection refused).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpFailure {
    pub status: u16,
    pub status_text: String,
    pub url: String,
    /// Response body, parsed as JSON when possible, otherwise a string.
    pub payload: Value,
    pub message: String,
    /// Set once a stage has already navigated away because of this failure.
    #[serde(default)]
    pub redirect_issued: bool,
}

impl HttpFailure {
    pub fn new(status: u16, url: impl Into<String>, payload: Value) -> Self {
        let url = url.into();
        let status_text = status_text(status);
        let message = format!("Http failure response for {url}: {status} {status_text}");
        Self {
            status,
            status_text,
            url,
            payload,
            message,
            redirect_issued: false,
        }
    }

    /// The server could not be reached.
    pub fn network(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        let url = url.into();
        Self {
            status: 0,
            status_text: status_text(0),
            message: format!("Http failure response for {url}: 0 Unknown Error ({reason})"),
            url,
            payload: Value::Null,
            redirect_issued: false,
        }
    }

    /// A client-side timeout, shaped like a server-issued 408.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::new(408, url, Value::String("Request timeout".to_string()))
    }
}

impl std::fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP {} {} for {}", self.status, self.status_text, self.url)
    }
}

/// Client error type.
#[derive(Debug, Error)]
pub enum Error {
    /// A request failed inside the pipeline and has not been surfaced yet.
    #[error("HTTP error: {0}")]
    Http(HttpFailure),

    /// A failure surfaced to the caller after retry and classification.
    #[error("API error ({}): {}", .0.status, .0.message)]
    Api(Box<NormalizedError>),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Session storage failed.
    #[error("Session storage error: {0}")]
    Store(#[from] bankline_auth::Error),
}

impl Error {
    /// HTTP status of the failure, if this is an HTTP failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http(f) => Some(f.status),
            Error::Api(e) => Some(e.status),
            _ => None,
        }
    }

    /// The surfaced error, if this failure went through classification.
    pub fn normalized(&self) -> Option<&NormalizedError> {
        match self {
            Error::Api(e) => Some(e),
            _ => None,
        }
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Check if this is an authentication error.
    pub fn is_auth_error(&self) -> bool {
        self.status() == Some(401)
    }

    /// Check if this is a rate limit error.
    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(429)
    }

    /// Check if this is a server error.
    pub fn is_server_error(&self) -> bool {
        matches!(self.status(), Some(status) if status >= 500)
    }

    /// Check if the server could not be reached.
    pub fn is_network_error(&self) -> bool {
        self.status() == Some(0)
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
