//! Request and response values carried through the pipeline.

use std::time::Duration;

use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;

/// Header carrying a per-request timeout override in milliseconds.
pub const REQUEST_TIMEOUT_HEADER: &str = "x-request-timeout";

/// An outgoing call.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Method::PATCH, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Attach a JSON body.
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Set a header. Invalid names or values are ignored with a warning.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::try_from(name),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => tracing::warn!(header = name, "Ignoring invalid header"),
        }
        self
    }

    /// Override the timeout for this request only.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let millis = timeout.as_millis().to_string();
        self.with_header(REQUEST_TIMEOUT_HEADER, &millis)
    }

    /// Whether the method sends a body that may take longer to upload.
    pub fn is_mutating(&self) -> bool {
        self.method == Method::POST || self.method == Method::PUT
    }
}

/// A successful response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: HeaderMap,
    pub body: Value,
}

impl ApiResponse {
    /// A 200 response with the given body.
    pub fn ok(body: Value) -> Self {
        Self::with_status(200, body)
    }

    pub fn with_status(status: u16, body: Value) -> Self {
        Self {
            status,
            status_text: status_text(status),
            headers: HeaderMap::new(),
            body,
        }
    }

    /// Deserialize the body into a typed result.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.body.clone())?)
    }

    /// Deserialize the body into a typed result, consuming the response.
    pub fn into_json<T: DeserializeOwned>(self) -> Result<T> {
        Ok(serde_json::from_value(self.body)?)
    }
}

/// Canonical reason phrase for a status code.
pub fn status_text(status: u16) -> String {
    if status == 0 {
        return "Unknown Error".to_string();
    }
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown Status")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_with_timeout_sets_header() {
        let req = ApiRequest::get("http://bank/api").with_timeout(Duration::from_secs(5));
        assert_eq!(req.headers.get(REQUEST_TIMEOUT_HEADER).unwrap(), "5000");
    }

    #[test]
    fn test_invalid_header_ignored() {
        let req = ApiRequest::get("http://bank/api").with_header("bad header", "x");
        assert!(req.headers.is_empty());
    }

    #[test]
    fn test_is_mutating() {
        assert!(ApiRequest::post("u").is_mutating());
        assert!(ApiRequest::put("u").is_mutating());
        assert!(!ApiRequest::patch("u").is_mutating());
        assert!(!ApiRequest::get("u").is_mutating());
    }

    #[test]
    fn test_status_text() {
        assert_eq!(status_text(0), "Unknown Error");
        assert_eq!(status_text(408), "Request Timeout");
        assert_eq!(status_text(503), "Service Unavailable");
    }

    #[test]
    fn test_response_json() {
        #[derive(serde::Deserialize)]
        struct Balance {
            amount: i64,
        }
        let resp = ApiResponse::ok(json!({"amount": 1200}));
        assert_eq!(resp.json::<Balance>().unwrap().amount, 1200);
        assert!(resp.json::<Vec<String>>().is_err());
    }
}
