//! The innermost hop of the pipeline: actually sending a request.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::{Error, HttpFailure, Result};
use crate::request::{ApiRequest, ApiResponse, status_text};

/// Sends a request to the backend.
///
/// Non-2xx responses and connection failures are reported as
/// [`Error::Http`].
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse>;
}

// ─────────────────────────────────────────────────────────────────────────────
// ReqwestTransport
// ─────────────────────────────────────────────────────────────────────────────

/// Transport over a `reqwest` client.
///
/// No timeout is set here; the loading interceptor owns request timeouts.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = request.url.clone();
        let mut builder = self
            .http
            .request(request.method, &request.url)
            .headers(request.headers);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Http(HttpFailure::network(&url, e)))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let text = response
            .text()
            .await
            .map_err(|e| Error::Http(HttpFailure::network(&url, e)))?;
        let body = parse_body(&text);

        if !(200..300).contains(&status) {
            let mut failure = HttpFailure::new(status, url, body);
            if let Some(reason) = reqwest::StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
            {
                failure.status_text = reason.to_string();
            }
            return Err(Error::Http(failure));
        }

        Ok(ApiResponse {
            status,
            status_text: status_text(status),
            headers,
            body,
        })
    }
}

/// JSON when possible, a string otherwise, null when empty.
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

// ─────────────────────────────────────────────────────────────────────────────
// MockTransport (for testing)
// ─────────────────────────────────────────────────────────────────────────────

/// A scripted outcome for [`MockTransport`].
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Respond successfully with this body.
    Ok(Value),
    /// Fail with this status and body.
    Status(u16, Value),
    /// Connection failure (status 0).
    Network,
    /// Never respond.
    Hang,
}

/// Transport that replays scripted replies in order and records requests.
///
/// When the script runs out, the last reply is repeated.
#[derive(Debug, Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<MockReply>>,
    last: Mutex<Option<MockReply>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new(replies: impl IntoIterator<Item = MockReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            ..Default::default()
        }
    }

    /// Always respond with this body.
    pub fn ok(body: Value) -> Self {
        Self::new([MockReply::Ok(body)])
    }

    /// Every request seen so far.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn next_reply(&self) -> MockReply {
        let mut replies = self.replies.lock();
        let mut last = self.last.lock();
        match replies.pop_front() {
            Some(reply) => {
                *last = Some(reply.clone());
                reply
            }
            None => last.clone().unwrap_or(MockReply::Ok(Value::Null)),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = request.url.clone();
        self.requests.lock().push(request);
        match self.next_reply() {
            MockReply::Ok(body) => Ok(ApiResponse::ok(body)),
            MockReply::Status(status, body) => Err(Error::Http(HttpFailure::new(status, url, body))),
            MockReply::Network => Err(Error::Http(HttpFailure::network(url, "connection refused"))),
            MockReply::Hang => std::future::pending().await,
        }
    }
}
