//! Request/response audit logging with secret redaction.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::HeaderMap;
use serde_json::Value;
use tokio::time::Instant;

use super::REDACTED;
use crate::error::{Error, HttpFailure, Result};
use crate::error_handler::join_errors;
use crate::notify::MessageSink;
use crate::pipeline::{Interceptor, Next};
use crate::request::{ApiRequest, ApiResponse};

const SENSITIVE_HEADERS: [&str; 3] = ["authorization", "cookie", "x-api-key"];
const SENSITIVE_FIELDS: [&str; 5] = ["password", "token", "apiKey", "secret", "creditCard"];

/// Headers as a name → value map with credentials redacted.
pub fn sanitize_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            let name = name.as_str().to_string();
            let value = if SENSITIVE_HEADERS.contains(&name.as_str()) {
                REDACTED.to_string()
            } else {
                value.to_str().unwrap_or("<binary>").to_string()
            };
            (name, value)
        })
        .collect()
}

/// A copy of `body` with top-level secret fields redacted.
pub fn sanitize_body(body: &Value) -> Value {
    match body {
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(k, v)| {
                    let v = if SENSITIVE_FIELDS.contains(&k.as_str()) {
                        Value::String(REDACTED.to_string())
                    } else {
                        v.clone()
                    };
                    (k.clone(), v)
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Why a request failed, in one line.
fn failure_details(failure: &HttpFailure) -> String {
    if failure.status == 0 {
        return "Network error - unable to reach the server".to_string();
    }
    match &failure.payload {
        Value::String(s) if !s.is_empty() => s.clone(),
        Value::Object(obj) => {
            if let Some(Value::String(m)) = obj.get("message") {
                return m.clone();
            }
            if let Some(Value::String(e)) = obj.get("error") {
                return e.clone();
            }
            if let Some(Value::Array(errors)) = obj.get("errors") {
                return join_errors(errors);
            }
            failure.message.clone()
        }
        _ => failure.message.clone(),
    }
}

/// Innermost stage: records every exchange without changing it.
#[derive(Debug, Clone, Default)]
pub struct LoggingInterceptor {
    sink: Option<Arc<dyn MessageSink>>,
}

impl LoggingInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also write one line per exchange to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn MessageSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    fn emit(&self, line: String) {
        if let Some(sink) = &self.sink {
            sink.add(line);
        }
    }
}

/// Records the outcome of one exchange when dropped.
///
/// A request dropped before a result arrives (timeout or cancellation)
/// still gets a line.
struct ExchangeRecord<'a> {
    interceptor: &'a LoggingInterceptor,
    method: Method,
    url: String,
    started: Instant,
    recorded: bool,
}

impl ExchangeRecord<'_> {
    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn record(&mut self, result: &Result<ApiResponse>) {
        self.recorded = true;
        let (method, url, elapsed_ms) = (&self.method, &self.url, self.elapsed_ms());
        match result {
            Ok(response) => {
                tracing::info!(method = %method, url = %url, status = response.status, elapsed_ms, "Request succeeded");
                self.interceptor.emit(format!(
                    "{method} \"{url}\" [{}] succeeded in {elapsed_ms}ms",
                    response.status
                ));
            }
            Err(Error::Http(failure)) => {
                let details = failure_details(failure);
                tracing::error!(
                    method = %method,
                    url = %url,
                    status = failure.status,
                    elapsed_ms,
                    details = %details,
                    "Request failed"
                );
                self.interceptor.emit(format!(
                    "ERROR: {method} {url} failed with status {} - {details}",
                    failure.status
                ));
            }
            Err(other) => {
                tracing::error!(method = %method, url = %url, elapsed_ms, error = %other, "Request failed");
                self.interceptor.emit(format!("ERROR: {method} {url} failed - {other}"));
            }
        }
    }
}

impl Drop for ExchangeRecord<'_> {
    fn drop(&mut self) {
        if self.recorded {
            return;
        }
        let elapsed_ms = self.elapsed_ms();
        tracing::warn!(method = %self.method, url = %self.url, elapsed_ms, "Request cancelled");
        self.interceptor.emit(format!(
            "{} \"{}\" cancelled in {elapsed_ms}ms",
            self.method, self.url
        ));
    }
}

#[async_trait]
impl Interceptor for LoggingInterceptor {
    fn name(&self) -> &'static str {
        "logging"
    }

    async fn intercept(&self, request: ApiRequest, next: Next<'_>) -> Result<ApiResponse> {
        let body = request.body.as_ref().map(sanitize_body).unwrap_or(Value::Null);
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            headers = ?sanitize_headers(&request.headers),
            body = %body,
            "Sending request"
        );

        let mut record = ExchangeRecord {
            interceptor: self,
            method: request.method.clone(),
            url: request.url.clone(),
            started: Instant::now(),
            recorded: false,
        };
        let result = next.run(request).await;
        record.record(&result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptors::{LoadingInterceptor, LoadingTracker};
    use crate::notify::MessageLog;
    use crate::pipeline::Pipeline;
    use crate::transport::{MockReply, MockTransport};
    use serde_json::json;

    fn setup(replies: Vec<MockReply>) -> (Pipeline, Arc<MockTransport>, Arc<MessageLog>) {
        let transport = Arc::new(MockTransport::new(replies));
        let log = Arc::new(MessageLog::new());
        let pipeline = Pipeline::builder(transport.clone())
            .with(Arc::new(LoggingInterceptor::new().with_sink(log.clone())))
            .build();
        (pipeline, transport, log)
    }

    #[test]
    fn test_sanitize_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer secret".parse().unwrap());
        headers.insert("cookie", "sid=1".parse().unwrap());
        headers.insert("x-api-key", "k".parse().unwrap());
        headers.insert("accept", "application/json".parse().unwrap());

        let clean = sanitize_headers(&headers);
        assert_eq!(clean["authorization"], REDACTED);
        assert_eq!(clean["cookie"], REDACTED);
        assert_eq!(clean["x-api-key"], REDACTED);
        assert_eq!(clean["accept"], "application/json");
    }

    #[test]
    fn test_sanitize_body_top_level_only() {
        let body = json!({
            "username": "ana",
            "password": "hunter2",
            "creditCard": "4111",
            "profile": {"token": "nested"}
        });
        let clean = sanitize_body(&body);
        assert_eq!(clean["username"], "ana");
        assert_eq!(clean["password"], REDACTED);
        assert_eq!(clean["creditCard"], REDACTED);
        assert_eq!(clean["profile"]["token"], "nested");
        assert_eq!(sanitize_body(&json!([1, 2])), json!([1, 2]));
    }

    #[test]
    fn test_failure_details() {
        let f = HttpFailure::new(422, "u", json!({"errors": ["a", "b"]}));
        assert_eq!(failure_details(&f), "a, b");
        let f = HttpFailure::new(400, "u", json!({"error": "bad"}));
        assert_eq!(failure_details(&f), "bad");
        let f = HttpFailure::new(500, "u", json!("boom"));
        assert_eq!(failure_details(&f), "boom");
        let f = HttpFailure::network("u", "refused");
        assert_eq!(failure_details(&f), "Network error - unable to reach the server");
        let f = HttpFailure::new(502, "u", Value::Null);
        assert_eq!(failure_details(&f), f.message);
    }

    #[tokio::test]
    async fn test_success_line() {
        let (pipeline, _, log) = setup(vec![MockReply::Ok(json!({}))]);

        pipeline.send(ApiRequest::get("http://bank/api/accounts")).await.unwrap();

        let lines = log.messages();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("GET \"http://bank/api/accounts\" [200] succeeded in "));
        assert!(lines[0].ends_with("ms"));
    }

    #[tokio::test]
    async fn test_failure_line_and_error_untouched() {
        let (pipeline, _, log) = setup(vec![MockReply::Status(404, json!({"message": "no such loan"}))]);

        let err = pipeline.send(ApiRequest::get("http://bank/api/loans/9")).await.unwrap_err();

        let Error::Http(failure) = err else {
            panic!("expected raw HTTP failure, got {err:?}");
        };
        assert_eq!(failure.status, 404);
        assert_eq!(failure.payload, json!({"message": "no such loan"}));
        assert_eq!(
            log.messages(),
            vec!["ERROR: GET http://bank/api/loans/9 failed with status 404 - no such loan"]
        );
    }

    #[tokio::test]
    async fn test_request_is_not_altered() {
        let (pipeline, transport, _) = setup(vec![MockReply::Ok(Value::Null)]);
        let request = ApiRequest::post("http://bank/api/login")
            .with_header("authorization", "Bearer abc")
            .with_json(json!({"password": "hunter2"}));

        pipeline.send(request).await.unwrap();

        let sent = &transport.requests()[0];
        assert_eq!(sent.headers.get("authorization").unwrap(), "Bearer abc");
        assert_eq!(sent.body, Some(json!({"password": "hunter2"})));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_request_is_recorded() {
        let log = Arc::new(MessageLog::new());
        let tracker = Arc::new(LoadingTracker::new(std::time::Duration::from_secs(1)));
        let pipeline = Pipeline::builder(Arc::new(MockTransport::new([MockReply::Hang])))
            .with(Arc::new(LoadingInterceptor::new(tracker)))
            .with(Arc::new(LoggingInterceptor::new().with_sink(log.clone())))
            .build();

        let err = pipeline.send(ApiRequest::get("http://bank/api/slow")).await.unwrap_err();

        assert_eq!(err.status(), Some(408));
        let lines = log.messages();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("GET \"http://bank/api/slow\" cancelled in "));
    }

    #[tokio::test]
    async fn test_aborted_request_is_recorded() {
        let log = Arc::new(MessageLog::new());
        let transport = Arc::new(MockTransport::new([MockReply::Hang]));
        let pipeline = Arc::new(
            Pipeline::builder(transport.clone())
                .with(Arc::new(LoggingInterceptor::new().with_sink(log.clone())))
                .build(),
        );

        let handle = {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.send(ApiRequest::delete("http://bank/api/cards/7")).await })
        };
        while transport.requests().is_empty() {
            tokio::task::yield_now().await;
        }
        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());

        let lines = log.messages();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("DELETE \"http://bank/api/cards/7\" cancelled in "));
    }
}
