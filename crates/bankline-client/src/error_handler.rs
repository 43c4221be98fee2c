//! Error classification, normalization and user notification.
//!
//! Every failure that leaves the pipeline goes through [`ErrorHandler`]
//! exactly once. It produces the [`NormalizedError`] handed to the caller,
//! writes a structured log entry, and raises one notification.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::HttpFailure;
use crate::notify::{Icon, Notification, Notifier};

// ─────────────────────────────────────────────────────────────────────────────
// Classification
// ─────────────────────────────────────────────────────────────────────────────

/// Failure category, derived from the status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    Network,
    Authentication,
    Authorization,
    NotFound,
    Timeout,
    RateLimited,
    Validation,
    Server,
    Client,
    Unknown,
}

impl ErrorCategory {
    pub fn from_status(status: u16) -> Self {
        match status {
            0 => ErrorCategory::Network,
            401 => ErrorCategory::Authentication,
            403 => ErrorCategory::Authorization,
            404 => ErrorCategory::NotFound,
            408 => ErrorCategory::Timeout,
            422 => ErrorCategory::Validation,
            429 => ErrorCategory::RateLimited,
            s if s >= 500 => ErrorCategory::Server,
            s if s >= 400 => ErrorCategory::Client,
            _ => ErrorCategory::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "NETWORK",
            ErrorCategory::Authentication => "AUTHENTICATION",
            ErrorCategory::Authorization => "AUTHORIZATION",
            ErrorCategory::NotFound => "NOT_FOUND",
            ErrorCategory::Timeout => "TIMEOUT",
            ErrorCategory::RateLimited => "RATE_LIMITED",
            ErrorCategory::Validation => "VALIDATION",
            ErrorCategory::Server => "SERVER",
            ErrorCategory::Client => "CLIENT",
            ErrorCategory::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How bad a failure is, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn from_status(status: u16) -> Self {
        match status {
            0 => Severity::Critical,
            s if s >= 500 => Severity::Critical,
            401 | 403 => Severity::High,
            s if s >= 400 => Severity::Medium,
            _ => Severity::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// Short message suitable for end users.
pub fn user_message(status: u16) -> &'static str {
    match status {
        0 => "Unable to connect to the server. Please check your internet connection.",
        400 => "The request was invalid. Please check your input and try again.",
        401 => "Your session has expired. Please log in again.",
        403 => "You do not have permission to perform this action.",
        404 => "The requested resource could not be found.",
        408 => "The request took too long. Please try again.",
        409 => "There was a conflict with the current state. Please refresh and try again.",
        422 => "The data provided could not be processed. Please check your input.",
        429 => "Too many requests. Please wait a moment and try again.",
        500 => "An internal server error occurred. Please try again later.",
        502 => "Bad gateway. The server is temporarily unavailable.",
        503 => "The service is temporarily unavailable. Please try again later.",
        504 => "Gateway timeout. The server took too long to respond.",
        _ => "An unexpected error occurred. Please try again.",
    }
}

/// Notification shown when the session ends because of a 401.
pub fn session_expired_notification() -> Notification {
    Notification::new(
        Icon::Warning,
        "Session Expired",
        "Your session has expired. Please log in again to continue.",
    )
}

/// The notification for a surfaced failure, or `None` for 401, which is
/// handled by the session-expired flow.
pub fn notification_for(status: u16) -> Option<Notification> {
    let n = match status {
        401 => return None,
        0 => Notification::new(
            Icon::Error,
            "Network Error",
            "Unable to connect to the server. Please check your internet connection and try again.",
        ),
        403 => Notification::new(
            Icon::Error,
            "Access Denied",
            "You do not have permission to perform this action. Please contact your administrator if you believe this is an error.",
        ),
        404 => Notification::new(
            Icon::Error,
            "Resource Not Found",
            "The requested resource could not be found. It may have been moved or deleted.",
        ),
        408 => Notification::new(
            Icon::Warning,
            "Request Timeout",
            "The request took too long to complete. Please try again.",
        ),
        429 => Notification::new(
            Icon::Warning,
            "Too Many Requests",
            "You have made too many requests. Please wait a moment and try again.",
        ),
        500 | 502 | 503 | 504 => Notification::new(
            Icon::Error,
            "Server Error",
            format!(
                "An internal server error occurred. Our team has been notified. Please try again later. (Error Code: {status})"
            ),
        ),
        _ => Notification::error(user_message(status)),
    };
    Some(n)
}

/// Pull a human-readable message out of a failure's payload.
///
/// Looks at, in order: a string payload, `.message`, `.error`, `.details`,
/// and joined `.errors[]`, then falls back to the failure's own message.
pub fn extract_message(failure: &HttpFailure) -> String {
    let fallback = || {
        if failure.message.is_empty() {
            "An unknown error occurred".to_string()
        } else {
            failure.message.clone()
        }
    };

    match &failure.payload {
        Value::Null => fallback(),
        Value::String(s) if !s.is_empty() => s.clone(),
        Value::Object(obj) => {
            if let Some(Value::String(m)) = obj.get("message")
                && !m.is_empty()
            {
                return m.clone();
            }
            match obj.get("error") {
                Some(Value::String(e)) if !e.is_empty() => return e.clone(),
                Some(v @ (Value::Object(_) | Value::Array(_))) => return v.to_string(),
                _ => {}
            }
            if let Some(Value::String(d)) = obj.get("details")
                && !d.is_empty()
            {
                return d.clone();
            }
            if let Some(Value::Array(errors)) = obj.get("errors") {
                return join_errors(errors);
            }
            fallback()
        }
        _ => fallback(),
    }
}

/// Join an `errors` array into one line.
pub(crate) fn join_errors(errors: &[Value]) -> String {
    errors
        .iter()
        .map(|e| match e {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

// ─────────────────────────────────────────────────────────────────────────────
// Normalized error
// ─────────────────────────────────────────────────────────────────────────────

/// A surfaced failure, as handed to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedError {
    pub status: u16,
    pub status_text: String,
    pub message: String,
    pub original_payload: Value,
    pub timestamp: DateTime<Utc>,
    pub path: String,
}

impl NormalizedError {
    pub fn from_failure(failure: &HttpFailure) -> Self {
        Self {
            status: failure.status,
            status_text: failure.status_text.clone(),
            message: extract_message(failure),
            original_payload: failure.payload.clone(),
            timestamp: Utc::now(),
            path: if failure.url.is_empty() {
                "Unknown path".to_string()
            } else {
                failure.url.clone()
            },
        }
    }

    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_status(self.status)
    }

    pub fn severity(&self) -> Severity {
        Severity::from_status(self.status)
    }

    pub fn user_message(&self) -> &'static str {
        user_message(self.status)
    }
}

impl std::fmt::Display for NormalizedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} at {}: {}", self.status, self.status_text, self.path, self.message)
    }
}

/// Structured record of a handled error.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorLog {
    pub category: ErrorCategory,
    pub severity: Severity,
    pub message: String,
    pub user_message: String,
    pub status_code: Option<u16>,
    pub url: Option<String>,
    pub timestamp: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handler
// ─────────────────────────────────────────────────────────────────────────────

/// Centralized error handling: normalize, log, notify.
#[derive(Debug, Clone)]
pub struct ErrorHandler {
    notifier: Arc<dyn Notifier>,
}

impl ErrorHandler {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// Handle a surfaced HTTP failure.
    ///
    /// Logs it, raises its notification (none for 401), and returns the
    /// normalized form.
    pub fn handle_http_failure(&self, failure: &HttpFailure) -> NormalizedError {
        let normalized = NormalizedError::from_failure(failure);

        self.log_error(&ErrorLog {
            category: normalized.category(),
            severity: normalized.severity(),
            message: normalized.message.clone(),
            user_message: normalized.user_message().to_string(),
            status_code: Some(normalized.status),
            url: Some(normalized.path.clone()),
            timestamp: normalized.timestamp,
        });

        if let Some(notification) = notification_for(failure.status) {
            self.notifier.notify(notification);
        }

        normalized
    }

    /// Handle an error that did not come from an HTTP exchange.
    pub fn handle_error(&self, error: &(dyn std::error::Error + 'static)) {
        self.log_error(&ErrorLog {
            category: ErrorCategory::Client,
            severity: Severity::High,
            message: error.to_string(),
            user_message: "An unexpected error occurred".to_string(),
            status_code: None,
            url: None,
            timestamp: Utc::now(),
        });
        self.show_error("An unexpected error occurred. Please try again.");
    }

    /// Write an error log entry at a level matching its severity.
    pub fn log_error(&self, log: &ErrorLog) {
        match log.severity {
            Severity::Critical | Severity::High => tracing::error!(
                category = %log.category,
                severity = log.severity.as_str(),
                status = log.status_code,
                url = log.url.as_deref(),
                user_message = %log.user_message,
                timestamp = %log.timestamp.to_rfc3339(),
                "{}",
                log.message
            ),
            Severity::Medium | Severity::Low => tracing::warn!(
                category = %log.category,
                severity = log.severity.as_str(),
                status = log.status_code,
                url = log.url.as_deref(),
                user_message = %log.user_message,
                timestamp = %log.timestamp.to_rfc3339(),
                "{}",
                log.message
            ),
        }
    }

    pub fn show_error(&self, message: &str) {
        self.notifier.notify(Notification::error(message));
    }

    pub fn show_success(&self, message: &str) {
        self.notifier.notify(Notification::success(message));
    }

    pub fn show_warning(&self, message: &str) {
        self.notifier.notify(Notification::warning(message));
    }

    pub fn show_info(&self, message: &str) {
        self.notifier.notify(Notification::info(message));
    }
}
