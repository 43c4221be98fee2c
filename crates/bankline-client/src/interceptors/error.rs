//! Retry with exponential backoff, then classification.

use std::sync::Arc;

use async_trait::async_trait;
use bankline_auth::{DEFAULT_SIGN_IN_ROUTE, Navigator, Redirect, SessionStore};

use crate::error::{Error, HttpFailure, Result};
use crate::error_handler::{ErrorHandler, session_expired_notification};
use crate::pipeline::{Interceptor, Next};
use crate::request::{ApiRequest, ApiResponse};
use crate::retry::RetryPolicy;

/// Outermost stage: retries transient failures and surfaces the rest.
///
/// A failure that is not retried (or runs out of attempts) goes through the
/// [`ErrorHandler`] exactly once and reaches the caller as
/// [`Error::Api`]. Non-HTTP errors pass through untouched.
#[derive(Debug)]
pub struct ErrorInterceptor {
    policy: RetryPolicy,
    handler: ErrorHandler,
    session: SessionStore,
    navigator: Arc<dyn Navigator>,
    sign_in_route: String,
}

impl ErrorInterceptor {
    pub fn new(handler: ErrorHandler, session: SessionStore, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            policy: RetryPolicy::default(),
            handler,
            session,
            navigator,
            sign_in_route: DEFAULT_SIGN_IN_ROUTE.to_string(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sign_in_route(mut self, route: impl Into<String>) -> Self {
        self.sign_in_route = route.into();
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn surface(&self, failure: HttpFailure) -> Error {
        if failure.status == 401 {
            self.end_session(&failure);
        }
        Error::Api(Box::new(self.handler.handle_http_failure(&failure)))
    }

    /// Clear the session, tell the user, and send them to sign in.
    fn end_session(&self, failure: &HttpFailure) {
        if let Err(e) = self.session.clear_session() {
            tracing::warn!(error = %e, "Failed to clear session after 401");
        }
        self.handler.notifier().notify(session_expired_notification());

        if failure.redirect_issued {
            tracing::debug!(url = %failure.url, "Redirect already issued for 401");
            return;
        }
        let return_url = self.navigator.current_url();
        self.navigator
            .navigate(Redirect::new(&self.sign_in_route).with_query("returnUrl", return_url));
    }
}

#[async_trait]
impl Interceptor for ErrorInterceptor {
    fn name(&self) -> &'static str {
        "error"
    }

    async fn intercept(&self, request: ApiRequest, next: Next<'_>) -> Result<ApiResponse> {
        let mut attempt = 0;
        loop {
            match next.run(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(Error::Http(failure)) => {
                    attempt += 1;
                    if !self.policy.should_retry(failure.status, attempt) {
                        return Err(self.surface(failure));
                    }
                    let delay = self.policy.backoff_delay(attempt);
                    tracing::warn!(
                        attempt,
                        max_retries = self.policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        method = %request.method,
                        url = %request.url,
                        status = failure.status,
                        "Request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(other) => return Err(other),
            }
        }
    }
}
