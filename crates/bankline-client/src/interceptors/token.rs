//! Bearer credential attachment and session expiry.

use std::sync::Arc;

use async_trait::async_trait;
use bankline_auth::{Credential, DEFAULT_LANDING_ROUTE, Navigator, Redirect, SessionStore};
use reqwest::header::AUTHORIZATION;

use crate::error::{Error, Result};
use crate::error_handler::user_message;
use crate::pipeline::{Interceptor, Next};
use crate::request::{ApiRequest, ApiResponse};

/// Attaches the stored credential and reacts to 401/403 responses.
///
/// A credential that is malformed or expired is deleted and the request goes
/// out without one; the server decides. Failures are always re-raised.
#[derive(Debug)]
pub struct TokenInterceptor {
    session: SessionStore,
    navigator: Arc<dyn Navigator>,
    landing_route: String,
}

impl TokenInterceptor {
    pub fn new(session: SessionStore, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            session,
            navigator,
            landing_route: DEFAULT_LANDING_ROUTE.to_string(),
        }
    }

    pub fn with_landing_route(mut self, route: impl Into<String>) -> Self {
        self.landing_route = route.into();
        self
    }

    fn authorize(&self, request: ApiRequest) -> ApiRequest {
        let token = match self.session.token() {
            Ok(Some(token)) => token,
            Ok(None) => return request,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read credential, sending request without it");
                return request;
            }
        };

        match Credential::parse(&token) {
            Some(credential) if !credential.is_expired() => {
                let value = format!("Bearer {}", credential.raw());
                request.with_header(AUTHORIZATION.as_str(), &value)
            }
            _ => {
                tracing::debug!(url = %request.url, "Discarding invalid or expired credential");
                if let Err(e) = self.session.remove_token() {
                    tracing::warn!(error = %e, "Failed to remove stale credential");
                }
                request
            }
        }
    }

    fn expire_session(&self, url: &str) {
        tracing::warn!(url = %url, "Unauthorized response, ending session");
        if let Err(e) = self.session.remove_token() {
            tracing::warn!(error = %e, "Failed to remove credential after 401");
        }
        self.navigator.navigate(
            Redirect::new(&self.landing_route)
                .with_query("error", "session_expired")
                .with_query("message", user_message(401)),
        );
    }
}

#[async_trait]
impl Interceptor for TokenInterceptor {
    fn name(&self) -> &'static str {
        "token"
    }

    async fn intercept(&self, request: ApiRequest, next: Next<'_>) -> Result<ApiResponse> {
        let request = self.authorize(request);
        match next.run(request).await {
            Err(Error::Http(mut failure)) => {
                match failure.status {
                    401 => {
                        self.expire_session(&failure.url);
                        failure.redirect_issued = true;
                    }
                    403 => tracing::warn!(url = %failure.url, "Access forbidden"),
                    _ => {}
                }
                Err(Error::Http(failure))
            }
            other => other,
        }
    }
}
