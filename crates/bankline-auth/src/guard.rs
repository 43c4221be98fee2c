//! Route guard for protected dashboard views.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::navigation::{DEFAULT_LANDING_ROUTE, Redirect};
use crate::store::SessionStore;
use crate::validator;

/// Why navigation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardReason {
    StorageUnavailable,
    NoToken,
    InvalidToken,
    TokenExpired,
    AuthError,
}

impl GuardReason {
    /// Value of the `error` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            GuardReason::StorageUnavailable => "storage_unavailable",
            GuardReason::NoToken => "no_token",
            GuardReason::InvalidToken => "invalid_token",
            GuardReason::TokenExpired => "token_expired",
            GuardReason::AuthError => "auth_error",
        }
    }
}

impl std::fmt::Display for GuardReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    Allow,
    Redirect(Redirect),
}

impl GuardOutcome {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardOutcome::Allow)
    }

    pub fn redirect(&self) -> Option<&Redirect> {
        match self {
            GuardOutcome::Allow => None,
            GuardOutcome::Redirect(r) => Some(r),
        }
    }
}

/// Gate run before navigating to a protected view.
///
/// Checks, in order: storage availability, presence of a credential, its
/// structure, and its expiry. A malformed or expired credential is deleted
/// before redirecting; nothing else is mutated.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    session: SessionStore,
    landing_route: String,
}

impl RouteGuard {
    pub fn new(session: SessionStore) -> Self {
        Self {
            session,
            landing_route: DEFAULT_LANDING_ROUTE.to_string(),
        }
    }

    /// Redirect to a different landing route.
    pub fn with_landing_route(mut self, route: impl Into<String>) -> Self {
        self.landing_route = route.into();
        self
    }

    /// Check access as of now.
    pub fn check(&self) -> GuardOutcome {
        self.check_at(chrono::Utc::now().timestamp_millis())
    }

    /// Check access as of `now_ms` (milliseconds since the Unix epoch).
    pub fn check_at(&self, now_ms: i64) -> GuardOutcome {
        match self.evaluate(now_ms) {
            Ok(None) => {
                tracing::debug!("Route guard: access allowed");
                GuardOutcome::Allow
            }
            Ok(Some(reason)) => self.deny(reason),
            Err(e) => {
                tracing::error!(error = %e, "Route guard failed");
                self.deny(GuardReason::AuthError)
            }
        }
    }

    fn evaluate(&self, now_ms: i64) -> Result<Option<GuardReason>> {
        if !self.session.is_available() {
            return Ok(Some(GuardReason::StorageUnavailable));
        }

        let Some(token) = self.session.token()? else {
            return Ok(Some(GuardReason::NoToken));
        };

        if !validator::is_structurally_valid(&token) {
            self.session.remove_token()?;
            return Ok(Some(GuardReason::InvalidToken));
        }

        if validator::is_expired_at(&token, now_ms) {
            self.session.remove_token()?;
            return Ok(Some(GuardReason::TokenExpired));
        }

        Ok(None)
    }

    fn deny(&self, reason: GuardReason) -> GuardOutcome {
        tracing::warn!(reason = %reason, landing = %self.landing_route, "Route guard: redirecting");
        GuardOutcome::Redirect(Redirect::new(&self.landing_route).with_query("error", reason.as_str()))
    }
}
