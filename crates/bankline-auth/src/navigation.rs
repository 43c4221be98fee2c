//! Navigation contract between the auth core and the view layer.
//!
//! The core never renders anything; it only decides where the user should
//! go next and hands a [`Redirect`] to a [`Navigator`].

use std::collections::BTreeMap;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

/// Public landing route.
pub const DEFAULT_LANDING_ROUTE: &str = "/welcome";

/// Sign-in route.
pub const DEFAULT_SIGN_IN_ROUTE: &str = "/sign-in";

/// A navigation target: a route path plus query parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    pub path: String,
    #[serde(default)]
    pub query: BTreeMap<String, String>,
}

impl Redirect {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: BTreeMap::new(),
        }
    }

    /// Add a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// The `error` query parameter, if set.
    pub fn error(&self) -> Option<&str> {
        self.query.get("error").map(String::as_str)
    }

    /// Render as a relative URL, e.g. `/welcome?error=no_token`.
    pub fn to_url(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query.iter())
            .finish();
        format!("{}?{}", self.path, query)
    }
}

impl std::fmt::Display for Redirect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_url())
    }
}

/// Receives navigation decisions.
pub trait Navigator: Send + Sync + std::fmt::Debug {
    /// Navigate to `redirect`.
    fn navigate(&self, redirect: Redirect);

    /// The URL currently displayed, used as a return target after sign-in.
    fn current_url(&self) -> String;
}

/// Navigator that records every redirect. Used by the CLI and tests.
#[derive(Debug)]
pub struct MemoryNavigator {
    current: RwLock<String>,
    history: Mutex<Vec<Redirect>>,
}

impl MemoryNavigator {
    pub fn new() -> Self {
        Self::at("/")
    }

    /// Start at the given URL.
    pub fn at(url: impl Into<String>) -> Self {
        Self {
            current: RwLock::new(url.into()),
            history: Mutex::new(Vec::new()),
        }
    }

    /// All redirects issued so far, oldest first.
    pub fn history(&self) -> Vec<Redirect> {
        self.history.lock().clone()
    }

    pub fn last(&self) -> Option<Redirect> {
        self.history.lock().last().cloned()
    }
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator for MemoryNavigator {
    fn navigate(&self, redirect: Redirect) {
        tracing::debug!(to = %redirect, "Navigating");
        *self.current.write() = redirect.to_url();
        self.history.lock().push(redirect);
    }

    fn current_url(&self) -> String {
        self.current.read().clone()
    }
}
