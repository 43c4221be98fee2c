//! Credential storage, token validation and route guarding.
//!
//! This crate holds the pieces of the dashboard client that decide whether a
//! user is signed in:
//! - A key–value [`KeyValueStore`] for persisted session state, with an
//!   in-memory and a file-backed implementation
//! - [`SessionStore`], the typed view over the `token`/`email`/`userId` keys
//! - The [`validator`] functions: structural and expiry checks on a credential
//! - [`RouteGuard`], which permits or redirects navigation to protected views
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use bankline_auth::{GuardOutcome, MemoryStore, RouteGuard, SessionStore};
//!
//! let session = SessionStore::new(Arc::new(MemoryStore::new()));
//! let guard = RouteGuard::new(session);
//!
//! match guard.check() {
//!     GuardOutcome::Allow => println!("welcome back"),
//!     GuardOutcome::Redirect(redirect) => println!("go to {}", redirect.to_url()),
//! }
//! ```

pub mod error;
pub mod guard;
pub mod navigation;
pub mod store;
pub mod validator;

pub use error::{Error, Result};
pub use guard::{GuardOutcome, GuardReason, RouteGuard};
pub use navigation::{MemoryNavigator, Navigator, Redirect, DEFAULT_LANDING_ROUTE, DEFAULT_SIGN_IN_ROUTE};
pub use store::{FileStore, KeyValueStore, MemoryStore, SessionStore, SignIn, keys};
pub use validator::{Claims, Credential, decode_claims, is_expired, is_expired_at, is_structurally_valid};
