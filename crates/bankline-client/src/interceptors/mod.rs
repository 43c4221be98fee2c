//! The standard pipeline stages.
//!
//! Registration order is Error, Loading, Token, Logging. The Error stage is
//! outermost so it sees the fully processed outcome of everything inside it
//! and owns retry and classification.

mod error;
mod loading;
mod logging;
mod token;

pub use error::ErrorInterceptor;
pub use loading::{LoadingInterceptor, LoadingObserver, LoadingTracker};
pub use logging::{LoggingInterceptor, sanitize_body, sanitize_headers};
pub use token::TokenInterceptor;

/// Replacement for sensitive header and body values.
pub const REDACTED: &str = "[REDACTED]";
