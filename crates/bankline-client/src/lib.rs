//! HTTP request pipeline for the bankline dashboard.
//!
//! Every outbound call passes through an ordered chain of interceptors before
//! reaching the transport:
//!
//! 1. **Error**: retries transient failures with exponential backoff, then
//!    classifies, logs and notifies exactly once.
//! 2. **Loading**: counts in-flight requests and enforces per-request
//!    timeouts.
//! 3. **Token**: attaches the stored bearer credential and ends the session
//!    on 401.
//! 4. **Logging**: records each exchange with secrets redacted.
//!
//! # Example
//!
//! ```no_run
//! use bankline_client::{BanklineClient, Result};
//!
//! # async fn example() -> Result<()> {
//! let client = BanklineClient::builder()
//!     .base_url("http://localhost:8080")
//!     .build()?;
//!
//! let balance: serde_json::Value = client.get("/api/accounts/a1/balance").await?;
//! println!("{balance}");
//!
//! if client.loading().is_loading() {
//!     println!("still busy");
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod error_handler;
pub mod interceptors;
pub mod notify;
pub mod pipeline;
pub mod request;
pub mod retry;
pub mod transport;

pub use client::{BanklineClient, ClientBuilder};
pub use config::{ConfigError, PipelineConfig, TimeoutOverride, load_config, load_config_from};
pub use error::{Error, HttpFailure, Result};
pub use error_handler::{ErrorCategory, ErrorHandler, NormalizedError, Severity};
pub use interceptors::{
    ErrorInterceptor, LoadingInterceptor, LoadingObserver, LoadingTracker, LoggingInterceptor,
    TokenInterceptor,
};
pub use notify::{Icon, MemoryNotifier, MessageLog, MessageSink, Notification, Notifier, TracingNotifier};
pub use pipeline::{Interceptor, Next, Pipeline, PipelineBuilder};
pub use request::{ApiRequest, ApiResponse};
pub use retry::RetryPolicy;
pub use transport::{MockReply, MockTransport, ReqwestTransport, Transport};
