//! Main client implementation.

use std::sync::Arc;

use bankline_auth::{KeyValueStore, MemoryNavigator, MemoryStore, Navigator, SessionStore};
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::error_handler::ErrorHandler;
use crate::interceptors::{
    ErrorInterceptor, LoadingInterceptor, LoadingObserver, LoadingTracker, LoggingInterceptor,
    TokenInterceptor,
};
use crate::notify::{MessageSink, Notifier, TracingNotifier};
use crate::pipeline::Pipeline;
use crate::request::{ApiRequest, ApiResponse};
use crate::retry::RetryPolicy;
use crate::transport::{ReqwestTransport, Transport};

/// Bankline API client.
///
/// Every call goes through the standard pipeline: error handling and retry,
/// loading/timeout tracking, credential attachment, then audit logging.
///
/// # Example
///
/// ```no_run
/// use bankline_client::BanklineClient;
///
/// # async fn example() -> bankline_client::Result<()> {
/// let client = BanklineClient::builder()
///     .base_url("http://localhost:8080")
///     .build()?;
///
/// let accounts: serde_json::Value = client.get("/api/accounts").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BanklineClient {
    /// Inner shared state.
    inner: Arc<ClientInner>,
}

/// Inner client state (shared across clones).
#[derive(Debug)]
struct ClientInner {
    base_url: Url,
    pipeline: Pipeline,
    loading: Arc<LoadingTracker>,
    session: SessionStore,
    handler: ErrorHandler,
    navigator: Arc<dyn Navigator>,
}

impl BanklineClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    /// In-flight request tracking for this client.
    pub fn loading(&self) -> &Arc<LoadingTracker> {
        &self.inner.loading
    }

    pub fn error_handler(&self) -> &ErrorHandler {
        &self.inner.handler
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.inner.navigator
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.inner.pipeline
    }

    // ─────────────────────────────────────────────────────────────────────────
    // HTTP methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Resolve a path against the base URL. Absolute URLs pass through.
    pub fn url(&self, path: &str) -> Result<Url> {
        Ok(self.inner.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Send a prepared request through the pipeline.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.inner.pipeline.send(request).await
    }

    /// Build and send a request for `path`.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<ApiResponse> {
        let mut request = ApiRequest::new(method, self.url(path)?);
        if let Some(body) = body {
            request = request.with_json(body);
        }
        self.send(request).await
    }

    /// Make a GET request.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(Method::GET, path, None).await?.into_json()
    }

    /// Make a POST request.
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(body)?;
        self.request(Method::POST, path, Some(body)).await?.into_json()
    }

    /// Make a PUT request.
    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(body)?;
        self.request(Method::PUT, path, Some(body)).await?.into_json()
    }

    /// Make a PATCH request.
    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(body)?;
        self.request(Method::PATCH, path, Some(body)).await?.into_json()
    }

    /// Make a DELETE request.
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.request(Method::DELETE, path, None).await?;
        Ok(())
    }
}

/// Builder for creating a [`BanklineClient`].
#[derive(Debug, Default)]
pub struct ClientBuilder {
    config: PipelineConfig,
    store: Option<Arc<dyn KeyValueStore>>,
    transport: Option<Arc<dyn Transport>>,
    notifier: Option<Arc<dyn Notifier>>,
    navigator: Option<Arc<dyn Navigator>>,
    sink: Option<Arc<dyn MessageSink>>,
    observers: Vec<Arc<dyn LoadingObserver>>,
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use this pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the base URL for the server.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Persist session state here instead of in memory.
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replace the HTTP transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Write one audit line per exchange to `sink`.
    pub fn message_sink(mut self, sink: Arc<dyn MessageSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn loading_observer(mut self, observer: Arc<dyn LoadingObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<BanklineClient> {
        let config = self.config;
        config.validate()?;

        // Parse and normalize base URL
        let mut base_url = Url::parse(&config.base_url)?;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let session = SessionStore::new(
            self.store
                .unwrap_or_else(|| Arc::new(MemoryStore::new())),
        );
        let handler = ErrorHandler::new(self.notifier.unwrap_or_else(|| Arc::new(TracingNotifier)));
        let navigator = self
            .navigator
            .unwrap_or_else(|| Arc::new(MemoryNavigator::new()));
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(ReqwestTransport::new()));

        let loading = Arc::new(LoadingTracker::from_config(&config));
        for observer in self.observers {
            loading.add_observer(observer);
        }

        let mut logging = LoggingInterceptor::new();
        if let Some(sink) = self.sink {
            logging = logging.with_sink(sink);
        }

        let pipeline = Pipeline::builder(transport)
            .with(Arc::new(
                ErrorInterceptor::new(handler.clone(), session.clone(), navigator.clone())
                    .with_policy(RetryPolicy::from_config(&config))
                    .with_sign_in_route(&config.sign_in_route),
            ))
            .with(Arc::new(LoadingInterceptor::new(loading.clone())))
            .with(Arc::new(
                TokenInterceptor::new(session.clone(), navigator.clone())
                    .with_landing_route(&config.landing_route),
            ))
            .with(Arc::new(logging))
            .build();

        tracing::debug!(base_url = %base_url, stages = ?pipeline.stages(), "Client built");

        Ok(BanklineClient {
            inner: Arc::new(ClientInner {
                base_url,
                pipeline,
                loading,
                session,
                handler,
                navigator,
            }),
        })
    }
}
