//! The interceptor chain.
//!
//! A [`Pipeline`] is an ordered list of [`Interceptor`]s in front of a
//! [`Transport`]. Each interceptor receives the request and a [`Next`]
//! handle for the rest of the chain; it may forward, retry, transform or
//! short-circuit. The first interceptor in the list is the outermost one and
//! sees the fully processed outcome of everything after it.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::request::{ApiRequest, ApiResponse};
use crate::transport::Transport;

/// A pipeline stage.
#[async_trait]
pub trait Interceptor: Send + Sync + std::fmt::Debug {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Handle `request`, usually by calling `next.run(...)`.
    async fn intercept(&self, request: ApiRequest, next: Next<'_>) -> Result<ApiResponse>;
}

/// The remainder of the chain after the current interceptor.
///
/// `Next` is `Copy`, so an interceptor may run the rest of the chain more
/// than once (for retries).
#[derive(Clone, Copy)]
pub struct Next<'a> {
    interceptors: &'a [Arc<dyn Interceptor>],
    transport: &'a dyn Transport,
}

impl<'a> Next<'a> {
    pub fn new(interceptors: &'a [Arc<dyn Interceptor>], transport: &'a dyn Transport) -> Self {
        Self {
            interceptors,
            transport,
        }
    }

    /// Run the rest of the chain.
    pub async fn run(self, request: ApiRequest) -> Result<ApiResponse> {
        match self.interceptors.split_first() {
            Some((current, rest)) => {
                current
                    .intercept(request, Next::new(rest, self.transport))
                    .await
            }
            None => self.transport.send(request).await,
        }
    }
}

impl std::fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field(
                "interceptors",
                &self.interceptors.iter().map(|i| i.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// An ordered interceptor chain in front of a transport.
#[derive(Debug, Clone)]
pub struct Pipeline {
    interceptors: Vec<Arc<dyn Interceptor>>,
    transport: Arc<dyn Transport>,
}

impl Pipeline {
    pub fn builder(transport: Arc<dyn Transport>) -> PipelineBuilder {
        PipelineBuilder::new(transport)
    }

    /// Send a request through every interceptor, outermost first.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        Next::new(&self.interceptors, self.transport.as_ref())
            .run(request)
            .await
    }

    /// Interceptor names, outermost first.
    pub fn stages(&self) -> Vec<&'static str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }
}

/// Builder for [`Pipeline`]. Interceptors are added outermost first.
#[derive(Debug)]
pub struct PipelineBuilder {
    interceptors: Vec<Arc<dyn Interceptor>>,
    transport: Arc<dyn Transport>,
}

impl PipelineBuilder {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            interceptors: Vec::new(),
            transport,
        }
    }

    /// Append an interceptor inside the ones already added.
    pub fn with(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            interceptors: self.interceptors,
            transport: self.transport,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use parking_lot::Mutex;
    use serde_json::json;

    /// Records entry/exit order and tags the request.
    #[derive(Debug)]
    struct Trace {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Interceptor for Trace {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn intercept(&self, request: ApiRequest, next: Next<'_>) -> Result<ApiResponse> {
            self.log.lock().push(format!("> {}", self.name));
            let request = request.with_header(&format!("x-{}", self.name), "1");
            let result = next.run(request).await;
            self.log.lock().push(format!("< {}", self.name));
            result
        }
    }

    /// Answers without calling the rest of the chain.
    #[derive(Debug)]
    struct ShortCircuit;

    #[async_trait]
    impl Interceptor for ShortCircuit {
        fn name(&self) -> &'static str {
            "short"
        }

        async fn intercept(&self, _request: ApiRequest, _next: Next<'_>) -> Result<ApiResponse> {
            Ok(ApiResponse::ok(json!("cached")))
        }
    }

    #[tokio::test]
    async fn test_outbound_then_inbound_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let transport = Arc::new(MockTransport::ok(json!({"ok": true})));
        let pipeline = Pipeline::builder(transport.clone())
            .with(Arc::new(Trace { name: "outer", log: log.clone() }))
            .with(Arc::new(Trace { name: "inner", log: log.clone() }))
            .build();

        let response = pipeline.send(ApiRequest::get("http://bank/api")).await.unwrap();

        assert_eq!(response.body, json!({"ok": true}));
        assert_eq!(*log.lock(), vec!["> outer", "> inner", "< inner", "< outer"]);
        let sent = &transport.requests()[0];
        assert!(sent.headers.contains_key("x-outer"));
        assert!(sent.headers.contains_key("x-inner"));
        assert_eq!(pipeline.stages(), vec!["outer", "inner"]);
    }

    #[tokio::test]
    async fn test_short_circuit_skips_transport() {
        let transport = Arc::new(MockTransport::ok(json!("live")));
        let pipeline = Pipeline::builder(transport.clone())
            .with(Arc::new(ShortCircuit))
            .build();

        let response = pipeline.send(ApiRequest::get("http://bank/api")).await.unwrap();

        assert_eq!(response.body, json!("cached"));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_pipeline_hits_transport() {
        let transport = Arc::new(MockTransport::ok(json!(1)));
        let pipeline = Pipeline::builder(transport.clone()).build();
        pipeline.send(ApiRequest::get("http://bank/api")).await.unwrap();
        assert_eq!(transport.request_count(), 1);
    }
}
