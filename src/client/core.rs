use crate::interceptors::{InterceptorPipeline, RequestInterceptor};
use crate::pipeline::ResponsePipeline;
use crate::request::{Endpoint, ParsedBody};
use crate::resilience::retry::RetryPolicy;
use crate::telemetry::{noop_inspector, TraceInspector};
use crate::transport::{ResponseHeaders, Transport};
use crate::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Successful outcome of a call.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkResponse {
    pub body: ParsedBody,
    pub status: u16,
    pub headers: ResponseHeaders,
}

impl NetworkResponse {
    /// Deserializes the parsed body into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        self.body.decode()
    }
}

/// The one surface shared by the base client and every decorator layer.
#[async_trait]
pub trait NetworkKit: Send + Sync {
    async fn send(&self, endpoint: Endpoint, retry: RetryPolicy) -> Result<NetworkResponse>;

    /// Cancels every outstanding transport operation.
    async fn cancel_all(&self);
}

/// Conveniences available on any [`NetworkKit`].
#[async_trait]
pub trait NetworkKitExt: NetworkKit {
    /// Sends and decodes a JSON body into `T`.
    async fn send_json<T>(&self, endpoint: Endpoint, retry: RetryPolicy) -> Result<T>
    where
        T: DeserializeOwned + Send,
    {
        self.send(endpoint, retry).await?.decode()
    }

    /// Callback form of [`NetworkKit::send`]: runs the call on the tokio
    /// runtime and hands the outcome to `completion`.
    fn send_with_completion<F>(
        self: Arc<Self>,
        endpoint: Endpoint,
        retry: RetryPolicy,
        completion: F,
    ) -> JoinHandle<()>
    where
        Self: 'static,
        F: FnOnce(Result<NetworkResponse>) + Send + 'static,
    {
        tokio::spawn(async move {
            let outcome = self.send(endpoint, retry).await;
            completion(outcome);
        })
    }
}

impl<K: NetworkKit + ?Sized> NetworkKitExt for K {}

/// Innermost client: owns the attempt loop against the transport.
pub struct BaseNetworkKit {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) pipeline: ResponsePipeline,
    pub(crate) interceptors: InterceptorPipeline,
    pub(crate) inspector: Arc<dyn TraceInspector>,
}

impl BaseNetworkKit {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            pipeline: ResponsePipeline::default(),
            interceptors: InterceptorPipeline::new(),
            inspector: noop_inspector(),
        }
    }

    pub fn with_pipeline(mut self, pipeline: ResponsePipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_interceptors(mut self, interceptors: InterceptorPipeline) -> Self {
        self.interceptors = interceptors;
        self
    }

    pub fn with_interceptor<I: RequestInterceptor + 'static>(mut self, interceptor: I) -> Self {
        self.interceptors = self.interceptors.with(interceptor);
        self
    }

    pub fn with_trace_inspector(mut self, inspector: Arc<dyn TraceInspector>) -> Self {
        self.inspector = inspector;
        self
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: u32,
    }

    #[test]
    fn test_response_decode() {
        let response = NetworkResponse {
            body: ParsedBody::Json(json!({"id": 3})),
            status: 200,
            headers: ResponseHeaders::default(),
        };
        assert_eq!(response.decode::<Item>().unwrap(), Item { id: 3 });
        assert!(response.decode::<Vec<Item>>().is_err());
    }
}
