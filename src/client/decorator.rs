use crate::request::Endpoint;
use crate::resilience::retry::RetryPolicy;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;

use super::core::{NetworkKit, NetworkResponse};

/// Hooks a layer contributes around the wrapped client.
///
/// Every hook has a pass-through default, so a layer only implements the
/// ones it needs.
#[async_trait]
pub trait Decorator: Send + Sync + 'static {
    /// A `Some` result is returned verbatim and the wrapped client is never called.
    async fn pre_send(
        &self,
        _endpoint: &Endpoint,
        _retry: &RetryPolicy,
        _next: &Arc<dyn NetworkKit>,
    ) -> Option<Result<NetworkResponse>> {
        None
    }

    async fn post_success(&self, _endpoint: &Endpoint, _response: &NetworkResponse) {}

    /// May re-delegate to `next` with another policy, or finalize the error.
    async fn post_failure(
        &self,
        _endpoint: &Endpoint,
        error: Error,
        _retry: RetryPolicy,
        _next: &Arc<dyn NetworkKit>,
    ) -> Result<NetworkResponse> {
        Err(error)
    }

    async fn on_cancel_all(&self) {}
}

/// A [`Decorator`] bound to the client it wraps.
pub struct Decorated<D> {
    next: Arc<dyn NetworkKit>,
    decorator: D,
}

impl<D: Decorator> Decorated<D> {
    pub fn new(next: Arc<dyn NetworkKit>, decorator: D) -> Self {
        Self { next, decorator }
    }

    pub fn decorator(&self) -> &D {
        &self.decorator
    }

    pub fn inner(&self) -> &Arc<dyn NetworkKit> {
        &self.next
    }
}

#[async_trait]
impl<D: Decorator> NetworkKit for Decorated<D> {
    async fn send(&self, endpoint: Endpoint, retry: RetryPolicy) -> Result<NetworkResponse> {
        if let Some(short_circuit) = self.decorator.pre_send(&endpoint, &retry, &self.next).await {
            return short_circuit;
        }
        match self.next.send(endpoint.clone(), retry).await {
            Ok(response) => {
                self.decorator.post_success(&endpoint, &response).await;
                Ok(response)
            }
            Err(error) => {
                self.decorator
                    .post_failure(&endpoint, error, retry, &self.next)
                    .await
            }
        }
    }

    async fn cancel_all(&self) {
        self.decorator.on_cancel_all().await;
        self.next.cancel_all().await;
    }
}
