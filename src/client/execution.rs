//! 请求执行逻辑：构建请求、调用传输层、经过响应流水线，并按重试策略调度后续尝试。
//!
//! Attempt loop of the base client.

use crate::pipeline::AttemptTimings;
use crate::request::Endpoint;
use crate::resilience::retry::{AttemptPlan, RetryPolicy};
use crate::telemetry::{now_ms, NetworkRequestRecord};
use crate::transport::{HttpRequest, TransportOutcome};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use super::core::{BaseNetworkKit, NetworkKit, NetworkResponse};

impl BaseNetworkKit {
    /// Builds the wire request; any failure is reported as a request
    /// construction error and never retried.
    fn build_request(endpoint: &Endpoint) -> Result<HttpRequest> {
        HttpRequest::from_endpoint(endpoint).map_err(|e| match e {
            Error::InvalidUrl { .. } | Error::EncodeBodyFailed { .. } => e,
            other => Error::EncodeBodyFailed {
                cause: Arc::new(other),
            },
        })
    }

    async fn record_outcome(
        &self,
        endpoint: &Endpoint,
        start_ms: u64,
        outcome: Option<&TransportOutcome>,
        error: Option<&Error>,
    ) {
        let mut record = NetworkRequestRecord::finished(endpoint, start_ms);
        if let Some(outcome) = outcome {
            record = record.with_response(
                outcome.status(),
                outcome.head.as_ref().map(|h| h.headers.clone()),
                outcome.body.clone(),
            );
        }
        if let Some(error) = error {
            record = record.with_error(error.clone());
        }
        self.inspector.update(record).await;
    }
}

#[async_trait]
impl NetworkKit for BaseNetworkKit {
    async fn send(&self, endpoint: Endpoint, retry: RetryPolicy) -> Result<NetworkResponse> {
        let start_ms = now_ms();
        // Interceptors run once per call, not per attempt.
        let endpoint = self.interceptors.apply(endpoint).await;
        self.inspector
            .add(NetworkRequestRecord::pending(&endpoint, start_ms))
            .await;

        let request = match Self::build_request(&endpoint) {
            Ok(request) => request,
            Err(error) => {
                warn!(endpoint = %endpoint.id(), error = %error, "failed to build request");
                self.record_outcome(&endpoint, start_ms, None, Some(&error)).await;
                return Err(error);
            }
        };

        let mut attempt: u32 = 0;
        loop {
            let attempt_start = now_ms();
            let outcome = self.transport.send_request(request.clone()).await;
            let timings = AttemptTimings {
                start_ms: attempt_start,
                end_ms: now_ms(),
            };

            let error = match self.pipeline.process(&outcome, &request, &endpoint, timings) {
                Ok(response) => {
                    debug!(
                        endpoint = %endpoint.id(),
                        status = response.status,
                        attempt,
                        duration_ms = now_ms().saturating_sub(start_ms),
                        "request succeeded"
                    );
                    self.record_outcome(&endpoint, start_ms, Some(&outcome), None).await;
                    return Ok(response);
                }
                Err(error) => error,
            };

            let next_attempt = attempt.checked_add(1);
            let plan = match next_attempt {
                Some(n) if error.is_retryable() => retry.attempt_plan(n),
                _ => AttemptPlan::STOP,
            };

            match next_attempt {
                Some(n) if plan.should_retry => {
                    warn!(
                        endpoint = %endpoint.id(),
                        attempt,
                        delay_ms = plan.delay.as_millis() as u64,
                        error = %error,
                        "attempt failed, retrying"
                    );
                    tokio::time::sleep(plan.delay).await;
                    attempt = n;
                }
                _ => {
                    debug!(
                        endpoint = %endpoint.id(),
                        attempt,
                        kind = error.kind(),
                        status = ?error.status_code(),
                        "request failed"
                    );
                    self.record_outcome(&endpoint, start_ms, Some(&outcome), Some(&error))
                        .await;
                    return Err(error);
                }
            }
        }
    }

    async fn cancel_all(&self) {
        self.transport.cancel_all().await;
    }
}
