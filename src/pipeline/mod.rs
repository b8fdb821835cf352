//! 响应拦截流水线：将传输层的原始结果转换为类型化响应或分类错误。
//!
//! # Response Interception Pipeline
//!
//! A three-stage chain of responsibility. Each stage either fails with a
//! classified [`Error`] or hands back the capability to run the next stage, so a
//! caller cannot skip ahead:
//!
//! ```text
//! TransportOutcome ─► intercept_error ─► intercept_status ─► intercept_data ─► NetworkResponse
//!                        │                   │                   │
//!                   Canceled/Network/   409 → Conflict       DataMissing /
//!                   Unknown             4xx → Client         DecodingFailed
//!                                       5xx → Server
//! ```
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`ResponsePipeline`] | Holds the pluggable pieces, entry point of the chain |
//! | [`StatusStage`] / [`DataStage`] | Capabilities for stages 2 and 3 |
//! | [`ErrorInterceptor`] | Transport failure classification |
//! | [`StatusInterceptor`] | Status line classification |
//! | [`ConflictJustifier`] | 409 payload interpretation |
//! | [`ResponseErrorInspector`] | 4xx payload inspection |
//! | [`ResponseParserInterceptor`] | Body parsing |
//! | [`ResponseMonitor`] | Per-response observation side effect |
//!
//! Any piece can be replaced through the `with_*` methods without touching
//! the others.

pub mod monitor;
pub mod stages;


pub use monitor::{LoggingResponseMonitor, NoopResponseMonitor, ResponseMonitor, ResponseObservation};
pub use stages::{
    ConflictJustifier, DefaultErrorInspector, DefaultErrorInterceptor, DefaultStatusInterceptor,
    EndpointParserInterceptor, ErrorInterceptor, JsonConflictJustifier, ResponseErrorInspector,
    ResponseParserInterceptor, StatusInterceptor,
};

use crate::client::NetworkResponse;
use crate::error::ClientError;
use crate::request::Endpoint;
use crate::status_code::StatusCode;
use crate::transport::{HttpRequest, ResponseHead, TransportOutcome};
use crate::{Error, Result};
use std::sync::Arc;

/// Start and end of one attempt, in Unix milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptTimings {
    pub start_ms: u64,
    pub end_ms: u64,
}

impl AttemptTimings {
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}

#[derive(Clone)]
pub struct ResponsePipeline {
    error_interceptor: Arc<dyn ErrorInterceptor>,
    status_interceptor: Arc<dyn StatusInterceptor>,
    conflict_justifier: Arc<dyn ConflictJustifier>,
    error_inspector: Arc<dyn ResponseErrorInspector>,
    parser_interceptor: Arc<dyn ResponseParserInterceptor>,
    monitor: Arc<dyn ResponseMonitor>,
}

impl Default for ResponsePipeline {
    fn default() -> Self {
        Self {
            error_interceptor: Arc::new(DefaultErrorInterceptor),
            status_interceptor: Arc::new(DefaultStatusInterceptor),
            conflict_justifier: Arc::new(JsonConflictJustifier),
            error_inspector: Arc::new(DefaultErrorInspector),
            parser_interceptor: Arc::new(EndpointParserInterceptor),
            monitor: Arc::new(LoggingResponseMonitor),
        }
    }
}

impl ResponsePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error_interceptor(mut self, ic: Arc<dyn ErrorInterceptor>) -> Self {
        self.error_interceptor = ic;
        self
    }

    pub fn with_status_interceptor(mut self, ic: Arc<dyn StatusInterceptor>) -> Self {
        self.status_interceptor = ic;
        self
    }

    pub fn with_conflict_justifier(mut self, justifier: Arc<dyn ConflictJustifier>) -> Self {
        self.conflict_justifier = justifier;
        self
    }

    pub fn with_error_inspector(mut self, inspector: Arc<dyn ResponseErrorInspector>) -> Self {
        self.error_inspector = inspector;
        self
    }

    pub fn with_parser_interceptor(mut self, ic: Arc<dyn ResponseParserInterceptor>) -> Self {
        self.parser_interceptor = ic;
        self
    }

    pub fn with_monitor(mut self, monitor: Arc<dyn ResponseMonitor>) -> Self {
        self.monitor = monitor;
        self
    }

    /// Stage 1. Fails on any transport-level error.
    pub fn intercept_error<'a>(
        &'a self,
        outcome: &'a TransportOutcome,
        endpoint: &'a Endpoint,
    ) -> Result<StatusStage<'a>> {
        self.error_interceptor
            .intercept(outcome.error.as_ref(), endpoint)?;
        Ok(StatusStage {
            pipeline: self,
            outcome,
            endpoint,
        })
    }

    /// Runs all three stages.
    pub fn process(
        &self,
        outcome: &TransportOutcome,
        request: &HttpRequest,
        endpoint: &Endpoint,
        timings: AttemptTimings,
    ) -> Result<NetworkResponse> {
        self.intercept_error(outcome, endpoint)?
            .intercept_status(request, timings)?
            .intercept_data()
    }
}

/// Capability to run stage 2.
pub struct StatusStage<'a> {
    pipeline: &'a ResponsePipeline,
    outcome: &'a TransportOutcome,
    endpoint: &'a Endpoint,
}

impl<'a> StatusStage<'a> {
    /// Stage 2. Requires a response head; anything but 2xx fails here.
    pub fn intercept_status(
        self,
        request: &HttpRequest,
        timings: AttemptTimings,
    ) -> Result<DataStage<'a>> {
        let head = self
            .outcome
            .head
            .as_ref()
            .ok_or(Error::HttpResponseTypeCastFailed)?;
        let body = self.outcome.body.as_ref();
        let p = self.pipeline;

        p.monitor.observe(&ResponseObservation {
            endpoint: self.endpoint,
            request,
            status: head.status,
            headers: &head.headers,
            body,
            duration_ms: timings.duration_ms(),
        });

        let status = p.status_interceptor.classify(head);
        if status.is_success() {
            return Ok(DataStage {
                pipeline: p,
                outcome: self.outcome,
                endpoint: self.endpoint,
                head,
            });
        }
        if status == StatusCode::Conflict {
            return Err(p.conflict_justifier.justify(body));
        }
        if status.is_client_error() {
            return Err(Error::Client(ClientError {
                status,
                headers: head.headers.clone(),
                payload: p.error_inspector.inspect(body),
                raw_body: body.cloned(),
                url: request.url.to_string(),
            }));
        }
        Err(Error::Server {
            status: head.status,
            headers: head.headers.clone(),
            body: body.cloned(),
        })
    }
}

/// Capability to run stage 3.
pub struct DataStage<'a> {
    pipeline: &'a ResponsePipeline,
    outcome: &'a TransportOutcome,
    endpoint: &'a Endpoint,
    head: &'a ResponseHead,
}

impl DataStage<'_> {
    /// Stage 3. Parses the body with the endpoint's parser.
    pub fn intercept_data(self) -> Result<NetworkResponse> {
        let body = self
            .pipeline
            .parser_interceptor
            .parse(self.outcome.body.as_ref(), self.endpoint)?;
        Ok(NetworkResponse {
            body,
            status: self.head.status,
            headers: self.head.headers.clone(),
        })
    }
}
