use crate::client::{NetworkKit, NetworkResponse};
use crate::error::Cause;
use crate::interceptors::TokenRefresher;
use crate::request::Endpoint;
use crate::resilience::retry::RetryPolicy;
use crate::telemetry::{noop_inspector, now_ms, NetworkRequestRecord, TraceInspector};
use crate::{Error, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// A request parked until the in-flight refresh resolves.
///
/// Consumed exactly once, by [`PendingRequest::replay`] or [`PendingRequest::fail`].
pub struct PendingRequest {
    endpoint: Endpoint,
    retry: RetryPolicy,
    reply: oneshot::Sender<Result<NetworkResponse>>,
}

impl PendingRequest {
    pub fn new(
        endpoint: Endpoint,
        retry: RetryPolicy,
    ) -> (Self, oneshot::Receiver<Result<NetworkResponse>>) {
        let (reply, rx) = oneshot::channel();
        (
            Self {
                endpoint,
                retry,
                reply,
            },
            rx,
        )
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Re-issues the request through `next`; the original caller gets the result.
    pub fn replay(self, next: Arc<dyn NetworkKit>) {
        tokio::spawn(async move {
            let outcome = next.send(self.endpoint, self.retry).await;
            let _ = self.reply.send(outcome);
        });
    }

    pub async fn fail(self, error: Error, inspector: &dyn TraceInspector) {
        inspector
            .update(NetworkRequestRecord::finished(&self.endpoint, now_ms()).with_error(error.clone()))
            .await;
        let _ = self.reply.send(Err(error));
    }
}

struct RefreshState {
    /// The in-flight refresh task, if any.
    active: Option<JoinHandle<()>>,
    pending: VecDeque<PendingRequest>,
}

struct Inner {
    refresher: Arc<dyn TokenRefresher>,
    inspector: Arc<dyn TraceInspector>,
    state: Mutex<RefreshState>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Single-flight credential refresh with a FIFO replay queue.
///
/// All state sits behind one mutex; no lock is held across an await.
#[derive(Clone)]
pub struct TokenRefreshCoordinator {
    inner: Arc<Inner>,
}

impl TokenRefreshCoordinator {
    pub fn new(refresher: Arc<dyn TokenRefresher>) -> Self {
        Self::with_trace_inspector(refresher, noop_inspector())
    }

    pub fn with_trace_inspector(
        refresher: Arc<dyn TokenRefresher>,
        inspector: Arc<dyn TraceInspector>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                refresher,
                inspector,
                state: Mutex::new(RefreshState {
                    active: None,
                    pending: VecDeque::new(),
                }),
            }),
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.lock().active.is_some()
    }

    pub fn pending_len(&self) -> usize {
        self.inner.lock().pending.len()
    }

    pub fn enqueue(&self, request: PendingRequest) {
        self.inner.lock().pending.push_back(request);
    }

    /// Parks the request if, and only if, a refresh is in flight.
    ///
    /// The check and the enqueue happen under one lock, so the request cannot
    /// land in a queue that has already been drained.
    pub fn try_enqueue_if_refreshing(
        &self,
        endpoint: &Endpoint,
        retry: RetryPolicy,
    ) -> Option<oneshot::Receiver<Result<NetworkResponse>>> {
        let mut st = self.inner.lock();
        st.active.as_ref()?;
        let (pending, rx) = PendingRequest::new(endpoint.clone(), retry);
        st.pending.push_back(pending);
        Some(rx)
    }

    /// Routes a failure from the wrapped client.
    ///
    /// Anything but a 401, and any failure of the refresh endpoint itself, is
    /// returned unchanged. A 401 parks the request and joins (or starts) the
    /// refresh; the request is then replayed through `next` or failed.
    pub async fn handle_failure(
        &self,
        error: Error,
        endpoint: &Endpoint,
        retry: RetryPolicy,
        next: &Arc<dyn NetworkKit>,
    ) -> Result<NetworkResponse> {
        if !error.is_unauthorised() || endpoint.is_refresh_token_endpoint() {
            return Err(error);
        }

        let (pending, rx) = PendingRequest::new(endpoint.clone(), retry);
        {
            let mut st = self.inner.lock();
            st.pending.push_back(pending);
            if st.active.is_none() {
                st.active = Some(self.start_refresh(next.clone()));
            }
        }

        // The refresh task owns the queue; the reply arrives after replay,
        // failure or cancellation.
        rx.await.unwrap_or(Err(Error::Canceled))
    }

    /// Fails every parked request with [`Error::Canceled`]. An in-flight
    /// refresh keeps running and later finds the queue empty.
    pub async fn cancel_pending(&self) {
        let drained: Vec<PendingRequest> = self.inner.lock().pending.drain(..).collect();
        if !drained.is_empty() {
            info!(count = drained.len(), "canceling requests queued behind token refresh");
        }
        for request in drained {
            request.fail(Error::Canceled, self.inner.inspector.as_ref()).await;
        }
    }

    /// Spawns the refresh. Must be called with the state lock held so that
    /// `active` is set before the task can clear it.
    fn start_refresh(&self, next: Arc<dyn NetworkKit>) -> JoinHandle<()> {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            info!("refreshing access token");
            let refresher = inner.refresher.clone();
            // A panicking refresher must still release the queue.
            let outcome = match tokio::spawn(async move { refresher.refresh_access_token().await }).await {
                Ok(outcome) => outcome,
                Err(join_error) => Err(Error::unknown(join_error)),
            };

            let drained: Vec<PendingRequest> = {
                let mut st = inner.lock();
                st.active = None;
                st.pending.drain(..).collect()
            };

            match outcome {
                Ok(()) => {
                    info!(count = drained.len(), "access token refreshed, replaying queued requests");
                    for request in drained {
                        request.replay(next.clone());
                    }
                }
                Err(error) => {
                    warn!(error = %error, count = drained.len(), "access token refresh failed");
                    let cause: Cause = Arc::new(error);
                    for request in drained {
                        let failure = Error::Network {
                            cause: Some(cause.clone()),
                        };
                        request.fail(failure, inner.inspector.as_ref()).await;
                    }
                }
            }
        })
    }
}
