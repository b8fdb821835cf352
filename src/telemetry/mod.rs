//! 请求追踪模块：记录每个请求的生命周期（pending → finished），供调试与检查使用。
//!
//! Request tracing.
//!
//! Every call through the client produces a [`NetworkRequestRecord`], first as
//! `Pending` when the attempt loop starts and then `Finished` once a response
//! or error is known. Records are keyed by `"{endpoint.id}_{start_ms}"`, so
//! concurrent calls to the same endpoint stay distinct.
//!
//! The client only ever writes to an inspector; reading is left to the
//! application (debug screens, test assertions).
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`TraceInspector`] | Trait for trace destinations |
//! | [`NoopTraceInspector`] | Default no-op inspector |
//! | [`InMemoryTraceInspector`] | Keyed in-memory store with change notifications |
//! | [`BucketEvent`] | Change notification published by the in-memory store |

use crate::request::{Endpoint, HttpMethod};
use crate::transport::ResponseHeaders;
use crate::Error;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::broadcast;
use tracing::warn;

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    Finished,
}

/// One traced request.
#[derive(Debug, Clone)]
pub struct NetworkRequestRecord {
    pub id: String,
    pub endpoint_id: String,
    pub method: HttpMethod,
    pub url: String,
    pub request_headers: BTreeMap<String, String>,
    pub status: RequestStatus,
    pub start_ms: u64,
    pub end_ms: Option<u64>,
    pub response_status: Option<u16>,
    pub response_headers: Option<ResponseHeaders>,
    pub response_body: Option<Bytes>,
    pub error: Option<Error>,
}

impl NetworkRequestRecord {
    pub fn record_id(endpoint: &Endpoint, start_ms: u64) -> String {
        format!("{}_{}", endpoint.id(), start_ms)
    }

    pub fn pending(endpoint: &Endpoint, start_ms: u64) -> Self {
        Self {
            id: Self::record_id(endpoint, start_ms),
            endpoint_id: endpoint.id(),
            method: endpoint.method(),
            url: endpoint.url().to_string(),
            request_headers: endpoint.headers().clone(),
            status: RequestStatus::Pending,
            start_ms,
            end_ms: None,
            response_status: None,
            response_headers: None,
            response_body: None,
            error: None,
        }
    }

    pub fn finished(endpoint: &Endpoint, start_ms: u64) -> Self {
        let mut record = Self::pending(endpoint, start_ms);
        record.status = RequestStatus::Finished;
        record.end_ms = Some(now_ms());
        record
    }

    pub fn with_response(
        mut self,
        status: Option<u16>,
        headers: Option<ResponseHeaders>,
        body: Option<Bytes>,
    ) -> Self {
        self.response_status = status;
        self.response_headers = headers;
        self.response_body = body;
        self
    }

    pub fn with_error(mut self, error: Error) -> Self {
        self.error = Some(error);
        self
    }

    /// The error's status code when there is one, else the response status.
    pub fn status_code(&self) -> Option<u16> {
        self.error
            .as_ref()
            .and_then(Error::status_code)
            .or(self.response_status)
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.end_ms.map(|end| end.saturating_sub(self.start_ms))
    }
}

/// Destination for request traces.
#[async_trait]
pub trait TraceInspector: Send + Sync {
    async fn add(&self, record: NetworkRequestRecord);

    /// Finishes an existing record; adds it if no record with that id exists.
    async fn update(&self, record: NetworkRequestRecord);

    async fn clear_all(&self);
}

pub struct NoopTraceInspector;

#[async_trait]
impl TraceInspector for NoopTraceInspector {
    async fn add(&self, _record: NetworkRequestRecord) {}
    async fn update(&self, _record: NetworkRequestRecord) {}
    async fn clear_all(&self) {}
}

pub fn noop_inspector() -> Arc<dyn TraceInspector> {
    Arc::new(NoopTraceInspector)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketEvent {
    Added(String),
    Updated(String),
    Cleared,
}

/// In-memory inspector for debugging and tests.
///
/// Unbounded by default: records stay until [`TraceInspector::clear_all`].
/// [`InMemoryTraceInspector::with_capacity`] caps the store, evicting the
/// oldest record when a new one is added.
pub struct InMemoryTraceInspector {
    records: RwLock<HashMap<String, NetworkRequestRecord>>,
    events: broadcast::Sender<BucketEvent>,
    capacity: Option<usize>,
}

impl InMemoryTraceInspector {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            records: RwLock::new(HashMap::new()),
            events,
            capacity: None,
        }
    }

    /// Keeps at most `capacity` records (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity.max(1)),
            ..Self::new()
        }
    }

    /// Inserts a record, evicting the oldest first when a new id would
    /// exceed the capacity. Returns whether the id was already present.
    fn insert(&self, record: NetworkRequestRecord) -> bool {
        let mut records = self.write();
        if let Some(capacity) = self.capacity {
            if !records.contains_key(&record.id) && records.len() >= capacity {
                let oldest = records
                    .values()
                    .min_by(|a, b| a.start_ms.cmp(&b.start_ms).then_with(|| a.id.cmp(&b.id)))
                    .map(|r| r.id.clone());
                if let Some(oldest) = oldest {
                    records.remove(&oldest);
                }
            }
        }
        records.insert(record.id.clone(), record).is_some()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BucketEvent> {
        self.events.subscribe()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, NetworkRequestRecord>> {
        self.records.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, NetworkRequestRecord>> {
        self.records.write().unwrap_or_else(|p| p.into_inner())
    }

    pub fn get(&self, id: &str) -> Option<NetworkRequestRecord> {
        self.read().get(id).cloned()
    }

    /// All records, oldest first.
    pub fn records(&self) -> Vec<NetworkRequestRecord> {
        let mut records: Vec<_> = self.read().values().cloned().collect();
        records.sort_by(|a, b| a.start_ms.cmp(&b.start_ms).then_with(|| a.id.cmp(&b.id)));
        records
    }

    pub fn records_for(&self, endpoint: &Endpoint) -> Vec<NetworkRequestRecord> {
        let endpoint_id = endpoint.id();
        self.records()
            .into_iter()
            .filter(|r| r.endpoint_id == endpoint_id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryTraceInspector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TraceInspector for InMemoryTraceInspector {
    async fn add(&self, record: NetworkRequestRecord) {
        let id = record.id.clone();
        self.insert(record);
        let _ = self.events.send(BucketEvent::Added(id));
    }

    async fn update(&self, record: NetworkRequestRecord) {
        let id = record.id.clone();
        let existed = self.insert(record);
        let event = if existed {
            BucketEvent::Updated(id)
        } else {
            warn!(record = %id, "trace record not found for update, adding it");
            BucketEvent::Added(id)
        };
        let _ = self.events.send(event);
    }

    async fn clear_all(&self) {
        self.write().clear();
        let _ = self.events.send(BucketEvent::Cleared);
    }
}
