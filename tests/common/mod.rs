//! Scripted in-memory transport shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use resilient_netkit::transport::{HttpRequest, ResponseHeaders, Transport, TransportOutcome};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

type Responder = Box<dyn Fn(&HttpRequest) -> TransportOutcome + Send + Sync>;

enum Mode {
    /// Pops outcomes in order; the last one repeats once the script runs out.
    Script(Mutex<VecDeque<TransportOutcome>>),
    Respond(Responder),
}

pub struct ScriptedTransport {
    mode: Mode,
    requests: Mutex<Vec<HttpRequest>>,
    cancels: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(outcomes: Vec<TransportOutcome>) -> Self {
        Self::with_mode(Mode::Script(Mutex::new(outcomes.into())))
    }

    pub fn responding<F>(responder: F) -> Self
    where
        F: Fn(&HttpRequest) -> TransportOutcome + Send + Sync + 'static,
    {
        Self::with_mode(Mode::Respond(Box::new(responder)))
    }

    fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            requests: Mutex::new(Vec::new()),
            cancels: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url.path() == path)
            .count()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send_request(&self, request: HttpRequest) -> TransportOutcome {
        self.requests.lock().unwrap().push(request.clone());
        match &self.mode {
            Mode::Script(script) => {
                let mut script = script.lock().unwrap();
                if script.len() > 1 {
                    script.pop_front().unwrap()
                } else {
                    script.front().cloned().unwrap_or_default()
                }
            }
            Mode::Respond(responder) => responder(&request),
        }
    }

    async fn cancel_all(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn json_headers() -> ResponseHeaders {
    [("Content-Type", "application/json")].into_iter().collect()
}

pub fn json(status: u16, body: &str) -> TransportOutcome {
    TransportOutcome::response(status, json_headers(), body.to_string())
}

pub fn status(status: u16) -> TransportOutcome {
    TransportOutcome::response(status, ResponseHeaders::default(), "")
}

pub fn repeat(outcome: TransportOutcome, times: usize) -> Vec<TransportOutcome> {
    std::iter::repeat(outcome).take(times).collect()
}
