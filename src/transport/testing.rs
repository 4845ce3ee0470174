//! Mock transport for testing
//!
//! Scripted per-endpoint responses, optional delays and a hold gate, plus a
//! record of every call and of how many requests overlapped per endpoint.

#![allow(dead_code)]

use super::{Method, Transport, TransportError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};

/// One request seen by the mock
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    pub endpoint: String,
    pub body: Option<Value>,
}

/// Mock transport that returns scripted responses
#[derive(Default)]
pub struct MockTransport {
    /// One-shot responses, consumed before the sticky response
    queued: Mutex<HashMap<String, VecDeque<Result<Value, TransportError>>>>,
    /// Response returned whenever the queue for an endpoint is empty
    sticky: Mutex<HashMap<String, Result<Value, TransportError>>>,
    delays: Mutex<HashMap<String, Duration>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
    calls: Mutex<Vec<RecordedCall>>,
    in_flight: Arc<Mutex<HashMap<String, usize>>>,
    max_in_flight: Arc<Mutex<HashMap<String, usize>>>,
    /// Notified (with a stored permit) each time a request starts
    pub request_started: Arc<Notify>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the response returned for every call to `endpoint`
    pub fn respond(&self, endpoint: &str, response: Result<Value, TransportError>) {
        self.sticky
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), response);
    }

    /// Queue a response for the next call to `endpoint` only
    pub fn queue(&self, endpoint: &str, response: Result<Value, TransportError>) {
        self.queued
            .lock()
            .unwrap()
            .entry(endpoint.to_string())
            .or_default()
            .push_back(response);
    }

    /// Delay every response for `endpoint`
    pub fn delay(&self, endpoint: &str, delay: Duration) {
        self.delays
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), delay);
    }

    /// Block all requests until `release` is called
    pub fn hold(&self) {
        *self.gate.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let `count` held requests complete
    pub fn release(&self, count: usize) {
        if let Some(gate) = self.gate.lock().unwrap().as_ref() {
            gate.add_permits(count);
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, endpoint: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.endpoint == endpoint)
            .count()
    }

    /// Highest number of simultaneously outstanding requests seen for `endpoint`
    pub fn max_in_flight(&self, endpoint: &str) -> usize {
        self.max_in_flight
            .lock()
            .unwrap()
            .get(endpoint)
            .copied()
            .unwrap_or(0)
    }

    fn next_response(&self, endpoint: &str) -> Result<Value, TransportError> {
        if let Some(queue) = self.queued.lock().unwrap().get_mut(endpoint) {
            if let Some(response) = queue.pop_front() {
                return response;
            }
        }
        self.sticky
            .lock()
            .unwrap()
            .get(endpoint)
            .cloned()
            .unwrap_or_else(|| Err(TransportError::network("No mock response scripted")))
    }
}

/// Decrements the in-flight counter even when the request future is dropped
struct InFlightGuard {
    endpoint: String,
    in_flight: Arc<Mutex<HashMap<String, usize>>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Some(count) = self.in_flight.lock().unwrap().get_mut(&self.endpoint) {
            *count -= 1;
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> Result<Value, TransportError> {
        self.calls.lock().unwrap().push(RecordedCall {
            method,
            endpoint: endpoint.to_string(),
            body,
        });

        let _guard = {
            let mut in_flight = self.in_flight.lock().unwrap();
            let count = in_flight.entry(endpoint.to_string()).or_insert(0);
            *count += 1;
            let mut max = self.max_in_flight.lock().unwrap();
            let peak = max.entry(endpoint.to_string()).or_insert(0);
            *peak = (*peak).max(*count);
            InFlightGuard {
                endpoint: endpoint.to_string(),
                in_flight: Arc::clone(&self.in_flight),
            }
        };
        self.request_started.notify_one();

        let delay = self.delays.lock().unwrap().get(endpoint).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }

        self.next_response(endpoint)
    }
}
