// This module is only compiled when running tests
#![cfg(any(test, feature = "testing"))]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::pipeline::request::{OutgoingRequest, WireResponse};
use crate::pipeline::transport::{Transport, TransportError};

/// Transport that replays a fixed script of outcomes and records every
/// request it was handed.
#[derive(Default, Debug)]
pub struct ScriptedTransport {
    script: Arc<Mutex<VecDeque<Result<WireResponse, TransportError>>>>,
    requests: Arc<Mutex<Vec<OutgoingRequest>>>,
}

impl ScriptedTransport {
    #[must_use]
    pub fn new(script: Vec<Result<WireResponse, TransportError>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of requests sent so far
    ///
    /// # Panics
    ///
    /// Will panic if the mutex is poisoned
    #[must_use]
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every request sent so far, in order
    ///
    /// # Panics
    ///
    /// Will panic if the mutex is poisoned
    #[must_use]
    pub fn sent(&self) -> Vec<OutgoingRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &OutgoingRequest) -> Result<WireResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Io("script exhausted".to_string())))
    }
}
