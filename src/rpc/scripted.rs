//! In-memory transport that answers from a handler and records every call.
//! Used by tests and offline demos in place of the hosted backend.

use crate::rpc::transport::{RpcRequest, RpcTransport};
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Handler = dyn Fn(&RpcRequest) -> Result<Value> + Send + Sync;

pub struct ScriptedTransport {
    handler: Box<Handler>,
    calls: Arc<Mutex<Vec<RpcRequest>>>,
    latency: Duration,
}

impl ScriptedTransport {
    pub fn new(handler: impl Fn(&RpcRequest) -> Result<Value> + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Arc::new(Mutex::new(Vec::new())),
            latency: Duration::ZERO,
        }
    }

    /// Always answers with the same payload
    pub fn returning(value: Value) -> Self {
        Self::new(move |_| Ok(value.clone()))
    }

    /// Simulated round-trip time applied to every call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> Vec<RpcRequest> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or(0)
    }

    pub fn calls_to(&self, function: &str) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.iter().filter(|c| c.function == function).count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl RpcTransport for ScriptedTransport {
    async fn call(&self, request: RpcRequest) -> Result<Value> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.clone());
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        (self.handler)(&request)
    }
}
