//! In-memory transport with scripted responses.

use super::{Operation, Params, Transport, TransportError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

type Scripted = Result<Value, TransportError>;

#[derive(Default)]
pub(crate) struct ScriptedTransport {
    responses: Mutex<HashMap<Operation, VecDeque<Scripted>>>,
    gates: Mutex<HashMap<Operation, Arc<Semaphore>>>,
    calls: Mutex<Vec<(Operation, Params)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, operation: Operation, outcome: Scripted) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(operation)
            .or_default()
            .push_back(outcome);
        self
    }

    /// Make calls to `operation` wait until `release` is called.
    pub fn hold(self, operation: Operation) -> Self {
        self.gates
            .lock()
            .unwrap()
            .insert(operation, Arc::new(Semaphore::new(0)));
        self
    }

    pub fn release(&self, operation: Operation) {
        if let Some(gate) = self.gates.lock().unwrap().get(&operation) {
            gate.add_permits(1);
        }
    }

    pub fn calls(&self) -> Vec<(Operation, Params)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, operation: Operation) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(op, _)| *op == operation)
            .count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn call(
        &self,
        operation: Operation,
        params: &[(&'static str, String)],
    ) -> Result<Value, TransportError> {
        self.calls
            .lock()
            .unwrap()
            .push((operation, params.to_vec()));

        let gate = self.gates.lock().unwrap().get(&operation).cloned();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        self.responses
            .lock()
            .unwrap()
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(TransportError::network(operation, "no scripted response")))
    }
}
