//! FlowRunner – loads a session, executes exactly **one** graph step, and persists the updated
//! session back to storage.
//!
//! Interactive services run one step per request: the client sends an event, the runner moves
//! the session forward, and the next request picks up where this one left off.
//!
//! A session can only have one run in flight. A second `run` for the same session while the
//! first is still awaiting (for example a slow upload inside a task) fails immediately with
//! [`GraphError::SessionBusy`] without touching the session. The flag is released when the
//! first run finishes, whether it succeeded or failed.

use dashmap::DashSet;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use crate::{
    error::{GraphError, Result},
    graph::{ExecutionResult, Graph},
    storage::SessionStorage,
};

/// High-level helper that orchestrates the common _load → execute → save_ pattern.
#[derive(Clone)]
pub struct FlowRunner {
    graph: Arc<Graph>,
    storage: Arc<dyn SessionStorage>,
    in_flight: Arc<DashSet<String>>,
}

impl FlowRunner {
    pub fn new(graph: Arc<Graph>, storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            graph,
            storage,
            in_flight: Arc::new(DashSet::new()),
        }
    }

    /// Execute **exactly one** task for the given `session_id` and persist the updated session.
    pub async fn run(&self, session_id: &str) -> Result<ExecutionResult> {
        self.run_inner(session_id, None).await
    }

    /// Like [`FlowRunner::run`], but first stores `input` under `key` in the session context.
    ///
    /// The input is written only after the run guard is held, so a rejected concurrent run
    /// cannot overwrite the input of the run in flight.
    pub async fn run_with_input(
        &self,
        session_id: &str,
        key: &str,
        input: impl Serialize,
    ) -> Result<ExecutionResult> {
        let input = serde_json::to_value(input)
            .map_err(|e| GraphError::ContextError(format!("cannot serialize '{key}': {e}")))?;
        self.run_inner(session_id, Some((key, input))).await
    }

    async fn run_inner(
        &self,
        session_id: &str,
        input: Option<(&str, Value)>,
    ) -> Result<ExecutionResult> {
        let _guard = RunGuard::acquire(&self.in_flight, session_id)?;

        let mut session = self
            .storage
            .get(session_id)
            .await?
            .ok_or_else(|| GraphError::SessionNotFound(session_id.to_string()))?;

        if let Some((key, value)) = input {
            session.context.set(key, value).await?;
        }

        let result = self.graph.execute_session(&mut session).await?;

        self.storage.save(session).await?;

        Ok(result)
    }

    /// Whether a run for `session_id` is currently in flight
    pub fn is_running(&self, session_id: &str) -> bool {
        self.in_flight.contains(session_id)
    }

    pub fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }
}

struct RunGuard {
    in_flight: Arc<DashSet<String>>,
    session_id: String,
}

impl RunGuard {
    fn acquire(in_flight: &Arc<DashSet<String>>, session_id: &str) -> Result<Self> {
        if !in_flight.insert(session_id.to_string()) {
            warn!(session_id = %session_id, "rejecting run, session is busy");
            return Err(GraphError::SessionBusy(session_id.to_string()));
        }
        Ok(Self {
            in_flight: in_flight.clone(),
            session_id: session_id.to_string(),
        })
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.in_flight.remove(&self.session_id);
    }
}
