use std::sync::Arc;

use tracing::debug;

use weft_core::error::{Result, WeftError};
use weft_core::traits::Agent;

use crate::context::ExecutionContext;

/// Leaf node wrapping one agent invocation.
///
/// The agent is called with the context's current `output` as input and,
/// when the workflow shares history with agents, the replayed prior runs.
/// On success the reply rewrites `ctx.output`; on failure the agent's
/// error propagates unchanged and `ctx.output` keeps its pre-call value.
/// No retry here; retry policy belongs behind the `Agent` boundary.
pub struct Step {
    id: String,
    agent: Arc<dyn Agent>,
}

impl Step {
    pub fn new(id: impl Into<String>, agent: impl Agent) -> Self {
        Self {
            id: id.into(),
            agent: Arc::new(agent),
        }
    }

    /// Wrap an already-shared agent.
    pub fn from_arc(id: impl Into<String>, agent: Arc<dyn Agent>) -> Self {
        Self {
            id: id.into(),
            agent,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) async fn execute(&self, ctx: &mut ExecutionContext) -> Result<String> {
        debug!(step = %self.id, agent = %self.agent.name(), "Running step");

        // select! so caller-side cancellation interrupts an in-flight call
        let reply = tokio::select! {
            _ = ctx.cancel_token().cancelled() => return Err(WeftError::Cancelled),
            reply = self.agent.run(&ctx.output, ctx.agent_history()) => reply?,
        };

        ctx.output = reply.output.clone();
        Ok(reply.output)
    }
}
