use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use weft_core::error::{Result, WeftError};
use weft_core::traits::HistoryStore;
use weft_core::types::{HistoryEntry, RunStatus, SessionId};

use crate::context::ExecutionContext;
use crate::node::Node;

const DEFAULT_HISTORY_RUNS: usize = 3;

/// Configuration for building a [`Workflow`].
pub struct WorkflowConfig {
    /// Label for diagnostics.
    pub name: String,
    /// Ordered top-level nodes.
    pub steps: Vec<Node>,
    /// Whether runs load and record session history.
    pub enable_history: bool,
    /// Where session history lives. Required when history is enabled.
    pub history_store: Option<Arc<dyn HistoryStore>>,
    /// How many prior runs are replayed into a run's context.
    pub num_history_runs: usize,
    /// Whether each Step forwards the replayed history to its agent.
    pub add_history_to_steps: bool,
}

impl WorkflowConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            enable_history: false,
            history_store: None,
            num_history_runs: DEFAULT_HISTORY_RUNS,
            add_history_to_steps: false,
        }
    }

    pub fn with_step(mut self, node: impl Into<Node>) -> Self {
        self.steps.push(node.into());
        self
    }

    /// Enable history against the given store.
    pub fn with_history(mut self, store: Arc<dyn HistoryStore>) -> Self {
        self.enable_history = true;
        self.history_store = Some(store);
        self
    }

    /// Cap on prior runs replayed into each run.
    pub fn with_history_runs(mut self, n: usize) -> Self {
        self.num_history_runs = n;
        self
    }

    /// Forward replayed history to each Step's agent call.
    pub fn share_history_with_agents(mut self) -> Self {
        self.add_history_to_steps = true;
        self
    }
}

/// An immutable, reusable pipeline over an ordered list of nodes.
///
/// Construction validates the whole node graph; a built workflow holds no
/// per-run state and is safe to run from many tasks concurrently. All
/// mutable run state lives in that run's [`ExecutionContext`] and in the
/// history store.
pub struct Workflow {
    name: String,
    steps: Vec<Node>,
    enable_history: bool,
    history_store: Option<Arc<dyn HistoryStore>>,
    num_history_runs: usize,
    add_history_to_steps: bool,
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("name", &self.name)
            .field("num_steps", &self.steps.len())
            .field("enable_history", &self.enable_history)
            .field("has_history_store", &self.history_store.is_some())
            .field("num_history_runs", &self.num_history_runs)
            .field("add_history_to_steps", &self.add_history_to_steps)
            .finish()
    }
}

impl Workflow {
    /// Validate the configuration and build the workflow.
    ///
    /// Misconfigured nodes (branchless Condition, routeless Router, empty
    /// Parallel) fail here, never at execute time.
    pub fn new(config: WorkflowConfig) -> Result<Self> {
        if config.steps.is_empty() {
            return Err(WeftError::Config(format!(
                "Workflow '{}' has no steps",
                config.name
            )));
        }
        if config.enable_history && config.history_store.is_none() {
            return Err(WeftError::Config(format!(
                "Workflow '{}' enables history without a store",
                config.name
            )));
        }
        for node in &config.steps {
            node.validate()?;
        }

        Ok(Self {
            name: config.name,
            steps: config.steps,
            enable_history: config.enable_history,
            history_store: config.history_store,
            num_history_runs: config.num_history_runs,
            add_history_to_steps: config.add_history_to_steps,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run without a session: history is skipped for this call even when
    /// the workflow has it enabled.
    pub async fn run(&self, input: &str) -> Result<RunResult> {
        self.run_inner(input, None, CancellationToken::new()).await
    }

    /// Run under a session id, loading and recording history when enabled.
    pub async fn run_with_session(&self, input: &str, session: &SessionId) -> Result<RunResult> {
        self.run_inner(input, Some(session.clone()), CancellationToken::new())
            .await
    }

    /// Run with a caller-supplied cancellation token. Cancelling it stops
    /// the run at the next node boundary and interrupts in-flight agent
    /// calls.
    pub async fn run_with_cancel(
        &self,
        input: &str,
        session: Option<&SessionId>,
        cancel: CancellationToken,
    ) -> Result<RunResult> {
        self.run_inner(input, session.cloned(), cancel).await
    }

    async fn run_inner(
        &self,
        input: &str,
        session: Option<SessionId>,
        cancel: CancellationToken,
    ) -> Result<RunResult> {
        let mut ctx = ExecutionContext::new(input);
        ctx.set_cancel(cancel);

        let history_session = if self.enable_history { session } else { None };

        // A store read failure aborts before any node executes: running
        // without the expected history would silently change agent behavior.
        if let (Some(sid), Some(store)) = (&history_session, self.history_store.as_deref()) {
            let session_data = store.get_session(sid).await?;
            let replayed = session_data.recent(self.num_history_runs).to_vec();
            debug!(
                workflow = %self.name,
                session = %sid,
                total = session_data.count_runs(),
                replayed = replayed.len(),
                "History attached"
            );
            ctx.attach_history(replayed, self.add_history_to_steps);
            ctx.set_session(sid.clone());
        }

        info!(
            workflow = %self.name,
            status = %RunStatus::Running,
            steps = self.steps.len(),
            "Workflow run started"
        );

        for node in &self.steps {
            debug!(workflow = %self.name, node = node.id(), kind = node.kind(), "Executing node");
            if let Err(e) = node.execute(&mut ctx).await {
                error!(
                    workflow = %self.name,
                    node = node.id(),
                    status = %RunStatus::Failed,
                    error = %e,
                    "Workflow run failed"
                );
                self.record_failure(&history_session, input, &e).await;
                return Err(e);
            }
        }

        let output = ctx.output.clone();
        if let (Some(sid), Some(store)) = (&history_session, self.history_store.as_deref()) {
            store
                .append_run(sid, HistoryEntry::success(input, &output))
                .await?;
        }

        info!(workflow = %self.name, status = %RunStatus::Completed, "Workflow run complete");

        Ok(RunResult {
            status: RunStatus::Completed,
            output,
            values: ctx.values().clone(),
            replayed_history: ctx.history().len(),
        })
    }

    /// Record a failed run. The node error is what the caller needs to
    /// see, so an append failure here is logged rather than returned.
    async fn record_failure(&self, session: &Option<SessionId>, input: &str, err: &WeftError) {
        if let (Some(sid), Some(store)) = (session, self.history_store.as_deref()) {
            let entry = HistoryEntry::failure(input, err.to_string());
            if let Err(append_err) = store.append_run(sid, entry).await {
                warn!(session = %sid, error = %append_err, "Could not record failed run");
            }
        }
    }
}

/// What a successful run hands back to the caller.
#[derive(Debug, Clone)]
pub struct RunResult {
    status: RunStatus,
    output: String,
    values: HashMap<String, serde_json::Value>,
    replayed_history: usize,
}

impl RunResult {
    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// The final pipeline output.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// A named result written by a node during the run.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.as_str())
    }

    /// Whether any prior runs were replayed into this run.
    pub fn has_history(&self) -> bool {
        self.replayed_history > 0
    }

    /// How many prior runs were replayed into this run.
    pub fn history_count(&self) -> usize {
        self.replayed_history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Condition;
    use crate::router::Router;
    use crate::step::Step;
    use std::sync::atomic::Ordering;
    use weft_test_utils::{CountingAgent, FailingAgent, TransformAgent};

    #[tokio::test]
    async fn test_steps_chain_in_declared_order() {
        let workflow = Workflow::new(
            WorkflowConfig::new("chain")
                .with_step(Step::new("a", TransformAgent::wrapping("a", "a")))
                .with_step(Step::new("b", TransformAgent::wrapping("b", "b")))
                .with_step(Step::new("c", TransformAgent::wrapping("c", "c"))),
        )
        .unwrap();

        let result = workflow.run("x").await.unwrap();
        assert_eq!(result.output(), "c(b(a(x)))");
        assert_eq!(result.status(), RunStatus::Completed);
        assert!(!result.has_history());
    }

    #[tokio::test]
    async fn test_fail_fast_skips_later_steps() {
        let after = CountingAgent::new("after", "unreachable");
        let after_calls = after.calls();

        let workflow = Workflow::new(
            WorkflowConfig::new("failing")
                .with_step(Step::new("ok", TransformAgent::wrapping("a", "a")))
                .with_step(Step::new("bad", FailingAgent::new("f", "bad step")))
                .with_step(Step::new("never", after)),
        )
        .unwrap();

        let err = workflow.run("x").await.unwrap_err();
        assert!(err.to_string().contains("bad step"));
        assert_eq!(after_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_construction_rejects_empty_workflow() {
        let err = Workflow::new(WorkflowConfig::new("empty")).unwrap_err();
        assert!(matches!(err, WeftError::Config(_)));
    }

    #[tokio::test]
    async fn test_construction_validates_nested_nodes() {
        // A branchless Condition buried inside a Router must fail at build.
        let config = WorkflowConfig::new("invalid").with_step(
            Router::new("route", |_| "only".to_string())
                .with_route("only", Condition::new("empty", |_| true)),
        );
        assert!(Workflow::new(config).is_err());
    }

    #[tokio::test]
    async fn test_history_without_store_is_a_config_error() {
        let mut config = WorkflowConfig::new("bad")
            .with_step(Step::new("a", TransformAgent::wrapping("a", "a")));
        config.enable_history = true;
        assert!(Workflow::new(config).is_err());
    }

    #[tokio::test]
    async fn test_cancel_before_run_stops_first_node() {
        let agent = CountingAgent::new("a", "ok");
        let calls = agent.calls();
        let workflow = Workflow::new(
            WorkflowConfig::new("cancelled").with_step(Step::new("a", agent)),
        )
        .unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = workflow.run_with_cancel("x", None, cancel).await.unwrap_err();

        assert!(matches!(err, WeftError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
