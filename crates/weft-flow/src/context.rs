use std::collections::HashMap;

use tokio_util::sync::CancellationToken;

use weft_core::error::{Result, WeftError};
use weft_core::types::{HistoryEntry, SessionId};

/// Per-run mutable state, threaded through the node chain.
///
/// Exactly one context exists per `Workflow::run` call. It is owned by the
/// run and passed `&mut` down the node chain; only `Parallel` clones it,
/// to hand each branch an independent copy of the inbound state.
///
/// Keys in the value store are namespaced by the writing node's id
/// (`loop_<id>_iterations`, `parallel_<id>_branch_<i>_output`), so
/// distinct node ids never collide.
#[derive(Clone)]
pub struct ExecutionContext {
    /// The pipeline's current textual value, rewritten by every node.
    pub output: String,
    values: HashMap<String, serde_json::Value>,
    session_id: Option<SessionId>,
    history: Vec<HistoryEntry>,
    share_history: bool,
    cancel: CancellationToken,
}

impl ExecutionContext {
    /// A fresh context seeded with the run's input.
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            output: input.into(),
            values: HashMap::new(),
            session_id: None,
            history: Vec::new(),
            share_history: false,
            cancel: CancellationToken::new(),
        }
    }

    /// Get a value by key.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    /// Get a value as a string, if it's a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.as_str())
    }

    /// Set a value.
    pub fn set(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.values.insert(key.into(), value);
    }

    /// Set a string value.
    pub fn set_str(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values
            .insert(key.into(), serde_json::Value::String(value.into()));
    }

    /// The underlying value store.
    pub fn values(&self) -> &HashMap<String, serde_json::Value> {
        &self.values
    }

    /// Adopt keys from a branch context that this context does not have.
    ///
    /// Keys already present here are never overwritten, so the first
    /// writer (lowest branch index) wins on a cross-branch collision.
    pub(crate) fn merge_new_values(&mut self, branch: &ExecutionContext) {
        for (key, value) in &branch.values {
            if !self.values.contains_key(key) {
                self.values.insert(key.clone(), value.clone());
            }
        }
    }

    /// The session this run belongs to, if any.
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    pub(crate) fn set_session(&mut self, id: SessionId) {
        self.session_id = Some(id);
    }

    /// Replayed prior runs, oldest first. Immutable for the duration of
    /// the run.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn has_history(&self) -> bool {
        !self.history.is_empty()
    }

    /// The history slice a `Step` hands to its agent: empty unless the
    /// workflow was configured to share history with agents.
    pub(crate) fn agent_history(&self) -> &[HistoryEntry] {
        if self.share_history {
            &self.history
        } else {
            &[]
        }
    }

    pub(crate) fn attach_history(&mut self, entries: Vec<HistoryEntry>, share_with_agents: bool) {
        self.history = entries;
        self.share_history = share_with_agents;
    }

    /// The run's cancellation token.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn set_cancel(&mut self, token: CancellationToken) {
        self.cancel = token;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Error out if the run has been cancelled.
    pub fn ensure_active(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(WeftError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_store() {
        let mut ctx = ExecutionContext::new("start");
        ctx.set_str("step_a_output", "hello");
        ctx.set("loop_l_iterations", serde_json::json!(3));

        assert_eq!(ctx.get_str("step_a_output"), Some("hello"));
        assert_eq!(ctx.get("loop_l_iterations"), Some(&serde_json::json!(3)));
        assert_eq!(ctx.get("missing"), None);
        assert_eq!(ctx.output, "start");
    }

    #[test]
    fn test_merge_new_values_keeps_existing() {
        let mut parent = ExecutionContext::new("in");
        parent.set_str("shared", "parent");

        let mut branch = parent.clone();
        branch.set_str("shared", "branch");
        branch.set_str("fresh", "from branch");

        parent.merge_new_values(&branch);
        assert_eq!(parent.get_str("shared"), Some("parent"));
        assert_eq!(parent.get_str("fresh"), Some("from branch"));
    }

    #[test]
    fn test_history_sharing_flag() {
        let mut ctx = ExecutionContext::new("in");
        assert!(!ctx.has_history());

        ctx.attach_history(vec![HistoryEntry::success("q", "a")], false);
        assert!(ctx.has_history());
        assert!(ctx.agent_history().is_empty());

        ctx.attach_history(vec![HistoryEntry::success("q", "a")], true);
        assert_eq!(ctx.agent_history().len(), 1);
    }

    #[test]
    fn test_cancellation() {
        let ctx = ExecutionContext::new("in");
        assert!(ctx.ensure_active().is_ok());

        ctx.cancel_token().cancel();
        assert!(ctx.is_cancelled());
        assert!(matches!(ctx.ensure_active(), Err(WeftError::Cancelled)));
    }
}
