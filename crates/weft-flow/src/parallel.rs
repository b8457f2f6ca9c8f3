use tracing::{debug, warn};

use weft_core::error::{Result, WeftError};

use crate::context::ExecutionContext;
use crate::node::Node;

/// Concurrent fan-out/fan-in node.
///
/// Every branch receives an independent clone of the inbound context (the
/// same `output` seeded to all) and runs concurrently. The node waits for
/// all branches to settle before returning; siblings are not cancelled
/// on first failure. After a fully successful join, branch outputs land
/// in `parallel_<id>_branch_<i>_output` keyed by input index, and keys a
/// branch newly wrote are merged back in index order, so the observable
/// result is the same regardless of completion order. If any branch
/// failed, the node fails as a whole and no branch state is written back.
///
/// `ctx.output` is left unchanged. There is no universally correct text
/// merge, so callers read the per-branch keys.
pub struct Parallel {
    id: String,
    branches: Vec<Node>,
}

impl Parallel {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            branches: Vec::new(),
        }
    }

    pub fn with_branch(mut self, node: impl Into<Node>) -> Self {
        self.branches.push(node.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.branches.is_empty() {
            return Err(WeftError::Config(format!(
                "Parallel '{}' has no branches",
                self.id
            )));
        }
        for node in &self.branches {
            node.validate()?;
        }
        Ok(())
    }

    pub(crate) async fn execute(&self, ctx: &mut ExecutionContext) -> Result<String> {
        let total = self.branches.len();
        debug!(parallel = %self.id, branches = total, "Fanning out");

        let futs: Vec<_> = self
            .branches
            .iter()
            .map(|node| {
                let mut branch_ctx = ctx.clone();
                async move {
                    let result = node.execute(&mut branch_ctx).await;
                    (result, branch_ctx)
                }
            })
            .collect();

        // Wait-for-all join; errors are aggregated after every branch settles.
        let settled = futures::future::join_all(futs).await;

        let mut outputs = Vec::with_capacity(total);
        let mut failures = Vec::new();
        for (index, (result, branch_ctx)) in settled.into_iter().enumerate() {
            match result {
                Ok(output) => outputs.push((index, output, branch_ctx)),
                Err(e) => failures.push((index, e)),
            }
        }

        if let Some((first_index, first_error)) = failures.first() {
            warn!(
                parallel = %self.id,
                failed = failures.len(),
                total,
                "Parallel branches failed"
            );
            return Err(WeftError::ParallelBranch {
                node: self.id.clone(),
                failed: failures.len(),
                total,
                first_error: format!("branch {}: {}", first_index, first_error),
            });
        }

        for (index, output, branch_ctx) in outputs {
            ctx.set(
                format!("parallel_{}_branch_{}_output", self.id, index),
                serde_json::Value::String(output),
            );
            ctx.merge_new_values(&branch_ctx);
        }

        debug!(parallel = %self.id, branches = total, "Join complete");
        Ok(ctx.output.clone())
    }
}
