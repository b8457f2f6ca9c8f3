use std::sync::Arc;

use tracing::debug;

use weft_core::error::{Result, WeftError};

use crate::context::ExecutionContext;
use crate::node::Node;

/// Predicate over the current context.
pub type ConditionFn = Arc<dyn Fn(&ExecutionContext) -> bool + Send + Sync>;

/// Binary branch node.
///
/// Evaluates the predicate against the current context and executes
/// exactly one of the two child nodes. A missing branch is an explicit
/// pass-through: `ctx.output` flows on unchanged. A Condition with both
/// branches missing is rejected at workflow construction.
pub struct Condition {
    id: String,
    predicate: ConditionFn,
    on_true: Option<Box<Node>>,
    on_false: Option<Box<Node>>,
}

impl Condition {
    pub fn new(
        id: impl Into<String>,
        predicate: impl Fn(&ExecutionContext) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            predicate: Arc::new(predicate),
            on_true: None,
            on_false: None,
        }
    }

    /// The common case: branch on a case-insensitive substring of the
    /// current output.
    pub fn output_contains(id: impl Into<String>, needle: impl Into<String>) -> Self {
        let needle: String = needle.into();
        let needle = needle.to_lowercase();
        Self::new(id, move |ctx: &ExecutionContext| {
            ctx.output.to_lowercase().contains(&needle)
        })
    }

    pub fn with_on_true(mut self, node: impl Into<Node>) -> Self {
        self.on_true = Some(Box::new(node.into()));
        self
    }

    pub fn with_on_false(mut self, node: impl Into<Node>) -> Self {
        self.on_false = Some(Box::new(node.into()));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.on_true.is_none() && self.on_false.is_none() {
            return Err(WeftError::Config(format!(
                "Condition '{}' has no branches",
                self.id
            )));
        }
        if let Some(node) = &self.on_true {
            node.validate()?;
        }
        if let Some(node) = &self.on_false {
            node.validate()?;
        }
        Ok(())
    }

    pub(crate) async fn execute(&self, ctx: &mut ExecutionContext) -> Result<String> {
        let taken = (self.predicate)(ctx);
        debug!(condition = %self.id, branch = taken, "Condition evaluated");

        let branch = if taken { &self.on_true } else { &self.on_false };
        match branch {
            Some(node) => node.execute(ctx).await,
            None => Ok(ctx.output.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::Step;
    use std::sync::atomic::Ordering;
    use weft_test_utils::CountingAgent;

    #[tokio::test]
    async fn test_only_taken_branch_runs() {
        let yes = CountingAgent::new("yes", "took true");
        let no = CountingAgent::new("no", "took false");
        let yes_calls = yes.calls();
        let no_calls = no.calls();

        let condition = Condition::output_contains("check", "positive")
            .with_on_true(Step::new("t", yes))
            .with_on_false(Step::new("f", no));

        let mut ctx = ExecutionContext::new("a POSITIVE review");
        let out = condition.execute(&mut ctx).await.unwrap();

        assert_eq!(out, "took true");
        assert_eq!(yes_calls.load(Ordering::SeqCst), 1);
        assert_eq!(no_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_branch_passes_output_through() {
        let condition = Condition::new("check", |_| false)
            .with_on_true(Step::new("t", CountingAgent::new("yes", "x")));

        let mut ctx = ExecutionContext::new("unchanged");
        let out = condition.execute(&mut ctx).await.unwrap();

        assert_eq!(out, "unchanged");
        assert_eq!(ctx.output, "unchanged");
    }

    #[test]
    fn test_validate_rejects_branchless_condition() {
        let condition = Condition::new("empty", |_| true);
        assert!(condition.validate().is_err());
    }
}
