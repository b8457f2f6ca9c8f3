use std::sync::Arc;

use tracing::debug;

use weft_core::error::Result;

use crate::context::ExecutionContext;
use crate::node::Node;

/// Predicate over the current context and the iteration about to run.
pub type LoopConditionFn = Arc<dyn Fn(&ExecutionContext, usize) -> bool + Send + Sync>;

/// Conditional iteration node.
///
/// The predicate is checked before every pass with the current iteration
/// count (starting at 0). While it holds, the body runs once, its output
/// rewrites `ctx.output`, and `loop_<id>_iterations` is updated in the
/// context. The loop stops when the predicate returns false or the body
/// errors; a body error aborts the whole workflow.
///
/// The engine imposes no iteration ceiling: an unbounded predicate loops
/// forever. Callers who cannot prove a bound should layer one on with
/// [`Loop::capped`].
pub struct Loop {
    id: String,
    body: Box<Node>,
    condition: LoopConditionFn,
}

impl Loop {
    pub fn new(
        id: impl Into<String>,
        body: impl Into<Node>,
        condition: impl Fn(&ExecutionContext, usize) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            body: Box::new(body.into()),
            condition: Arc::new(condition),
        }
    }

    /// Run the body a fixed number of times.
    pub fn times(id: impl Into<String>, body: impl Into<Node>, count: usize) -> Self {
        Self::new(id, body, move |_ctx, iteration| iteration < count)
    }

    /// Layer a hard iteration ceiling over the existing predicate.
    pub fn capped(mut self, max: usize) -> Self {
        let inner = self.condition.clone();
        self.condition = Arc::new(move |ctx, iteration| iteration < max && inner(ctx, iteration));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn validate(&self) -> Result<()> {
        self.body.validate()
    }

    pub(crate) async fn execute(&self, ctx: &mut ExecutionContext) -> Result<String> {
        let key = format!("loop_{}_iterations", self.id);
        let mut iteration = 0usize;

        while (self.condition)(ctx, iteration) {
            ctx.ensure_active()?;
            debug!(loop_id = %self.id, iteration, "Loop iteration");

            self.body.execute(ctx).await?;
            iteration += 1;
            ctx.set(key.clone(), serde_json::json!(iteration));
        }

        debug!(loop_id = %self.id, iterations = iteration, "Loop complete");
        Ok(ctx.output.clone())
    }
}
