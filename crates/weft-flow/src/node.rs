use futures::future::BoxFuture;

use weft_core::error::Result;

use crate::condition::Condition;
use crate::context::ExecutionContext;
use crate::loops::Loop;
use crate::parallel::Parallel;
use crate::router::Router;
use crate::step::Step;

/// A unit of workflow control flow.
///
/// The set of variants is closed: control flow is one of exactly these
/// five shapes, and every place that handles nodes matches exhaustively,
/// so adding a variant is a compile-visible change everywhere.
///
/// Nodes are pure configuration (agent handles, predicates, children) and
/// hold no request-scoped state, so a constructed node graph is immutable
/// and safe to execute from many concurrent runs.
pub enum Node {
    /// One agent invocation.
    Step(Step),
    /// Binary branch on a predicate over the context.
    Condition(Condition),
    /// Conditional iteration over a body node.
    Loop(Loop),
    /// Concurrent fan-out over sibling nodes, joined before returning.
    Parallel(Parallel),
    /// Dynamic dispatch over a named route map.
    Router(Router),
}

impl Node {
    /// The node's stable id, used to namespace its context keys.
    pub fn id(&self) -> &str {
        match self {
            Self::Step(n) => n.id(),
            Self::Condition(n) => n.id(),
            Self::Loop(n) => n.id(),
            Self::Parallel(n) => n.id(),
            Self::Router(n) => n.id(),
        }
    }

    /// Variant name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Step(_) => "step",
            Self::Condition(_) => "condition",
            Self::Loop(_) => "loop",
            Self::Parallel(_) => "parallel",
            Self::Router(_) => "router",
        }
    }

    /// Reject misconfigured nodes before any run starts.
    pub(crate) fn validate(&self) -> Result<()> {
        match self {
            Self::Step(_) => Ok(()),
            Self::Condition(n) => n.validate(),
            Self::Loop(n) => n.validate(),
            Self::Parallel(n) => n.validate(),
            Self::Router(n) => n.validate(),
        }
    }

    /// Execute this node against the current context.
    ///
    /// Every variant rewrites `ctx.output` on success and propagates the
    /// first error it sees. Boxed because the node graph recurses.
    pub fn execute<'a>(&'a self, ctx: &'a mut ExecutionContext) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            ctx.ensure_active()?;
            match self {
                Self::Step(n) => n.execute(ctx).await,
                Self::Condition(n) => n.execute(ctx).await,
                Self::Loop(n) => n.execute(ctx).await,
                Self::Parallel(n) => n.execute(ctx).await,
                Self::Router(n) => n.execute(ctx).await,
            }
        })
    }
}

impl From<Step> for Node {
    fn from(n: Step) -> Self {
        Self::Step(n)
    }
}

impl From<Condition> for Node {
    fn from(n: Condition) -> Self {
        Self::Condition(n)
    }
}

impl From<Loop> for Node {
    fn from(n: Loop) -> Self {
        Self::Loop(n)
    }
}

impl From<Parallel> for Node {
    fn from(n: Parallel) -> Self {
        Self::Parallel(n)
    }
}

impl From<Router> for Node {
    fn from(n: Router) -> Self {
        Self::Router(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_test_utils::ReplyAgent;

    #[test]
    fn test_node_id_and_kind() {
        let node: Node = Step::new("classify", ReplyAgent::new("stub", "ok")).into();
        assert_eq!(node.id(), "classify");
        assert_eq!(node.kind(), "step");
    }

    #[tokio::test]
    async fn test_cancelled_context_stops_execution() {
        let node: Node = Step::new("s", ReplyAgent::new("stub", "ok")).into();
        let mut ctx = ExecutionContext::new("in");
        ctx.cancel_token().cancel();

        let err = node.execute(&mut ctx).await.unwrap_err();
        assert!(matches!(err, weft_core::WeftError::Cancelled));
        assert_eq!(ctx.output, "in");
    }
}
