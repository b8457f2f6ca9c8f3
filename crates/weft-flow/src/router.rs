use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use weft_core::error::{Result, WeftError};

use crate::context::ExecutionContext;
use crate::node::Node;

/// Label selector over the current context.
pub type RouteSelectorFn = Arc<dyn Fn(&ExecutionContext) -> String + Send + Sync>;

/// Dynamic dispatch node.
///
/// Evaluates the selector against the current context and executes the
/// node registered under the returned label. Exactly one route runs;
/// there is no fan-out. A label with no registered route is a run
/// failure, never a silent skip. An empty route map is rejected at
/// workflow construction.
pub struct Router {
    id: String,
    selector: RouteSelectorFn,
    routes: HashMap<String, Node>,
}

impl Router {
    pub fn new(
        id: impl Into<String>,
        selector: impl Fn(&ExecutionContext) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            selector: Arc::new(selector),
            routes: HashMap::new(),
        }
    }

    pub fn with_route(mut self, label: impl Into<String>, node: impl Into<Node>) -> Self {
        self.routes.insert(label.into(), node.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Registered route labels, unordered.
    pub fn labels(&self) -> Vec<&str> {
        self.routes.keys().map(String::as_str).collect()
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.routes.is_empty() {
            return Err(WeftError::Config(format!(
                "Router '{}' has no routes",
                self.id
            )));
        }
        for node in self.routes.values() {
            node.validate()?;
        }
        Ok(())
    }

    pub(crate) async fn execute(&self, ctx: &mut ExecutionContext) -> Result<String> {
        let label = (self.selector)(ctx);
        debug!(router = %self.id, label = %label, "Routing");

        match self.routes.get(&label) {
            Some(node) => node.execute(ctx).await,
            None => Err(WeftError::RouteNotFound {
                router: self.id.clone(),
                label,
            }),
        }
    }
}
