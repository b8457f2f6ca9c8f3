//! Workflow Engine — multi-step agent pipelines with control flow.
//!
//! A workflow is an ordered list of `Node`s executed against a per-run
//! `ExecutionContext`. Five node variants cover the control flow:
//! `Step` (one agent call), `Condition` (binary branch), `Loop` (bounded
//! or conditional iteration), `Parallel` (concurrent fan-out/fan-in),
//! and `Router` (dynamic dispatch over named routes).
//!
//! `Workflow::run` threads the context's `output` from one node to the
//! next and, when a session id is supplied and history is enabled,
//! replays the most recent prior runs into the context before the first
//! node executes.

pub mod condition;
pub mod context;
pub mod loops;
pub mod node;
pub mod parallel;
pub mod router;
pub mod step;
pub mod workflow;

pub use condition::Condition;
pub use context::ExecutionContext;
pub use loops::Loop;
pub use node::Node;
pub use parallel::Parallel;
pub use router::Router;
pub use step::Step;
pub use workflow::{RunResult, Workflow, WorkflowConfig};
