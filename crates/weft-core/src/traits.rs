use futures::future::BoxFuture;

use crate::error::Result;
use crate::types::{AgentReply, HistoryEntry, Session, SessionId};

/// An LLM-backed capability: text in, text out.
///
/// The engine never looks inside: prompt construction, tool calls, and
/// retries all live behind this boundary. `history` is the replayed prior
/// runs for the session, oldest first; empty when history is disabled or
/// not shared with agents.
pub trait Agent: Send + Sync + 'static {
    /// Name used in diagnostics and error messages.
    fn name(&self) -> &str;

    /// Run the agent on `input`, optionally informed by prior runs.
    fn run<'a>(
        &'a self,
        input: &'a str,
        history: &'a [HistoryEntry],
    ) -> BoxFuture<'a, Result<AgentReply>>;
}

/// Persistence of past runs, keyed by session id.
///
/// Implementations must make concurrent `append_run` / `get_session` calls
/// for the same session safe, without serializing unrelated sessions.
pub trait HistoryStore: Send + Sync + 'static {
    /// Fetch a session's recorded runs. Unknown ids yield an empty session;
    /// sessions are created lazily on first append.
    fn get_session<'a>(&'a self, id: &'a SessionId) -> BoxFuture<'a, Result<Session>>;

    /// Append one run to a session, creating the session if needed.
    fn append_run<'a>(
        &'a self,
        id: &'a SessionId,
        entry: HistoryEntry,
    ) -> BoxFuture<'a, Result<()>>;
}
