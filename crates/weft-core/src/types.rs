use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique session identifier.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_str(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One recorded past run of a workflow under a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// The input the run started from.
    pub input: String,
    /// The final output (or the error text for a failed run).
    pub output: String,
    /// When the run finished.
    pub timestamp: DateTime<Utc>,
    /// Whether the run completed successfully.
    pub success: bool,
}

impl HistoryEntry {
    /// Record a successful run.
    pub fn success(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            timestamp: Utc::now(),
            success: true,
        }
    }

    /// Record a failed run. `output` carries the error text.
    pub fn failure(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            timestamp: Utc::now(),
            success: false,
        }
    }
}

/// A session's recorded runs, ordered by append time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub runs: Vec<HistoryEntry>,
}

impl Session {
    /// An empty session for the given id.
    pub fn empty(id: SessionId) -> Self {
        Self { id, runs: vec![] }
    }

    pub fn count_runs(&self) -> usize {
        self.runs.len()
    }

    pub fn count_successful_runs(&self) -> usize {
        self.runs.iter().filter(|r| r.success).count()
    }

    pub fn count_failed_runs(&self) -> usize {
        self.runs.iter().filter(|r| !r.success).count()
    }

    /// The most recent `n` runs, oldest first. The suffix, never a sample.
    pub fn recent(&self, n: usize) -> &[HistoryEntry] {
        let start = self.runs.len().saturating_sub(n);
        &self.runs[start..]
    }
}

/// What an agent returns from one invocation.
#[derive(Debug, Clone)]
pub struct AgentReply {
    /// The textual result.
    pub output: String,
    /// Provider metadata (token counts, model id, ...). Opaque to the engine.
    pub metadata: HashMap<String, serde_json::Value>,
}

impl AgentReply {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Lifecycle of one workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_counters() {
        let mut session = Session::empty(SessionId::from_str("s1"));
        session.runs.push(HistoryEntry::success("a", "1"));
        session.runs.push(HistoryEntry::failure("b", "boom"));
        session.runs.push(HistoryEntry::success("c", "3"));

        assert_eq!(session.count_runs(), 3);
        assert_eq!(session.count_successful_runs(), 2);
        assert_eq!(session.count_failed_runs(), 1);
    }

    #[test]
    fn test_recent_takes_suffix() {
        let mut session = Session::empty(SessionId::from_str("s1"));
        for i in 0..7 {
            session.runs.push(HistoryEntry::success(
                format!("in-{}", i),
                format!("out-{}", i),
            ));
        }

        let recent = session.recent(5);
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].input, "in-2");
        assert_eq!(recent[4].input, "in-6");
    }

    #[test]
    fn test_recent_larger_than_history() {
        let mut session = Session::empty(SessionId::from_str("s1"));
        session.runs.push(HistoryEntry::success("a", "1"));

        assert_eq!(session.recent(10).len(), 1);
        assert!(Session::empty(SessionId::new()).recent(3).is_empty());
    }

    #[test]
    fn test_agent_reply_metadata() {
        let reply = AgentReply::new("hello").with_metadata("tokens", serde_json::json!(12));
        assert_eq!(reply.output, "hello");
        assert_eq!(reply.metadata.get("tokens"), Some(&serde_json::json!(12)));
    }

    #[test]
    fn test_history_entry_serialization_roundtrip() {
        let entry = HistoryEntry::success("question", "answer");
        let json = serde_json::to_string(&entry).unwrap();
        let parsed: HistoryEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.input, "question");
        assert_eq!(parsed.output, "answer");
        assert!(parsed.success);
    }
}
