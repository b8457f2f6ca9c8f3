//! Scripted agents for exercising the workflow engine without an LLM.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;

use weft_core::error::{Result, WeftError};
use weft_core::traits::Agent;
use weft_core::types::{AgentReply, HistoryEntry};

/// Always returns the same reply, ignoring input.
pub struct ReplyAgent {
    name: String,
    reply: String,
}

impl ReplyAgent {
    pub fn new(name: impl Into<String>, reply: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reply: reply.into(),
        }
    }
}

impl Agent for ReplyAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn run<'a>(
        &'a self,
        _input: &'a str,
        _history: &'a [HistoryEntry],
    ) -> BoxFuture<'a, Result<AgentReply>> {
        Box::pin(async move { Ok(AgentReply::new(self.reply.clone())) })
    }
}

/// Applies a deterministic transform to the input.
pub struct TransformAgent {
    name: String,
    transform: Box<dyn Fn(&str) -> String + Send + Sync>,
}

impl TransformAgent {
    pub fn new(
        name: impl Into<String>,
        transform: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            transform: Box::new(transform),
        }
    }

    /// Transform that tags the input, e.g. `"b(a(x))"` after two steps.
    pub fn wrapping(name: impl Into<String>, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        Self::new(name, move |input: &str| format!("{}({})", tag, input))
    }
}

impl Agent for TransformAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn run<'a>(
        &'a self,
        input: &'a str,
        _history: &'a [HistoryEntry],
    ) -> BoxFuture<'a, Result<AgentReply>> {
        Box::pin(async move { Ok(AgentReply::new((self.transform)(input))) })
    }
}

/// Counts invocations; replies with a fixed text.
///
/// The counter is shared, so tests can assert how often (or that never)
/// a branch was taken.
pub struct CountingAgent {
    name: String,
    reply: String,
    calls: Arc<AtomicUsize>,
}

impl CountingAgent {
    pub fn new(name: impl Into<String>, reply: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reply: reply.into(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Handle to the shared call counter.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

impl Agent for CountingAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn run<'a>(
        &'a self,
        _input: &'a str,
        _history: &'a [HistoryEntry],
    ) -> BoxFuture<'a, Result<AgentReply>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(AgentReply::new(self.reply.clone()))
        })
    }
}

/// Always fails with an agent error.
pub struct FailingAgent {
    name: String,
    message: String,
}

impl FailingAgent {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl Agent for FailingAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn run<'a>(
        &'a self,
        _input: &'a str,
        _history: &'a [HistoryEntry],
    ) -> BoxFuture<'a, Result<AgentReply>> {
        Box::pin(async move {
            Err(WeftError::Agent {
                agent: self.name.clone(),
                message: self.message.clone(),
            })
        })
    }
}

/// Replies after a delay. For exercising completion-order independence.
pub struct DelayedAgent {
    name: String,
    reply: String,
    delay: Duration,
}

impl DelayedAgent {
    pub fn new(name: impl Into<String>, reply: impl Into<String>, delay: Duration) -> Self {
        Self {
            name: name.into(),
            reply: reply.into(),
            delay,
        }
    }
}

impl Agent for DelayedAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn run<'a>(
        &'a self,
        _input: &'a str,
        _history: &'a [HistoryEntry],
    ) -> BoxFuture<'a, Result<AgentReply>> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            Ok(AgentReply::new(self.reply.clone()))
        })
    }
}

/// Echoes how many history entries it was handed, e.g. `"history:3"`.
///
/// Lets tests observe exactly what replay window reached the agent.
pub struct HistoryProbeAgent {
    name: String,
}

impl HistoryProbeAgent {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Agent for HistoryProbeAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn run<'a>(
        &'a self,
        _input: &'a str,
        history: &'a [HistoryEntry],
    ) -> BoxFuture<'a, Result<AgentReply>> {
        Box::pin(async move { Ok(AgentReply::new(format!("history:{}", history.len()))) })
    }
}
