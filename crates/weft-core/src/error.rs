use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeftError {
    // Agent errors
    #[error("Agent '{agent}' failed: {message}")]
    Agent { agent: String, message: String },

    // Workflow errors
    #[error("Workflow config error: {0}")]
    Config(String),

    #[error("No route registered for label '{label}' in router '{router}'")]
    RouteNotFound { router: String, label: String },

    #[error("Parallel node '{node}': {failed} of {total} branches failed: {first_error}")]
    ParallelBranch {
        node: String,
        failed: usize,
        total: usize,
        first_error: String,
    },

    #[error("Workflow run cancelled")]
    Cancelled,

    // Storage errors
    #[error("History store error: {0}")]
    Storage(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WeftError>;
