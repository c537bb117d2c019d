use axum::http::StatusCode;
use thiserror::Error;

/// Everything that can go wrong between accepting a task request and
/// producing its result envelope. All variants are caught at the
/// orchestrator boundary and converted to an error envelope; nothing here
/// escapes as an unhandled fault.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Missing or malformed required input. Rejected before any resource
    /// is acquired.
    #[error("{0}")]
    InvalidRequest(String),

    /// The requested task kind is not one of the known strategies.
    #[error("Task '{0}' not found.")]
    UnknownTask(String),

    /// The browser process failed to start.
    #[error("browser session failed to start: {0}")]
    SessionLaunch(String),

    /// The page did not finish loading within the task's budget.
    #[error("navigation timed out: {0}")]
    NavigationTimeout(String),

    /// A scripted step's selector never appeared within its deadline.
    #[error("selector wait timed out: {0}")]
    SelectorTimeout(String),

    /// A scripted step carried a kind this executor does not know.
    #[error("unknown step type '{0}'")]
    UnknownStepType(String),

    /// The scheduled-actions config is absent or not a usable step list.
    #[error("invalid action config: {0}")]
    InvalidActionConfig(String),

    /// An artifact upload was rejected or unreachable.
    #[error("artifact upload failed: {0}")]
    StorageWrite(String),

    /// The external performance-audit capability failed.
    #[error("performance audit failed: {0}")]
    AuditCapability(String),

    /// Catch-all for anything unanticipated raised inside a strategy.
    #[error("{0}")]
    Execution(String),
}

impl TaskError {
    /// HTTP status class for this error: 400 for malformed input, 404 for
    /// an unknown task, 500 for everything that failed during execution.
    pub fn status_code(&self) -> StatusCode {
        match self {
            TaskError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            TaskError::UnknownTask(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
