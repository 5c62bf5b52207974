use thiserror::Error;

/// Closed error taxonomy (spec.md §7). `InvalidInput` and `ArchitectureViolation`
/// are the only variants that propagate to the top level; everything else is
/// caught at the Tool Runner boundary and folded into a `ToolOutcome` instead.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("architecture violation: {0}")]
    ArchitectureViolation(String),

    #[error("tool not installed: {0}")]
    ToolNotInstalled(String),

    #[error("tool timed out after {timeout_s}s: {tool}")]
    ToolTimeout { tool: String, timeout_s: u32 },

    #[error("tool execution error ({reason:?}): {tool}")]
    ToolExecutionError { tool: String, reason: FailureReason },

    #[error("failed to parse output of {tool}: {detail}")]
    ParseFailure { tool: String, detail: String },

    #[error("runtime budget exhausted")]
    BudgetExhausted,

    #[error("target unreachable: {0}")]
    TargetUnreachable(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Closed enum for `EXECUTION_ERROR` outcomes (spec.md §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    ToolNotInstalled,
    PermissionDenied,
    TargetUnreachable,
    InvalidArguments,
    RemoteError,
    UnknownError,
}
