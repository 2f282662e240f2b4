//! Per-concern error enums (spec §7), plus the umbrella `LoopError` that
//! collects them via `#[from]`.

use thiserror::Error;

/// Severity of a non-fatal condition surfaced alongside a result (spec §7's
/// `degraded` signal and similar soft failures).
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Worth surfacing to the user but did not block progress.
    Warning,
    /// Blocked the current operation; the caller must decide how to recover.
    Error,
}

/// Errors from a model provider call.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport-level failure; retryable.
    #[error("network error: {0}")]
    Network(String),
    /// Provider rate-limited the request; retryable after the given delay.
    #[error("rate limited, retry after {retry_after_secs:?}s")]
    RateLimit {
        /// Seconds to wait before retrying, if the provider specified one.
        retry_after_secs: Option<u64>,
    },
    /// Model is warming up or otherwise temporarily unavailable; retryable.
    #[error("model loading")]
    ModelLoading,
    /// Request timed out; retryable.
    #[error("request timed out")]
    Timeout,
    /// Provider reported an outage; retryable.
    #[error("service unavailable")]
    ServiceUnavailable,
    /// Credentials rejected; terminal.
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// Request was malformed in a way a retry cannot fix; terminal.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Requested model does not exist; terminal.
    #[error("model not found: {0}")]
    ModelNotFound(String),
    /// Provider rejected due to account-level resource limits; terminal.
    #[error("insufficient resources: {0}")]
    InsufficientResources(String),
    /// Error while decoding the streamed response body.
    #[error("stream error: {0}")]
    Stream(#[from] StreamError),
    /// Anything else.
    #[error("provider error: {0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ProviderError {
    /// Whether the agent loop should retry this call with backoff.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_)
                | Self::RateLimit { .. }
                | Self::ModelLoading
                | Self::Timeout
                | Self::ServiceUnavailable
        )
    }
}

/// Errors from the SSE stream decoder.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StreamError {
    /// The byte stream was not valid UTF-8 at an event boundary.
    #[error("invalid utf-8 in stream")]
    InvalidUtf8,
    /// An SSE event's `data:` payload was not valid JSON.
    #[error("malformed event payload: {0}")]
    MalformedEvent(String),
    /// The provider's `error` event carried a structured error body.
    #[error("provider reported stream error: {0}")]
    ProviderReported(String),
    /// The underlying transport ended before a terminal event was seen.
    #[error("stream ended unexpectedly")]
    UnexpectedEof,
}

/// Errors from tool lookup/validation/execution.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ToolError {
    /// No tool registered under this name.
    #[error("tool not found: {0}")]
    NotFound(String),
    /// Input failed JSON-schema validation.
    #[error("invalid input for tool {tool}: {reason}")]
    InvalidInput {
        /// Tool name.
        tool: String,
        /// Validation failure description.
        reason: String,
    },
    /// The tool ran but failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
    /// The permission engine denied this call.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// Execution was cancelled before completion.
    #[error("tool call cancelled")]
    Cancelled,
    /// The tool asks the loop to retry the call with the given guidance fed
    /// back to the model instead of treating this as a hard failure.
    #[error("tool requested retry: {0}")]
    ModelRetry(String),
}

/// Errors from context compression strategies.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ContextError {
    /// A compression stage failed to produce a valid result.
    #[error("compaction failed: {0}")]
    CompactionFailed(String),
    /// Summarization required a provider call, which failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Errors from the permission engine.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum PermissionError {
    /// The tool's declared permission class has no handling in this mode.
    #[error("unhandled permission class {class:?} in mode {mode}")]
    UnhandledClass {
        /// The permission class that had no matching rule.
        class: crate::PermissionClass,
        /// The active permission mode's name.
        mode: String,
    },
    /// The user's interactive prompt was cancelled or dismissed.
    #[error("permission prompt dismissed")]
    PromptDismissed,
}

/// Errors from session persistence.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StorageError {
    /// No session exists under the requested id.
    #[error("session not found: {0}")]
    NotFound(String),
    /// The on-disk JSON failed to (de)serialize.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Filesystem I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Anything else.
    #[error("storage error: {0}")]
    Other(String),
}

/// Errors surfaced while resolving layered configuration.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config source failed schema validation.
    #[error("invalid config in {source}: {reason}")]
    InvalidSource {
        /// Which layer failed (`"global"`, `"project"`, `"env"`, ...).
        source: String,
        /// Validation failure description.
        reason: String,
    },
    /// Failed to read or parse a config file.
    #[error("failed to read config file {path}: {reason}")]
    ReadFailed {
        /// Path that failed to load.
        path: String,
        /// Underlying failure description.
        reason: String,
    },
    /// An MCP server entry had an invalid shape.
    #[error("invalid mcp server entry {name}: {reason}")]
    InvalidMcpEntry {
        /// The server's configured name.
        name: String,
        /// Validation failure description.
        reason: String,
    },
}

/// The umbrella error the top-level agent loop returns, collecting every
/// other per-concern error via `#[from]` (spec §7.1 ambient shape).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum LoopError {
    /// A provider call failed terminally.
    #[error(transparent)]
    Provider(#[from] ProviderError),
    /// A tool call failed terminally.
    #[error(transparent)]
    Tool(#[from] ToolError),
    /// Context compression failed terminally.
    #[error(transparent)]
    Context(#[from] ContextError),
    /// The permission engine failed terminally.
    #[error(transparent)]
    Permission(#[from] PermissionError),
    /// Session persistence failed terminally.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// The turn budget (`max_turns`) was exhausted.
    #[error("max turns ({0}) exceeded")]
    MaxTurns(usize),
    /// A configured usage limit was exceeded mid-run.
    #[error("usage limit exceeded: {0}")]
    UsageLimitExceeded(String),
    /// A hook halted the run.
    #[error("halted by hook: {0}")]
    HookTerminated(String),
    /// The run was cancelled cooperatively.
    #[error("cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_retryable_classification() {
        assert!(ProviderError::Timeout.is_retryable());
        assert!(ProviderError::RateLimit { retry_after_secs: Some(5) }.is_retryable());
        assert!(!ProviderError::Authentication("bad key".into()).is_retryable());
        assert!(!ProviderError::ModelNotFound("claude-x".into()).is_retryable());
    }

    #[test]
    fn loop_error_wraps_provider_error_via_from() {
        let err: LoopError = ProviderError::Timeout.into();
        assert!(matches!(err, LoopError::Provider(ProviderError::Timeout)));
    }

    #[test]
    fn context_error_wraps_provider_error() {
        let err: ContextError = ProviderError::ModelLoading.into();
        assert!(matches!(err, ContextError::Provider(ProviderError::ModelLoading)));
    }
}
