//! Tool descriptors, execution context, and results (spec §3, §4.2).

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The coarse permission category a tool call falls into (spec §4.7).
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionClass {
    /// Reads filesystem or external state without mutating it.
    Read,
    /// Mutates filesystem or external state.
    Write,
    /// Executes an external process.
    Exec,
    /// Performs network I/O.
    Network,
}

/// Behavioral hints a tool declares about itself, mirroring the MCP
/// annotation shape (spec §3.1 supplement).
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ToolAnnotations {
    /// The tool only reads; never mutates state.
    #[serde(default)]
    pub read_only_hint: bool,
    /// The tool may irreversibly destroy data.
    #[serde(default)]
    pub destructive_hint: bool,
    /// Calling the tool twice with the same input has no additional effect.
    #[serde(default)]
    pub idempotent_hint: bool,
    /// The tool interacts with state outside the agent's sandbox.
    #[serde(default)]
    pub open_world_hint: bool,
}

/// A tool's static description, as advertised to the model and the
/// permission engine (spec §3).
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique tool name.
    pub name: String,
    /// Human/model-facing description.
    pub description: String,
    /// JSON Schema the tool's input must satisfy.
    pub input_schema: serde_json::Value,
    /// Permission class this tool's calls are gated under.
    pub permission_class: PermissionClass,
    /// Whether concurrent calls to this tool (and others marked
    /// `parallel_safe`) may be dispatched without waiting for one another.
    #[serde(default)]
    pub parallel_safe: bool,
    /// Behavioral annotations.
    #[serde(default)]
    pub annotations: ToolAnnotations,
}

/// Everything a tool implementation needs beyond its parsed input: the
/// session and turn identity, a cancellation signal, and an elapsed-time
/// budget (spec §4.2's `ctx`).
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Id of the session this call belongs to.
    pub session_id: String,
    /// Opaque id of the `tool_use` block being answered.
    pub tool_use_id: String,
    /// 1-based index of the turn this call occurs in.
    pub turn_index: usize,
    /// Cooperative cancellation signal.
    pub cancellation: tokio_util::sync::CancellationToken,
    /// Soft wall-clock budget for this call, if the embedder configured one.
    pub timeout: Option<Duration>,
}

impl ToolContext {
    /// Construct a context with no timeout and a fresh cancellation token.
    #[must_use]
    pub fn new(session_id: impl Into<String>, tool_use_id: impl Into<String>, turn_index: usize) -> Self {
        Self {
            session_id: session_id.into(),
            tool_use_id: tool_use_id.into(),
            turn_index,
            cancellation: tokio_util::sync::CancellationToken::new(),
            timeout: None,
        }
    }

    /// Builder: attach a timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Non-text output a tool may attach alongside its primary text result
/// (mirrors `ToolResultItem`, reused here for the dispatch-facing shape).
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolOutputContent {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
    /// An image.
    Image {
        /// MIME type.
        media_type: String,
        /// Base64-encoded bytes.
        data: String,
    },
}

/// The permission engine's verdict for a single tool call (spec §4.7).
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionDecision {
    /// The call may proceed.
    Allow,
    /// The call is refused outright.
    Deny {
        /// Why the call was denied, surfaced to the model as the tool_result.
        reason: String,
    },
    /// An interactive mode must prompt the user before proceeding. Callers
    /// that cannot prompt (e.g. a headless run) should treat this the same
    /// as a timed-out prompt: a deny.
    Ask,
}

/// The result of dispatching a single tool call, before it is marshalled
/// into a `tool_result` content block (spec §4.2).
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    /// Rendered output content, in order.
    pub content: Vec<ToolOutputContent>,
    /// Whether this outcome represents an error.
    pub is_error: bool,
    /// Set when the output was truncated to fit the per-result cap.
    pub truncated: bool,
}

impl ToolOutcome {
    /// Construct a successful, untruncated plain-text outcome.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolOutputContent::Text { text: text.into() }],
            is_error: false,
            truncated: false,
        }
    }

    /// Construct an error outcome with a plain-text message.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolOutputContent::Text { text: message.into() }],
            is_error: true,
            truncated: false,
        }
    }

    /// Best-effort plain-text rendering of this outcome's content.
    #[must_use]
    pub fn as_plain_text(&self) -> String {
        self.content
            .iter()
            .map(|item| match item {
                ToolOutputContent::Text { text } => text.clone(),
                ToolOutputContent::Image { .. } => "[image]".to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_context_builder_sets_timeout() {
        let ctx = ToolContext::new("sess-1", "tu-1", 3).with_timeout(Duration::from_secs(30));
        assert_eq!(ctx.session_id, "sess-1");
        assert_eq!(ctx.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn tool_outcome_error_sets_is_error() {
        let outcome = ToolOutcome::error("boom");
        assert!(outcome.is_error);
        assert_eq!(outcome.as_plain_text(), "boom");
    }

    #[test]
    fn permission_class_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(PermissionClass::Exec).unwrap(),
            serde_json::json!("exec")
        );
    }
}
