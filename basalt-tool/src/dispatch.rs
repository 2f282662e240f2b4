//! Dispatch of a single `tool_use` block (spec §4.2's five-step algorithm).

use basalt_types::{PermissionDecision, ToolContext, ToolDescriptor, ToolOutcome, ToolOutputContent};

use crate::registry::ToolRegistry;

/// Default cap, in characters, on a single tool result before truncation
/// (spec §4.2).
pub const DEFAULT_OUTPUT_CAP: usize = 30_000;

/// Consulted before invoking a tool's handler (spec §4.2 step 3, §4.7).
/// Implemented by `basalt-permission`'s engine; kept as a trait here so
/// `basalt-tool` has no dependency on the permission crate.
#[async_trait::async_trait]
pub trait PermissionGate: Send + Sync {
    /// Decide whether this call may proceed.
    async fn decide(
        &self,
        descriptor: &ToolDescriptor,
        input: &serde_json::Value,
        ctx: &ToolContext,
    ) -> PermissionDecision;
}

/// A `PermissionGate` that allows everything, for tests and
/// `bypassPermissions` mode.
pub struct AllowAll;

#[async_trait::async_trait]
impl PermissionGate for AllowAll {
    async fn decide(
        &self,
        _descriptor: &ToolDescriptor,
        _input: &serde_json::Value,
        _ctx: &ToolContext,
    ) -> PermissionDecision {
        PermissionDecision::Allow
    }
}

/// Why dispatch produced an error outcome, mirroring the `kind` field of
/// spec §4.2's `Error{kind}` tool_result shape.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No tool registered under the requested name.
    UnknownTool,
    /// Input failed JSON-schema validation.
    InvalidInput,
    /// The permission engine denied (or the ask timed out on) this call.
    PermissionDenied,
    /// The tool's handler returned an error or panicked.
    ExecutionFailed,
    /// The call was cancelled before completion.
    Cancelled,
}

/// Dispatch one `tool_use` block end-to-end: resolve, validate, gate,
/// invoke, and marshal (clamping oversize output). Never returns `Err` —
/// every failure mode becomes an error `ToolOutcome` so the caller always
/// has a `tool_result` to append to the transcript.
pub async fn dispatch(
    registry: &ToolRegistry,
    gate: &dyn PermissionGate,
    name: &str,
    input: serde_json::Value,
    ctx: ToolContext,
    output_cap: usize,
) -> (ToolOutcome, Option<ErrorKind>) {
    let Some(tool) = registry.get(name) else {
        return (
            ToolOutcome::error(format!("unknown tool: {name}")),
            Some(ErrorKind::UnknownTool),
        );
    };
    let descriptor = tool.descriptor();

    if let Err(reason) = validate_input(&descriptor.input_schema, &input) {
        return (
            ToolOutcome::error(format!("invalid input for {name}: {reason}")),
            Some(ErrorKind::InvalidInput),
        );
    }

    match gate.decide(descriptor, &input, &ctx).await {
        PermissionDecision::Allow => {}
        PermissionDecision::Deny { reason } => {
            return (
                ToolOutcome::error(format!("permission denied: {reason}")),
                Some(ErrorKind::PermissionDenied),
            );
        }
        // An unanswered interactive prompt is treated the same as a deny
        // (spec §4.2 step 3: "on timeout of the ask, treat as deny").
        PermissionDecision::Ask => {
            return (
                ToolOutcome::error("permission denied: no interactive prompt available"),
                Some(ErrorKind::PermissionDenied),
            );
        }
    }

    if ctx.cancellation.is_cancelled() {
        return (ToolOutcome::error("cancelled"), Some(ErrorKind::Cancelled));
    }

    let result = tool.call(input, ctx).await;
    match result {
        Ok(outcome) => (clamp_output(outcome, output_cap), None),
        Err(err) => (
            ToolOutcome::error(err.to_string()),
            Some(ErrorKind::ExecutionFailed),
        ),
    }
}

fn validate_input(schema: &serde_json::Value, input: &serde_json::Value) -> Result<(), String> {
    let compiled = jsonschema::JSONSchema::compile(schema)
        .map_err(|e| format!("invalid tool schema: {e}"))?;
    let errors: Vec<String> = compiled
        .validate(input)
        .err()
        .into_iter()
        .flatten()
        .map(|e| e.to_string())
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join("; "))
    }
}

fn clamp_output(mut outcome: ToolOutcome, cap: usize) -> ToolOutcome {
    let total_len: usize = outcome
        .content
        .iter()
        .map(|c| match c {
            ToolOutputContent::Text { text } => text.len(),
            ToolOutputContent::Image { .. } => 0,
        })
        .sum();
    if total_len <= cap {
        return outcome;
    }

    let mut remaining = cap;
    for item in &mut outcome.content {
        if let ToolOutputContent::Text { text } = item {
            if text.len() > remaining {
                let omitted = text.len() - remaining;
                let boundary = floor_char_boundary(text, remaining);
                text.truncate(boundary);
                text.push_str(&format!("\n…[truncated, {omitted} bytes omitted]"));
                remaining = 0;
            } else {
                remaining -= text.len();
            }
        }
    }
    outcome.truncated = true;
    outcome
}

fn floor_char_boundary(s: &str, index: usize) -> usize {
    let mut i = index.min(s.len());
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ToolDyn;
    use basalt_types::{PermissionClass, ToolError};
    use serde_json::json;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Arc;

    struct GreetTool(ToolDescriptor);

    impl ToolDyn for GreetTool {
        fn descriptor(&self) -> &ToolDescriptor {
            &self.0
        }
        fn call(
            &self,
            input: serde_json::Value,
            _ctx: ToolContext,
        ) -> Pin<Box<dyn Future<Output = Result<ToolOutcome, ToolError>> + Send + '_>> {
            Box::pin(async move {
                let name = input["name"].as_str().unwrap_or("world").to_string();
                Ok(ToolOutcome::text(format!("hello, {name}")))
            })
        }
    }

    fn registry_with_greet() -> ToolRegistry {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(GreetTool(ToolDescriptor {
            name: "greet".to_string(),
            description: "says hello".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {"name": {"type": "string"}},
                "required": ["name"]
            }),
            permission_class: PermissionClass::Read,
            parallel_safe: true,
            annotations: Default::default(),
        })))
        .unwrap();
        reg
    }

    #[tokio::test]
    async fn unknown_tool_produces_unknown_tool_error() {
        let reg = ToolRegistry::new();
        let (outcome, kind) = dispatch(
            &reg,
            &AllowAll,
            "missing",
            json!({}),
            ToolContext::new("s", "t", 1),
            DEFAULT_OUTPUT_CAP,
        )
        .await;
        assert!(outcome.is_error);
        assert_eq!(kind, Some(ErrorKind::UnknownTool));
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_invocation() {
        let reg = registry_with_greet();
        let (outcome, kind) = dispatch(
            &reg,
            &AllowAll,
            "greet",
            json!({}),
            ToolContext::new("s", "t", 1),
            DEFAULT_OUTPUT_CAP,
        )
        .await;
        assert!(outcome.is_error);
        assert_eq!(kind, Some(ErrorKind::InvalidInput));
    }

    #[tokio::test]
    async fn valid_call_succeeds() {
        let reg = registry_with_greet();
        let (outcome, kind) = dispatch(
            &reg,
            &AllowAll,
            "greet",
            json!({"name": "ada"}),
            ToolContext::new("s", "t", 1),
            DEFAULT_OUTPUT_CAP,
        )
        .await;
        assert!(!outcome.is_error);
        assert_eq!(kind, None);
        assert_eq!(outcome.as_plain_text(), "hello, ada");
    }

    struct DenyAll;

    #[async_trait::async_trait]
    impl PermissionGate for DenyAll {
        async fn decide(
            &self,
            _descriptor: &ToolDescriptor,
            _input: &serde_json::Value,
            _ctx: &ToolContext,
        ) -> PermissionDecision {
            PermissionDecision::Deny {
                reason: "no".to_string(),
            }
        }
    }

    #[tokio::test]
    async fn denied_permission_short_circuits_invocation() {
        let reg = registry_with_greet();
        let (outcome, kind) = dispatch(
            &reg,
            &DenyAll,
            "greet",
            json!({"name": "ada"}),
            ToolContext::new("s", "t", 1),
            DEFAULT_OUTPUT_CAP,
        )
        .await;
        assert!(outcome.is_error);
        assert_eq!(kind, Some(ErrorKind::PermissionDenied));
    }

    #[test]
    fn clamp_output_truncates_oversize_text() {
        let outcome = ToolOutcome::text("a".repeat(100));
        let clamped = clamp_output(outcome, 10);
        assert!(clamped.truncated);
        assert!(clamped.as_plain_text().starts_with("aaaaaaaaaa"));
        assert!(clamped.as_plain_text().contains("truncated"));
    }

    #[test]
    fn clamp_output_leaves_small_output_untouched() {
        let outcome = ToolOutcome::text("small");
        let clamped = clamp_output(outcome, 100);
        assert!(!clamped.truncated);
        assert_eq!(clamped.as_plain_text(), "small");
    }
}
