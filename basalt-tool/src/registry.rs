//! Process-wide tool registry (spec §4.2).

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use basalt_types::{ToolContext, ToolDescriptor, ToolError, ToolOutcome};

/// Object-safe trait every tool implementation satisfies. Any tool source —
/// a local function, an MCP server bridge, an HTTP endpoint — implements
/// this and is stored as `Arc<dyn ToolDyn>` in the registry.
pub trait ToolDyn: Send + Sync {
    /// Static description advertised to the model and the permission
    /// engine. Must be stable across calls on the same instance.
    fn descriptor(&self) -> &ToolDescriptor;

    /// Execute the tool against already-validated input.
    fn call(
        &self,
        input: serde_json::Value,
        ctx: ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<ToolOutcome, ToolError>> + Send + '_>>;
}

/// A process-wide mapping from tool name to implementation, populated at
/// startup (spec §4.2).
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolDyn>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Idempotent when a tool of the same name with an
    /// identical (by `Debug` comparison of the JSON schema and description)
    /// descriptor is already present; fails if the name is taken by a
    /// genuinely different descriptor.
    ///
    /// # Errors
    /// Returns `ToolError::InvalidInput` if `name` is already registered
    /// under a conflicting descriptor.
    pub fn register(&mut self, tool: Arc<dyn ToolDyn>) -> Result<(), ToolError> {
        let name = tool.descriptor().name.clone();
        if let Some(existing) = self.tools.get(&name) {
            if !descriptors_match(existing.descriptor(), tool.descriptor()) {
                return Err(ToolError::InvalidInput {
                    tool: name,
                    reason: "conflicting descriptor for already-registered tool".to_string(),
                });
            }
            return Ok(());
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Look up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ToolDyn>> {
        self.tools.get(name)
    }

    /// All registered tools' descriptors, in the JSON-schema shape handed
    /// to the model (`getDefinitions()`).
    pub fn definitions(&self) -> Vec<ToolDescriptor> {
        self.tools.values().map(|t| t.descriptor().clone()).collect()
    }

    /// Narrow `definitions()` to a per-session allow/deny filter. `allowed`
    /// (if present) restricts to exactly those names; `disallowed` removes
    /// names from whatever remains.
    pub fn filtered_definitions(
        &self,
        allowed: Option<&[String]>,
        disallowed: Option<&[String]>,
    ) -> Vec<ToolDescriptor> {
        self.definitions()
            .into_iter()
            .filter(|d| allowed.is_none_or(|a| a.iter().any(|n| n == &d.name)))
            .filter(|d| !disallowed.is_some_and(|dis| dis.iter().any(|n| n == &d.name)))
            .collect()
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

fn descriptors_match(a: &ToolDescriptor, b: &ToolDescriptor) -> bool {
    a.name == b.name
        && a.description == b.description
        && a.input_schema == b.input_schema
        && a.permission_class == b.permission_class
}

/// Parse a comma-separated `allowedTools`/`disallowedTools` string into a
/// list of trimmed, non-empty tool names (spec §4.2).
#[must_use]
pub fn parse_tool_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use basalt_types::PermissionClass;
    use serde_json::json;

    fn descriptor(name: &str) -> ToolDescriptor {
        ToolDescriptor {
            name: name.to_string(),
            description: "test tool".to_string(),
            input_schema: json!({"type": "object"}),
            permission_class: PermissionClass::Read,
            parallel_safe: true,
            annotations: Default::default(),
        }
    }

    struct EchoTool(ToolDescriptor);

    impl ToolDyn for EchoTool {
        fn descriptor(&self) -> &ToolDescriptor {
            &self.0
        }
        fn call(
            &self,
            input: serde_json::Value,
            _ctx: ToolContext,
        ) -> Pin<Box<dyn Future<Output = Result<ToolOutcome, ToolError>> + Send + '_>> {
            Box::pin(async move { Ok(ToolOutcome::text(input.to_string())) })
        }
    }

    #[test]
    fn register_and_get() {
        let mut reg = ToolRegistry::new();
        assert!(reg.is_empty());
        reg.register(Arc::new(EchoTool(descriptor("echo")))).unwrap();
        assert_eq!(reg.len(), 1);
        assert!(reg.get("echo").is_some());
        assert!(reg.get("missing").is_none());
    }

    #[test]
    fn register_identical_descriptor_is_idempotent() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool(descriptor("echo")))).unwrap();
        reg.register(Arc::new(EchoTool(descriptor("echo")))).unwrap();
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn register_conflicting_descriptor_fails() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool(descriptor("echo")))).unwrap();
        let mut conflicting = descriptor("echo");
        conflicting.description = "a different description".to_string();
        let err = reg.register(Arc::new(EchoTool(conflicting))).unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput { .. }));
    }

    #[test]
    fn filtered_definitions_applies_allow_then_deny() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool(descriptor("a")))).unwrap();
        reg.register(Arc::new(EchoTool(descriptor("b")))).unwrap();
        reg.register(Arc::new(EchoTool(descriptor("c")))).unwrap();

        let allowed = vec!["a".to_string(), "b".to_string()];
        let disallowed = vec!["b".to_string()];
        let defs = reg.filtered_definitions(Some(&allowed), Some(&disallowed));
        let names: Vec<&str> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a"]);
    }

    #[test]
    fn parse_tool_list_trims_and_drops_empty() {
        assert_eq!(
            parse_tool_list(" Read, Write ,,Bash"),
            vec!["Read", "Write", "Bash"]
        );
    }

    #[tokio::test]
    async fn call_invokes_tool() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool(descriptor("echo")))).unwrap();
        let tool = reg.get("echo").unwrap();
        let ctx = ToolContext::new("s1", "tu1", 1);
        let outcome = tool.call(json!({"x": 1}), ctx).await.unwrap();
        assert!(!outcome.is_error);
    }
}
