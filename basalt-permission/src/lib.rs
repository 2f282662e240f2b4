#![deny(missing_docs)]
//! Permission engine gating every tool dispatch (spec §4.7).
//!
//! Implements `basalt_tool::PermissionGate` so `basalt-tool::dispatch` can
//! consult it directly without either crate depending on the other's
//! concrete types beyond the shared vocabulary in `basalt-types`.

use std::collections::HashSet;
use std::sync::Mutex;

use basalt_types::{PermissionClass, PermissionDecision, ToolContext, ToolDescriptor};

/// Names of the planning tools that remain available in `plan` mode
/// alongside read-class tools (spec §4.7).
const PLANNING_TOOLS: &[&str] = &["EnterPlanMode", "ExitPlanMode"];

/// Permission mode selected for a session (spec §4.7).
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionMode {
    /// Allow read-class tools; ask for write/exec/network unless accepted.
    Default,
    /// Like `Default`, but write-class file edits are auto-accepted.
    AcceptEdits,
    /// Only read-class tools and the planning tools are allowed.
    Plan,
    /// Allow everything.
    BypassPermissions,
}

impl std::fmt::Display for PermissionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Default => "default",
            Self::AcceptEdits => "acceptEdits",
            Self::Plan => "plan",
            Self::BypassPermissions => "bypassPermissions",
        };
        f.write_str(s)
    }
}

/// The user's answer to an interactive permission prompt (spec §4.7).
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserResponse {
    /// Allow this one call only.
    AllowOnce,
    /// Allow this (tool, resource) pair for the rest of the session.
    AllowForSession,
    /// Refuse this call.
    Deny,
}

/// Best-effort extraction of the resource a tool call targets, used both
/// to key the session accepted-list and to show the user what they're
/// approving (spec §4.7 "Resource extraction is per-tool").
#[must_use]
pub fn extract_resource(descriptor: &ToolDescriptor, input: &serde_json::Value) -> String {
    if let Some(path) = input.get("file_path").or_else(|| input.get("path")).and_then(|v| v.as_str()) {
        return path.to_string();
    }
    if let Some(command) = input.get("command").and_then(|v| v.as_str()) {
        return command.split_whitespace().next().unwrap_or("").to_string();
    }
    if let Some(url) = input.get("url").and_then(|v| v.as_str()) {
        return extract_host(url);
    }
    descriptor.name.clone()
}

fn extract_host(url: &str) -> String {
    let without_scheme = url.split("://").nth(1).unwrap_or(url);
    without_scheme
        .split('/')
        .next()
        .unwrap_or(without_scheme)
        .to_string()
}

/// Gate on every tool dispatch, holding the session-scoped accepted list
/// (spec §4.7). Cheap and synchronous internally; exposes an async
/// `decide` to satisfy `basalt_tool::PermissionGate`.
pub struct PermissionEngine {
    mode: PermissionMode,
    accepted: Mutex<HashSet<(String, String)>>,
}

impl PermissionEngine {
    /// Construct an engine in the given mode with an empty accepted list.
    #[must_use]
    pub fn new(mode: PermissionMode) -> Self {
        Self {
            mode,
            accepted: Mutex::new(HashSet::new()),
        }
    }

    /// The active mode.
    #[must_use]
    pub fn mode(&self) -> PermissionMode {
        self.mode
    }

    /// Record the user's answer to a prompt this engine previously
    /// returned `PermissionDecision::Ask` for.
    pub fn record_response(&self, tool_name: &str, resource: &str, response: UserResponse) {
        if response == UserResponse::AllowForSession {
            self.accepted
                .lock()
                .expect("accepted-list mutex poisoned")
                .insert((tool_name.to_string(), resource.to_string()));
        }
    }

    fn is_accepted(&self, tool_name: &str, resource: &str) -> bool {
        self.accepted
            .lock()
            .expect("accepted-list mutex poisoned")
            .contains(&(tool_name.to_string(), resource.to_string()))
    }

    /// Evaluate the permission matrix for one call, without invoking any
    /// interactive prompt (spec §4.7's mode table).
    #[must_use]
    pub fn evaluate(&self, descriptor: &ToolDescriptor, input: &serde_json::Value) -> PermissionDecision {
        if self.mode == PermissionMode::BypassPermissions {
            return PermissionDecision::Allow;
        }

        if self.mode == PermissionMode::Plan {
            let is_planning_tool = PLANNING_TOOLS.contains(&descriptor.name.as_str());
            return if descriptor.permission_class == PermissionClass::Read || is_planning_tool {
                PermissionDecision::Allow
            } else {
                PermissionDecision::Deny {
                    reason: "only read-only and planning tools are allowed in plan mode".to_string(),
                }
            };
        }

        if descriptor.permission_class == PermissionClass::Read {
            return PermissionDecision::Allow;
        }

        if self.mode == PermissionMode::AcceptEdits
            && descriptor.permission_class == PermissionClass::Write
        {
            return PermissionDecision::Allow;
        }

        let resource = extract_resource(descriptor, input);
        if self.is_accepted(&descriptor.name, &resource) {
            return PermissionDecision::Allow;
        }
        PermissionDecision::Ask
    }
}

#[async_trait::async_trait]
impl basalt_tool::PermissionGate for PermissionEngine {
    async fn decide(
        &self,
        descriptor: &ToolDescriptor,
        input: &serde_json::Value,
        _ctx: &ToolContext,
    ) -> PermissionDecision {
        self.evaluate(descriptor, input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basalt_types::ToolAnnotations;
    use serde_json::json;

    fn descriptor(name: &str, class: PermissionClass) -> ToolDescriptor {
        ToolDescriptor {
            name: name.to_string(),
            description: "d".to_string(),
            input_schema: json!({"type": "object"}),
            permission_class: class,
            parallel_safe: true,
            annotations: ToolAnnotations::default(),
        }
    }

    #[test]
    fn bypass_allows_everything() {
        let engine = PermissionEngine::new(PermissionMode::BypassPermissions);
        let d = descriptor("Bash", PermissionClass::Exec);
        assert_eq!(engine.evaluate(&d, &json!({})), PermissionDecision::Allow);
    }

    #[test]
    fn default_allows_read_and_asks_for_write() {
        let engine = PermissionEngine::new(PermissionMode::Default);
        let read = descriptor("Read", PermissionClass::Read);
        assert_eq!(engine.evaluate(&read, &json!({})), PermissionDecision::Allow);

        let write = descriptor("Write", PermissionClass::Write);
        assert_eq!(engine.evaluate(&write, &json!({"file_path": "/tmp/a"})), PermissionDecision::Ask);
    }

    #[test]
    fn accept_edits_auto_allows_write_but_still_asks_for_exec() {
        let engine = PermissionEngine::new(PermissionMode::AcceptEdits);
        let write = descriptor("Write", PermissionClass::Write);
        assert_eq!(engine.evaluate(&write, &json!({"file_path": "/tmp/a"})), PermissionDecision::Allow);

        let exec = descriptor("Bash", PermissionClass::Exec);
        assert_eq!(engine.evaluate(&exec, &json!({"command": "ls -la"})), PermissionDecision::Ask);
    }

    #[test]
    fn plan_mode_allows_only_read_and_planning_tools() {
        let engine = PermissionEngine::new(PermissionMode::Plan);
        let read = descriptor("Read", PermissionClass::Read);
        assert_eq!(engine.evaluate(&read, &json!({})), PermissionDecision::Allow);

        let plan_tool = descriptor("ExitPlanMode", PermissionClass::Write);
        assert_eq!(engine.evaluate(&plan_tool, &json!({})), PermissionDecision::Allow);

        let write = descriptor("Write", PermissionClass::Write);
        assert!(matches!(engine.evaluate(&write, &json!({})), PermissionDecision::Deny { .. }));
    }

    #[test]
    fn accepted_list_allows_after_session_approval() {
        let engine = PermissionEngine::new(PermissionMode::Default);
        let exec = descriptor("Bash", PermissionClass::Exec);
        let input = json!({"command": "npm test"});
        assert_eq!(engine.evaluate(&exec, &input), PermissionDecision::Ask);

        engine.record_response("Bash", "npm", UserResponse::AllowForSession);
        assert_eq!(engine.evaluate(&exec, &input), PermissionDecision::Allow);
    }

    #[test]
    fn allow_once_does_not_persist() {
        let engine = PermissionEngine::new(PermissionMode::Default);
        let exec = descriptor("Bash", PermissionClass::Exec);
        let input = json!({"command": "rm file"});
        engine.record_response("Bash", "rm", UserResponse::AllowOnce);
        assert_eq!(engine.evaluate(&exec, &input), PermissionDecision::Ask);
    }

    #[test]
    fn extract_resource_prefers_file_path_then_command_then_url() {
        let d = descriptor("X", PermissionClass::Write);
        assert_eq!(extract_resource(&d, &json!({"file_path": "/a/b"})), "/a/b");
        assert_eq!(extract_resource(&d, &json!({"command": "git status"})), "git");
        assert_eq!(extract_resource(&d, &json!({"url": "https://example.com/x"})), "example.com");
    }
}
