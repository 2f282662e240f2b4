//! The resolved, typed configuration shape (spec §4.6).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::mcp::McpServerConfig;

/// Effective configuration after merging every layer.
///
/// Fields default to the values in [`Config::defaults`] when absent from
/// every layer, so a completely empty merged document still parses.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Model id to request completions from.
    #[serde(default = "default_model")]
    pub model: String,
    /// Whether the session store autosaves after every turn. The legacy
    /// name `autoSave` is mapped onto this field by the migration pass.
    #[serde(rename = "enableAutoSave", default = "default_true")]
    pub enable_auto_save: bool,
    /// Cap on output tokens per completion request.
    #[serde(rename = "maxOutputTokens", default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    /// Maximum agent-loop turns before the run halts.
    #[serde(rename = "maxTurns", default = "default_max_turns")]
    pub max_turns: usize,
    /// Permission mode name (`"default"`, `"acceptEdits"`, `"plan"`,
    /// `"bypassPermissions"`).
    #[serde(rename = "permissionMode", default = "default_permission_mode")]
    pub permission_mode: String,
    /// Whether to route completions through Amazon Bedrock instead of the
    /// Anthropic API directly.
    #[serde(rename = "useBedrock", default)]
    pub use_bedrock: bool,
    /// Whether telemetry reporting is disabled.
    #[serde(rename = "disableTelemetry", default)]
    pub disable_telemetry: bool,
    /// MCP server definitions, keyed by server name.
    #[serde(rename = "mcpServers", default)]
    pub mcp_servers: BTreeMap<String, McpServerConfig>,
    /// Schema version stamped by the migration pass.
    #[serde(rename = "configVersion", default = "default_config_version")]
    pub config_version: u32,
}

fn default_model() -> String {
    "claude-sonnet-4-5".to_string()
}

fn default_max_output_tokens() -> u32 {
    8192
}

fn default_max_turns() -> usize {
    100
}

fn default_permission_mode() -> String {
    "default".to_string()
}

fn default_config_version() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Hardcoded defaults, the lowest-precedence layer (spec §4.6).
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            model: default_model(),
            enable_auto_save: true,
            max_output_tokens: default_max_output_tokens(),
            max_turns: default_max_turns(),
            permission_mode: default_permission_mode(),
            use_bedrock: false,
            disable_telemetry: false,
            mcp_servers: BTreeMap::new(),
            config_version: default_config_version(),
        }
    }

    /// Serialize the defaults to a `serde_json::Value`, used as the base
    /// layer of the merge chain.
    #[must_use]
    pub fn defaults_value() -> serde_json::Value {
        serde_json::to_value(Self::defaults()).expect("defaults always serialize")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_value() {
        let value = Config::defaults_value();
        let config: Config = serde_json::from_value(value).unwrap();
        assert_eq!(config.model, "claude-sonnet-4-5");
        assert_eq!(config.max_turns, 100);
    }
}
