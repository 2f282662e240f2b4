//! MCP server entry shape validation (spec §4.6, §6) — shape only, no
//! transport is implemented here.

use basalt_types::ConfigError;
use serde::{Deserialize, Serialize};

/// One MCP server definition as it appears under `mcpServers` in config.
///
/// Deliberately permissive: all transport-specific fields are optional at
/// the type level so a malformed entry still deserializes, then
/// [`validate_mcp_servers`] reports the shape mismatch as a
/// `ConfigError::InvalidMcpEntry` rather than failing the whole config
/// parse.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerConfig {
    /// Transport kind: `"stdio"`, `"sse"`, or `"http"`.
    #[serde(rename = "type")]
    pub transport: String,
    /// Command to launch, required for `stdio`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Arguments passed to `command`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    /// Environment variables set for the launched process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<std::collections::BTreeMap<String, String>>,
    /// Endpoint URL, required for `sse`/`http`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Request headers, for `sse`/`http`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<std::collections::BTreeMap<String, String>>,
}

/// Validate every MCP server entry's shape against its declared transport
/// (spec §4.6: `stdio` requires `command`; `http`/`sse` requires `url`).
///
/// # Errors
/// Returns the first `ConfigError::InvalidMcpEntry` encountered.
pub fn validate_mcp_servers(
    servers: &std::collections::BTreeMap<String, McpServerConfig>,
) -> Result<(), ConfigError> {
    for (name, entry) in servers {
        match entry.transport.as_str() {
            "stdio" => {
                if entry.command.is_none() {
                    return Err(ConfigError::InvalidMcpEntry {
                        name: name.clone(),
                        reason: "stdio transport requires \"command\"".to_string(),
                    });
                }
            }
            "http" | "sse" => {
                if entry.url.is_none() {
                    return Err(ConfigError::InvalidMcpEntry {
                        name: name.clone(),
                        reason: format!("{} transport requires \"url\"", entry.transport),
                    });
                }
            }
            other => {
                return Err(ConfigError::InvalidMcpEntry {
                    name: name.clone(),
                    reason: format!("unknown transport \"{other}\""),
                });
            }
        }
    }
    Ok(())
}
