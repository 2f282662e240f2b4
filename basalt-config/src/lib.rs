#![deny(missing_docs)]
//! Layered configuration resolver for the basalt agent runtime (spec
//! §4.6).
//!
//! [`resolve`] merges hardcoded defaults, the global settings file, the
//! project settings file, and a whitelist of environment variables, in
//! increasing precedence, validating each source independently so one
//! bad field degrades only that source rather than the whole config.

mod env;
mod mcp;
mod merge;
mod migrate;
mod model;
mod redact;
mod resolver;

pub use env::HONORED_ENV_VARS;
pub use mcp::{validate_mcp_servers, McpServerConfig};
pub use merge::{merge, merge_all};
pub use model::Config;
pub use redact::redact;
pub use resolver::{export, resolve, validate, Resolved};
