#![deny(missing_docs)]
//! Tool registry and dispatch for the basalt agent runtime.
//!
//! [`ToolRegistry`] holds the process-wide name → implementation mapping;
//! [`dispatch`] runs the five-step algorithm (resolve, validate, gate,
//! invoke, marshal) for a single `tool_use` block against it.

mod dispatch;
mod registry;

pub use dispatch::{dispatch, AllowAll, ErrorKind, PermissionGate, DEFAULT_OUTPUT_CAP};
pub use registry::{parse_tool_list, ToolDyn, ToolRegistry};
