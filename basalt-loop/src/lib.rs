#![deny(missing_docs)]
//! Top-level agent loop orchestrator for the basalt agent runtime.
//!
//! [`AgentLoop`] ties together a [`basalt_stream::Provider`], a
//! [`basalt_tool::ToolRegistry`], a [`basalt_context::ContextManager`], and
//! a [`basalt_session::SessionStore`] into the per-turn algorithm: call the
//! model, drive its stream to a complete message, dispatch any requested
//! tools, append the result, and repeat until the model stops asking for
//! tools or a configured budget is exhausted.

mod config;
mod hook;
mod loop_impl;
mod retry;
mod state;
mod tool_filter;

pub use config::{LoopConfig, ModelPricing};
pub use hook::{HookAction, HookEvent, ObservabilityHook};
pub use loop_impl::{AgentLoop, AgentResult};
pub use state::{exit_code, ExitReason, LoopState};
pub use tool_filter::ToolFilter;
