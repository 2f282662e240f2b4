#![deny(missing_docs)]
//! `basalt`: a composable agent runtime.
//!
//! This crate is a facade over the workspace's constituent crates, each
//! gated behind a feature so a caller only pulls in what it needs — a
//! wire-protocol consumer that never runs a loop, for instance, can take
//! `core` alone. [`prelude`] re-exports the types most callers reach for
//! to assemble an [`basalt_loop::AgentLoop`].
//!
//! | Feature              | Pulls in                                         |
//! |-----------------------|--------------------------------------------------|
//! | `core` (default)      | `basalt-types`, `basalt-stream`, `basalt-tool`, `basalt-context` |
//! | `permission`           | + `basalt-permission`                            |
//! | `session`              | + `basalt-session`                               |
//! | `config`               | + `basalt-config`                                |
//! | `loop-runtime`         | + `basalt-loop` (and `permission`, `session`)     |
//! | `provider-anthropic`   | + `basalt-provider-anthropic`                    |
//! | `providers-all`        | every provider crate                             |

#[cfg(feature = "core")]
pub use basalt_context as context;
#[cfg(feature = "core")]
pub use basalt_stream as stream;
#[cfg(feature = "core")]
pub use basalt_tool as tool;
#[cfg(feature = "core")]
pub use basalt_types as types;

#[cfg(feature = "permission")]
pub use basalt_permission as permission;

#[cfg(feature = "session")]
pub use basalt_session as session;

#[cfg(feature = "config")]
pub use basalt_config as config;

#[cfg(feature = "loop-runtime")]
pub use basalt_loop as agent_loop;

#[cfg(feature = "provider-anthropic")]
pub use basalt_provider_anthropic as anthropic;

/// The types most callers need to assemble and drive an agent loop.
pub mod prelude {
    #[cfg(feature = "core")]
    pub use basalt_types::{
        CompletionRequest, CompletionResponse, ContentBlock, LoopError, Message, PermissionClass,
        PermissionDecision, Role, Session, SessionState, StopReason, ToolContext, ToolDescriptor,
        ToolOutcome,
    };

    #[cfg(feature = "core")]
    pub use basalt_stream::Provider;

    #[cfg(feature = "core")]
    pub use basalt_tool::{dispatch, AllowAll, PermissionGate, ToolRegistry};

    #[cfg(feature = "core")]
    pub use basalt_context::ContextManager;

    #[cfg(feature = "permission")]
    pub use basalt_permission::{PermissionEngine, PermissionMode};

    #[cfg(feature = "session")]
    pub use basalt_session::SessionStore;

    #[cfg(feature = "config")]
    pub use basalt_config::{resolve, Resolved};

    #[cfg(feature = "loop-runtime")]
    pub use basalt_loop::{
        exit_code, AgentLoop, AgentResult, ExitReason, HookAction, HookEvent, LoopConfig,
        ModelPricing, ObservabilityHook, ToolFilter,
    };

    #[cfg(feature = "provider-anthropic")]
    pub use basalt_provider_anthropic::Anthropic;
}
