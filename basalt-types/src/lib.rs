#![deny(missing_docs)]
//! Shared data model for the basalt agent runtime.
//!
//! This crate has no behavior of its own — it's the vocabulary every other
//! crate in the workspace shares: messages and content blocks (`message`),
//! sessions and todos (`session`), tool descriptors and results (`tool`),
//! provider request/response shapes (`provider`), and the per-concern error
//! enums everything else propagates (`error`).

mod error;
mod message;
mod provider;
mod session;
mod tool;

pub use error::{
    ConfigError, ContextError, LoopError, PermissionError, ProviderError, Severity, StorageError,
    StreamError, ToolError,
};
pub use message::{
    Citation, ContentBlock, ImageSource, Message, Role, ToolResultContent, ToolResultItem,
};
pub use provider::{
    CompletionRequest, CompletionResponse, ResponseFormat, StopReason, SystemBlock, SystemPrompt,
    ThinkingConfig, TokenUsage, ToolChoice, UsageLimits,
};
pub use session::{ModelUsage, Session, SessionMetadata, SessionState, TodoItem, TodoStatus};
pub use tool::{
    PermissionClass, PermissionDecision, ToolAnnotations, ToolContext, ToolDescriptor, ToolOutcome,
    ToolOutputContent,
};
