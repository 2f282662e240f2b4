//! Model provider request/response shapes (spec §4.1, §6).

use serde::{Deserialize, Serialize};

use crate::Message;

/// System prompt: either a plain string or cacheable blocks.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SystemPrompt {
    /// A single plain-text system prompt.
    Text(String),
    /// A sequence of cacheable system blocks.
    Blocks(Vec<SystemBlock>),
}

impl Default for SystemPrompt {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<String> for SystemPrompt {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for SystemPrompt {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

/// A single block of a multi-block system prompt.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemBlock {
    /// The block's text.
    pub text: String,
}

/// Extended-thinking configuration for a completion request.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ThinkingConfig {
    /// Thinking disabled.
    Disabled,
    /// Thinking enabled with a token budget.
    Enabled {
        /// Token budget reserved for reasoning.
        budget_tokens: u32,
    },
}

/// Which tool (if any) the model must use.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolChoice {
    /// Let the model decide.
    Auto,
    /// Force no tool use.
    None,
    /// Require some tool to be used.
    Required,
    /// Require a specific tool.
    Specific {
        /// The required tool's name.
        name: String,
    },
}

/// Desired shape of the final assistant text, if constrained.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Unconstrained text.
    Text,
    /// A JSON object, unconstrained shape.
    JsonObject,
}

/// A request to the model provider (spec §6's `createMessage`).
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier.
    pub model: String,
    /// Conversation so far.
    pub messages: Vec<Message>,
    /// System prompt.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub system: Option<SystemPrompt>,
    /// Tool definitions available this call.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<crate::ToolDescriptor>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub temperature: Option<f64>,
    /// Stop sequences.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop_sequences: Vec<String>,
    /// Tool-choice constraint.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tool_choice: Option<ToolChoice>,
    /// Extended thinking configuration.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub thinking: Option<ThinkingConfig>,
    /// Whether extended thinking is requested (spec §6 `opts.enableThinking`).
    #[serde(default)]
    pub enable_thinking: bool,
}

/// Why the model stopped generating.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The model finished its turn normally.
    EndTurn,
    /// The model wants to invoke one or more tools.
    ToolUse,
    /// The response was truncated at `max_tokens`.
    MaxTokens,
    /// A configured stop sequence was encountered.
    StopSequence,
    /// The provider performed server-side context compaction instead of
    /// returning a normal stop; the context manager treats this as an
    /// externally-applied compression event rather than re-running its own
    /// pipeline this turn.
    Compaction,
}

/// Token usage for a single completion.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Input tokens consumed.
    pub input_tokens: u64,
    /// Output tokens produced.
    pub output_tokens: u64,
    /// Tokens served from cache, if the provider reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_read_tokens: Option<u64>,
    /// Tokens used to write the cache, if the provider reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_creation_tokens: Option<u64>,
}

impl TokenUsage {
    /// Accumulate another usage reading into this one.
    pub fn add(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        if let Some(c) = other.cache_read_tokens {
            *self.cache_read_tokens.get_or_insert(0) += c;
        }
        if let Some(c) = other.cache_creation_tokens {
            *self.cache_creation_tokens.get_or_insert(0) += c;
        }
    }
}

/// A response from the model provider.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Provider-assigned response id.
    pub id: String,
    /// Model that produced this response.
    pub model: String,
    /// The resulting assistant message.
    pub message: Message,
    /// Token usage for this call.
    pub usage: TokenUsage,
    /// Why generation stopped.
    pub stop_reason: StopReason,
}

/// Structured budget limits an embedder may enforce beyond `maxTurns`/
/// `maxBudgetUSD` (spec §3.1 supplement).
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct UsageLimits {
    /// Maximum number of model requests.
    pub request_limit: Option<u64>,
    /// Maximum number of tool calls.
    pub tool_calls_limit: Option<u64>,
    /// Maximum input tokens across the run.
    pub input_tokens_limit: Option<u64>,
    /// Maximum output tokens across the run.
    pub output_tokens_limit: Option<u64>,
    /// Maximum total tokens across the run.
    pub total_tokens_limit: Option<u64>,
}

impl UsageLimits {
    /// Builder: set the request limit.
    #[must_use]
    pub fn with_request_limit(mut self, n: u64) -> Self {
        self.request_limit = Some(n);
        self
    }

    /// Builder: set the tool-call limit.
    #[must_use]
    pub fn with_tool_calls_limit(mut self, n: u64) -> Self {
        self.tool_calls_limit = Some(n);
        self
    }

    /// Builder: set the total-token limit.
    #[must_use]
    pub fn with_total_tokens_limit(mut self, n: u64) -> Self {
        self.total_tokens_limit = Some(n);
        self
    }
}
