//! The conversational window manager (spec §4.3): owns the message list,
//! the system prompt, and the compaction pipeline that keeps both inside
//! budget.

use basalt_types::{ContextError, Message, SystemPrompt};
use serde_json::{json, Value};

use crate::estimate::TokenCounter;
use crate::strategy::{CompositeStrategy, ContextStrategy};

/// Default ratio of `used / maxTokens` above which `is_near_limit` reports
/// true (spec §4.3).
pub const DEFAULT_NEAR_LIMIT_RATIO: f64 = 0.85;

/// Result of the most recent compaction pass, for `analyze()`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompactionAnalysis {
    /// `tokens_after / tokens_before`; `1.0` means nothing was saved.
    pub compression_ratio: f64,
    /// Estimated tokens removed by the last compaction pass.
    pub saved_tokens_estimate: usize,
}

impl Default for CompactionAnalysis {
    fn default() -> Self {
        Self { compression_ratio: 1.0, saved_tokens_estimate: 0 }
    }
}

/// Owns the ordered conversation and runs it through [`CompositeStrategy`]
/// whenever headroom runs low.
pub struct ContextManager {
    messages: Vec<Message>,
    system_prompt: SystemPrompt,
    strategy: CompositeStrategy,
    counter: TokenCounter,
    safety_reserve: usize,
    min_headroom: usize,
    near_limit_ratio: f64,
    last_compaction: Option<CompactionAnalysis>,
}

impl ContextManager {
    /// Build a manager around a configured compaction pipeline.
    #[must_use]
    pub fn new(strategy: CompositeStrategy) -> Self {
        Self {
            messages: Vec::new(),
            system_prompt: SystemPrompt::default(),
            strategy,
            counter: TokenCounter::new(),
            safety_reserve: 1_000,
            min_headroom: 2_000,
            near_limit_ratio: DEFAULT_NEAR_LIMIT_RATIO,
            last_compaction: None,
        }
    }

    /// Override the safety reserve, minimum headroom, and near-limit ratio
    /// (defaults: 1000, 2000, 0.85).
    #[must_use]
    pub fn with_limits(mut self, safety_reserve: usize, min_headroom: usize, near_limit_ratio: f64) -> Self {
        self.safety_reserve = safety_reserve;
        self.min_headroom = min_headroom;
        self.near_limit_ratio = near_limit_ratio;
        self
    }

    /// Set or replace the system prompt.
    pub fn set_system_prompt(&mut self, prompt: impl Into<SystemPrompt>) {
        self.system_prompt = prompt.into();
    }

    /// The active system prompt.
    #[must_use]
    pub fn system_prompt(&self) -> &SystemPrompt {
        &self.system_prompt
    }

    /// Append one turn: a user message and the assistant's response to it.
    pub fn append(&mut self, user_message: Message, assistant_message: Message) {
        self.messages.push(user_message);
        self.messages.push(assistant_message);
    }

    /// The conversation as it stands, ready to send to the model.
    #[must_use]
    pub fn get_messages(&self) -> &[Message] {
        &self.messages
    }

    /// Estimated tokens currently in use (system prompt plus messages).
    #[must_use]
    pub fn used(&self) -> usize {
        self.counter.estimate_system_prompt(&self.system_prompt) + self.counter.estimate_messages(&self.messages)
    }

    /// The configured token budget.
    #[must_use]
    pub fn max_tokens(&self) -> usize {
        self.strategy.max_tokens()
    }

    /// Tokens left before hitting the budget, after reserving
    /// `safety_reserve`.
    #[must_use]
    pub fn available(&self) -> usize {
        self.max_tokens().saturating_sub(self.safety_reserve).saturating_sub(self.used())
    }

    /// `used() / max_tokens()`, `0.0` if there is no budget configured.
    #[must_use]
    pub fn usage_percent(&self) -> f64 {
        if self.max_tokens() == 0 {
            return 0.0;
        }
        self.used() as f64 / self.max_tokens() as f64
    }

    /// Whether usage has crossed the near-limit ratio.
    #[must_use]
    pub fn is_near_limit(&self) -> bool {
        self.usage_percent() >= self.near_limit_ratio
    }

    /// Run the compaction pipeline if the current headroom is below
    /// `min_headroom` (spec §4.3: "on each turn, before calling the
    /// model"). Returns whether compaction actually ran.
    ///
    /// # Errors
    /// Returns `ContextError` if a compaction stage fails (e.g. an
    /// auxiliary summarization call to the provider).
    pub async fn compact_if_needed(&mut self) -> Result<bool, ContextError> {
        if self.available() >= self.min_headroom {
            return Ok(false);
        }
        let before = self.used();
        self.messages = self.strategy.compact(self.messages.clone()).await?;
        let after = self.used();
        self.last_compaction = Some(CompactionAnalysis {
            compression_ratio: if before == 0 { 1.0 } else { after as f64 / before as f64 },
            saved_tokens_estimate: before.saturating_sub(after),
        });
        Ok(true)
    }

    /// Snapshot the current state as a JSON value.
    #[must_use]
    pub fn export(&self) -> Value {
        json!({"messages": self.messages, "systemPrompt": self.system_prompt})
    }

    /// Restore state from a snapshot produced by [`Self::export`].
    /// `import(export())` is required to reproduce the same
    /// `get_messages()` output (spec §4.3: "restartable over the full
    /// history").
    ///
    /// # Errors
    /// Returns `ContextError::CompactionFailed` if the snapshot doesn't
    /// deserialize to the expected shape.
    pub fn import(&mut self, snapshot: &Value) -> Result<(), ContextError> {
        let messages: Vec<Message> = serde_json::from_value(
            snapshot.get("messages").cloned().unwrap_or(Value::Array(Vec::new())),
        )
        .map_err(|e| ContextError::CompactionFailed(format!("invalid snapshot messages: {e}")))?;
        let system_prompt = match snapshot.get("systemPrompt") {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| ContextError::CompactionFailed(format!("invalid snapshot system prompt: {e}")))?,
            None => SystemPrompt::default(),
        };
        self.messages = messages;
        self.system_prompt = system_prompt;
        Ok(())
    }

    /// The compression ratio and estimated tokens saved by the most
    /// recent compaction pass, or the identity default if compaction has
    /// never run.
    #[must_use]
    pub fn analyze(&self) -> CompactionAnalysis {
        self.last_compaction.unwrap_or_default()
    }
}
