//! Stage 1 of §4.3: tail preservation.

use std::future::Future;

use basalt_types::{ContextError, Message};

use crate::estimate::TokenCounter;
use crate::strategy::ContextStrategy;

/// Always keeps the last `keep_recent_turns` messages intact. This stage's
/// own `compact` is a no-op passthrough — the actual protection is
/// enforced by `CompositeStrategy`, which reads `protected_tail()` from
/// every configured stage and shields that many trailing messages from
/// the whole pipeline, not just this one.
pub struct TailPreservingStrategy {
    keep_recent_turns: usize,
    counter: TokenCounter,
}

impl TailPreservingStrategy {
    /// `keep_recent_turns` counts messages, not logical "turns" — a turn
    /// is typically a user message plus its assistant response plus any
    /// tool-result messages in between, so callers usually pass roughly
    /// double the number of conversational turns they want preserved.
    #[must_use]
    pub fn new(keep_recent_turns: usize) -> Self {
        Self { keep_recent_turns, counter: TokenCounter::new() }
    }
}

impl ContextStrategy for TailPreservingStrategy {
    fn should_compact(&self, _messages: &[Message], _token_count: usize) -> bool {
        false
    }

    fn compact(&self, messages: Vec<Message>) -> impl Future<Output = Result<Vec<Message>, ContextError>> + Send {
        async move { Ok(messages) }
    }

    fn token_estimate(&self, messages: &[Message]) -> usize {
        self.counter.estimate_messages(messages)
    }

    fn protected_tail(&self) -> usize {
        self.keep_recent_turns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn compact_is_always_a_no_op() {
        let strategy = TailPreservingStrategy::new(10);
        let messages = vec![Message::user_text("a"), Message::assistant_text("b")];
        let compacted = strategy.compact(messages.clone()).await.unwrap();
        assert_eq!(compacted.len(), messages.len());
    }

    #[test]
    fn reports_its_configured_protected_window() {
        let strategy = TailPreservingStrategy::new(6);
        assert_eq!(strategy.protected_tail(), 6);
    }
}
