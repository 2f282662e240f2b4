//! Stage 5 of §4.3: hard drop, the last resort when every other stage
//! still leaves the conversation over budget.

use std::future::Future;

use basalt_types::{ContextError, Message};

use crate::estimate::TokenCounter;
use crate::pairing::oldest_droppable_chunk_len;
use crate::strategy::ContextStrategy;

/// Repeatedly drops the oldest self-contained chunk of messages (per
/// [`oldest_droppable_chunk_len`]) until the estimated token count fits
/// `max_tokens`, or nothing more can be dropped without splitting a
/// pending `tool_use` → `tool_result` pair.
pub struct HardDropStrategy {
    max_tokens: usize,
    counter: TokenCounter,
}

impl HardDropStrategy {
    /// Build a stage that drops oldest chunks until `max_tokens` fits.
    #[must_use]
    pub fn new(max_tokens: usize) -> Self {
        Self { max_tokens, counter: TokenCounter::new() }
    }
}

impl ContextStrategy for HardDropStrategy {
    fn should_compact(&self, _messages: &[Message], token_count: usize) -> bool {
        token_count > self.max_tokens
    }

    fn compact(&self, messages: Vec<Message>) -> impl Future<Output = Result<Vec<Message>, ContextError>> + Send {
        let max_tokens = self.max_tokens;
        let counter = TokenCounter::new();
        async move {
            let mut current = messages;
            while counter.estimate_messages(&current) > max_tokens {
                match oldest_droppable_chunk_len(&current) {
                    Some(chunk_len) if chunk_len < current.len() => {
                        tracing::warn!(chunk_len, "hard-dropping oldest context chunk to fit budget");
                        current.drain(..chunk_len);
                    }
                    _ => break,
                }
            }
            Ok(current)
        }
    }

    fn token_estimate(&self, messages: &[Message]) -> usize {
        self.counter.estimate_messages(messages)
    }
}
