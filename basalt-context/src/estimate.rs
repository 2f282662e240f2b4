//! Local token estimation for budgeting only — authoritative counts come
//! from the server's reported usage (spec §4.3).

use basalt_types::{ContentBlock, Message, SystemPrompt};

/// Fixed per-image token estimate, used when no explicit dimensions are
/// available to compute a tighter figure.
const IMAGE_TOKENS: usize = 1_500;

/// Flat overhead per message accounting for role/framing tokens.
const MESSAGE_OVERHEAD: usize = 4;

/// Heuristic token estimator. ASCII text is priced per character at a
/// coarse chars-per-token ratio; non-ASCII runs (CJK, emoji, ...) are
/// priced per character at a much denser ratio since a single token
/// there typically covers far fewer source characters.
pub struct TokenCounter {
    ascii_chars_per_token: f32,
    non_ascii_chars_per_token: f32,
}

impl TokenCounter {
    /// Default estimator: ~4 chars/token for ASCII, ~1.5 chars/token for
    /// non-ASCII.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ascii_chars_per_token: 4.0,
            non_ascii_chars_per_token: 1.5,
        }
    }

    /// An estimator with custom ratios, for models with different
    /// tokenization density.
    #[must_use]
    pub fn with_ratios(ascii_chars_per_token: f32, non_ascii_chars_per_token: f32) -> Self {
        Self {
            ascii_chars_per_token: ascii_chars_per_token.max(0.1),
            non_ascii_chars_per_token: non_ascii_chars_per_token.max(0.1),
        }
    }

    /// Estimate the token count of a plain string.
    #[must_use]
    pub fn estimate_text(&self, text: &str) -> usize {
        let (mut ascii_chars, mut non_ascii_chars) = (0usize, 0usize);
        for c in text.chars() {
            if c.is_ascii() {
                ascii_chars += 1;
            } else {
                non_ascii_chars += 1;
            }
        }
        let ascii_tokens = (ascii_chars as f32 / self.ascii_chars_per_token).ceil();
        let non_ascii_tokens = (non_ascii_chars as f32 / self.non_ascii_chars_per_token).ceil();
        (ascii_tokens + non_ascii_tokens) as usize
    }

    fn estimate_block(&self, block: &ContentBlock) -> usize {
        match block {
            ContentBlock::Text { text, .. } => self.estimate_text(text),
            ContentBlock::Thinking { thinking, .. } => self.estimate_text(thinking),
            ContentBlock::RedactedThinking { data } => self.estimate_text(data),
            ContentBlock::ToolUse { name, input, .. } => {
                self.estimate_text(name) + self.estimate_text(&input.to_string())
            }
            ContentBlock::ToolResult { content, .. } => self.estimate_text(&content.as_plain_text()),
            ContentBlock::Image { .. } => IMAGE_TOKENS,
        }
    }

    /// Estimate one message's total token cost, including per-message
    /// framing overhead.
    #[must_use]
    pub fn estimate_message(&self, message: &Message) -> usize {
        MESSAGE_OVERHEAD + message.content.iter().map(|b| self.estimate_block(b)).sum::<usize>()
    }

    /// Estimate the total token cost of a message sequence.
    #[must_use]
    pub fn estimate_messages(&self, messages: &[Message]) -> usize {
        messages.iter().map(|m| self.estimate_message(m)).sum()
    }

    /// Estimate the system prompt's token cost.
    #[must_use]
    pub fn estimate_system_prompt(&self, prompt: &SystemPrompt) -> usize {
        match prompt {
            SystemPrompt::Text(text) => self.estimate_text(text),
            SystemPrompt::Blocks(blocks) => blocks.iter().map(|b| self.estimate_text(&b.text)).sum(),
        }
    }
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimates_ascii_text_at_four_chars_per_token() {
        let counter = TokenCounter::new();
        assert_eq!(counter.estimate_text(&"a".repeat(400)), 100);
    }

    #[test]
    fn non_ascii_text_weighs_more_per_character() {
        let counter = TokenCounter::new();
        let ascii_estimate = counter.estimate_text(&"a".repeat(40));
        let non_ascii_estimate = counter.estimate_text(&"あ".repeat(40));
        assert!(non_ascii_estimate > ascii_estimate);
    }

    #[test]
    fn message_estimate_includes_overhead() {
        let counter = TokenCounter::new();
        let message = Message::user_text("hi");
        assert_eq!(counter.estimate_message(&message), MESSAGE_OVERHEAD + 1);
    }

    #[test]
    fn image_block_uses_fixed_estimate() {
        let counter = TokenCounter::new();
        let message = Message {
            role: basalt_types::Role::User,
            content: vec![ContentBlock::Image {
                source: basalt_types::ImageSource::Url { url: "https://x/y.png".into() },
            }],
            id: None,
            model: None,
            stop_reason: None,
            usage: None,
        };
        assert_eq!(counter.estimate_message(&message), MESSAGE_OVERHEAD + IMAGE_TOKENS);
    }

    #[test]
    fn system_prompt_text_variant_estimates_directly() {
        let counter = TokenCounter::new();
        let prompt = SystemPrompt::Text("a".repeat(40));
        assert_eq!(counter.estimate_system_prompt(&prompt), 10);
    }
}
