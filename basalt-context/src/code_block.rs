//! Stage 3 of §4.3: code-block compression.
//!
//! No file in the pack implements this stage verbatim; it is grounded on
//! the shape of `ToolResultTrimmingStrategy`'s block-rewriting loop
//! (itself adapted from `ToolResultClearingStrategy` in the teacher), just
//! rewriting `Text` blocks instead of `ToolResult` blocks.

use std::future::Future;

use basalt_types::{ContentBlock, ContextError, Message};

use crate::estimate::TokenCounter;
use crate::strategy::ContextStrategy;

/// Default line-count threshold above which a fenced code block is
/// collapsed.
pub const DEFAULT_LINE_THRESHOLD: usize = 40;

/// Collapses fenced code blocks longer than `line_threshold` lines inside
/// `Text` content blocks to `«code block elided: L lines»` (spec §4.3
/// stage 3).
pub struct CodeBlockCollapsingStrategy {
    line_threshold: usize,
    counter: TokenCounter,
}

impl CodeBlockCollapsingStrategy {
    /// Build a stage collapsing fences longer than `line_threshold` lines.
    #[must_use]
    pub fn new(line_threshold: usize) -> Self {
        Self { line_threshold, counter: TokenCounter::new() }
    }
}

impl Default for CodeBlockCollapsingStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_LINE_THRESHOLD)
    }
}

impl ContextStrategy for CodeBlockCollapsingStrategy {
    fn should_compact(&self, _messages: &[Message], token_count: usize) -> bool {
        token_count > 0
    }

    fn compact(&self, messages: Vec<Message>) -> impl Future<Output = Result<Vec<Message>, ContextError>> + Send {
        let line_threshold = self.line_threshold;
        async move {
            let collapsed = messages
                .into_iter()
                .map(|mut message| {
                    for block in &mut message.content {
                        if let ContentBlock::Text { text, .. } = block {
                            *text = collapse_fences(text, line_threshold);
                        }
                    }
                    message
                })
                .collect();
            Ok(collapsed)
        }
    }

    fn token_estimate(&self, messages: &[Message]) -> usize {
        self.counter.estimate_messages(messages)
    }
}

fn collapse_fences(text: &str, line_threshold: usize) -> String {
    let mut out = String::with_capacity(text.len());
    let mut lines = text.lines().peekable();
    while let Some(line) = lines.next() {
        if line.trim_start().starts_with("```") {
            let mut body = Vec::new();
            let mut closed = false;
            for inner in lines.by_ref() {
                if inner.trim_start().starts_with("```") {
                    closed = true;
                    break;
                }
                body.push(inner);
            }
            if closed && body.len() > line_threshold {
                out.push_str(line);
                out.push('\n');
                out.push_str(&format!("«code block elided: {} lines»\n", body.len()));
                out.push_str("```");
            } else {
                out.push_str(line);
                out.push('\n');
                for inner in &body {
                    out.push_str(inner);
                    out.push('\n');
                }
                if closed {
                    out.push_str("```");
                }
            }
        } else {
            out.push_str(line);
        }
        if lines.peek().is_some() {
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fenced(lines: usize) -> String {
        let mut body = String::from("```rust\n");
        for i in 0..lines {
            body.push_str(&format!("let x{i} = {i};\n"));
        }
        body.push_str("```");
        body
    }

    #[test]
    fn short_fences_are_left_untouched() {
        let text = fenced(5);
        let collapsed = collapse_fences(&text, 40);
        assert_eq!(collapsed, text);
    }

    #[test]
    fn long_fences_are_collapsed_with_line_count() {
        let text = fenced(50);
        let collapsed = collapse_fences(&text, 40);
        assert!(collapsed.contains("«code block elided: 50 lines»"));
        assert!(!collapsed.contains("let x10"));
    }

    #[test]
    fn text_outside_fences_is_preserved() {
        let text = format!("before\n{}\nafter", fenced(50));
        let collapsed = collapse_fences(&text, 40);
        assert!(collapsed.starts_with("before\n"));
        assert!(collapsed.ends_with("after"));
    }

    #[tokio::test]
    async fn strategy_rewrites_text_blocks_in_place() {
        let strategy = CodeBlockCollapsingStrategy::new(10);
        let message = Message::assistant_text(fenced(20));
        let compacted = strategy.compact(vec![message]).await.unwrap();
        assert!(compacted[0].text().contains("«code block elided: 20 lines»"));
    }
}
