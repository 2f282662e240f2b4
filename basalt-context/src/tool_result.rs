//! Stage 2 of §4.3: tool-output trimming.

use std::future::Future;

use basalt_types::{ContentBlock, ContextError, Message, ToolResultContent};

use crate::estimate::TokenCounter;
use crate::strategy::ContextStrategy;

/// Default per-call cap, in bytes of the plain-text rendering, above which
/// a `tool_result` is replaced with a structured summary.
pub const DEFAULT_TOOL_RESULT_CAP: usize = 4_000;

/// Preview length kept verbatim inside the structured summary.
const PREVIEW_CHARS: usize = 500;

/// Replaces any `tool_result` whose content exceeds `cap` bytes with
/// `{"truncated": true, "preview": <first N chars>, "omitted": <bytes>}`,
/// serialized as the result's text content (spec §4.3 stage 2). Already
/// a structured-summary result is left alone rather than trimmed again.
pub struct ToolResultTrimmingStrategy {
    cap: usize,
    counter: TokenCounter,
}

impl ToolResultTrimmingStrategy {
    /// Build a stage trimming `tool_result` content over `cap` bytes.
    #[must_use]
    pub fn new(cap: usize) -> Self {
        Self { cap, counter: TokenCounter::new() }
    }
}

impl Default for ToolResultTrimmingStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_TOOL_RESULT_CAP)
    }
}

impl ContextStrategy for ToolResultTrimmingStrategy {
    fn should_compact(&self, _messages: &[Message], token_count: usize) -> bool {
        token_count > 0
    }

    fn compact(&self, messages: Vec<Message>) -> impl Future<Output = Result<Vec<Message>, ContextError>> + Send {
        let cap = self.cap;
        async move {
            let trimmed = messages
                .into_iter()
                .map(|mut message| {
                    for block in &mut message.content {
                        if let ContentBlock::ToolResult { content, .. } = block {
                            trim_if_oversize(content, cap);
                        }
                    }
                    message
                })
                .collect();
            Ok(trimmed)
        }
    }

    fn token_estimate(&self, messages: &[Message]) -> usize {
        self.counter.estimate_messages(messages)
    }
}

fn trim_if_oversize(content: &mut ToolResultContent, cap: usize) {
    let plain = content.as_plain_text();
    if plain.len() <= cap {
        return;
    }
    let preview_end = floor_char_boundary(&plain, PREVIEW_CHARS.min(cap).min(plain.len()));
    let summary = serde_json::json!({
        "truncated": true,
        "preview": &plain[..preview_end],
        "omitted": plain.len() - preview_end,
    });
    *content = ToolResultContent::Text(summary.to_string());
}

fn floor_char_boundary(s: &str, index: usize) -> usize {
    let mut idx = index.min(s.len());
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;
    use basalt_types::Role;
    use serde_json::Value;

    fn tool_result_message(content: &str) -> Message {
        Message {
            role: Role::User,
            content: vec![ContentBlock::ToolResult {
                tool_use_id: "t1".into(),
                content: ToolResultContent::Text(content.to_string()),
                is_error: false,
            }],
            id: None,
            model: None,
            stop_reason: None,
            usage: None,
        }
    }

    #[tokio::test]
    async fn small_results_pass_through_untouched() {
        let strategy = ToolResultTrimmingStrategy::new(100);
        let messages = vec![tool_result_message("short")];
        let compacted = strategy.compact(messages).await.unwrap();
        match &compacted[0].content[0] {
            ContentBlock::ToolResult { content, .. } => assert_eq!(content.as_plain_text(), "short"),
            other => panic!("unexpected block: {other:?}"),
        }
    }

    #[tokio::test]
    async fn oversize_results_become_a_structured_summary() {
        let strategy = ToolResultTrimmingStrategy::new(10);
        let messages = vec![tool_result_message(&"x".repeat(100))];
        let compacted = strategy.compact(messages).await.unwrap();
        match &compacted[0].content[0] {
            ContentBlock::ToolResult { content, .. } => {
                let rendered = content.as_plain_text();
                let value: Value = serde_json::from_str(&rendered).unwrap();
                assert_eq!(value["truncated"], Value::Bool(true));
                assert_eq!(value["omitted"], Value::from(90));
            }
            other => panic!("unexpected block: {other:?}"),
        }
    }
}
