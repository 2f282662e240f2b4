//! Stage 4 of §4.3: turn summarization.

use std::collections::BTreeSet;
use std::future::Future;

use basalt_types::{CompletionRequest, ContentBlock, ContextError, Message, SystemPrompt, ThinkingConfig, ToolChoice};
use basalt_stream::Provider;

use crate::estimate::TokenCounter;
use crate::pairing::nearest_safe_boundary_at_most;
use crate::strategy::ContextStrategy;

const SUMMARIZATION_PROMPT: &str = "Summarize the conversation above concisely. Focus on files touched, \
     tools invoked, decisions made, and open questions. Write in third person.";

/// Replaces contiguous old turns with a single synthetic summary message
/// (spec §4.3 stage 4), never splitting an unresolved `tool_use` →
/// `tool_result` pair across the boundary.
///
/// Uses a single auxiliary `complete()` call when `provider` is
/// configured; otherwise falls back to a local, non-AI heuristic over
/// tool names, file paths, and first sentences.
pub struct SummarizationStrategy<P: Provider> {
    provider: Option<P>,
    model: String,
    preserve_recent: usize,
    counter: TokenCounter,
}

impl<P: Provider> SummarizationStrategy<P> {
    /// A local-heuristic-only summarizer, preserving the last
    /// `preserve_recent` messages verbatim.
    #[must_use]
    pub fn local(preserve_recent: usize) -> Self {
        Self { provider: None, model: String::new(), preserve_recent, counter: TokenCounter::new() }
    }

    /// A summarizer that calls `provider` for a single auxiliary
    /// completion instead of the local heuristic.
    #[must_use]
    pub fn with_provider(provider: P, model: impl Into<String>, preserve_recent: usize) -> Self {
        Self { provider: Some(provider), model: model.into(), preserve_recent, counter: TokenCounter::new() }
    }
}

impl<P: Provider> ContextStrategy for SummarizationStrategy<P> {
    fn should_compact(&self, _messages: &[Message], token_count: usize) -> bool {
        token_count > 0
    }

    fn compact(&self, messages: Vec<Message>) -> impl Future<Output = Result<Vec<Message>, ContextError>> + Send {
        let target = messages.len().saturating_sub(self.preserve_recent);
        let split = nearest_safe_boundary_at_most(&messages, target);

        async move {
            if split == 0 {
                return Ok(messages);
            }
            let mut messages = messages;
            let recent = messages.split_off(split);
            let old = messages;
            let turns_summarized = old.len();

            let summary_text = match &self.provider {
                Some(provider) => call_provider_summarizer(provider, &self.model, old).await?,
                None => local_heuristic(&old),
            };

            let summary_message =
                Message::assistant_text(format!("[Summary of {turns_summarized} earlier messages]\n{summary_text}"));

            let mut result = vec![summary_message];
            result.extend(recent);
            Ok(result)
        }
    }

    fn token_estimate(&self, messages: &[Message]) -> usize {
        self.counter.estimate_messages(messages)
    }
}

async fn call_provider_summarizer<P: Provider>(
    provider: &P,
    model: &str,
    old: Vec<Message>,
) -> Result<String, ContextError> {
    let request = CompletionRequest {
        model: model.to_string(),
        messages: old,
        system: Some(SystemPrompt::Text(SUMMARIZATION_PROMPT.to_string())),
        tools: Vec::new(),
        max_tokens: 1024,
        temperature: Some(0.0),
        stop_sequences: Vec::new(),
        tool_choice: Some(ToolChoice::None),
        thinking: Some(ThinkingConfig::Disabled),
        enable_thinking: false,
    };
    let response = provider.complete(request).await?;
    Ok(response.message.text())
}

fn local_heuristic(messages: &[Message]) -> String {
    let mut tools_used = BTreeSet::new();
    let mut files_touched = BTreeSet::new();
    let mut key_points = Vec::new();

    for message in messages {
        for block in &message.content {
            match block {
                ContentBlock::ToolUse { name, input, .. } => {
                    tools_used.insert(name.clone());
                    if let Some(path) =
                        input.get("file_path").or_else(|| input.get("path")).and_then(|v| v.as_str())
                    {
                        files_touched.insert(path.to_string());
                    }
                }
                ContentBlock::Text { text, .. } => {
                    if let Some(sentence) = first_sentence(text) {
                        key_points.push(sentence);
                    }
                }
                _ => {}
            }
        }
    }

    let mut out = String::new();
    if !tools_used.is_empty() {
        out.push_str(&format!("Tools invoked: {}.\n", tools_used.into_iter().collect::<Vec<_>>().join(", ")));
    }
    if !files_touched.is_empty() {
        out.push_str(&format!("Files touched: {}.\n", files_touched.into_iter().collect::<Vec<_>>().join(", ")));
    }
    if key_points.is_empty() {
        out.push_str("No notable prose content in this span.");
    } else {
        out.push_str("Key points: ");
        out.push_str(&key_points.join(" "));
    }
    out
}

fn first_sentence(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let end = trimmed.find(['.', '!', '?']).map(|i| i + 1).unwrap_or(trimmed.len());
    Some(trimmed[..end].to_string())
}
