//! Tool-use/tool-result pairing invariant (spec §4.3: "summarization MUST
//! preserve every unresolved `tool_use` → `tool_result` pairing").

use std::collections::HashSet;

use basalt_types::{ContentBlock, Message};

/// Every prefix length at which `messages[..n]` is self-contained: no
/// `tool_use` block introduced inside that prefix is left without its
/// matching `tool_result` also inside the prefix. Always includes `0`.
///
/// Any compaction stage that needs to cut the message list — turn
/// summarization picking a split point, hard drop picking a chunk to
/// remove — must only cut at one of these lengths.
#[must_use]
pub fn safe_boundaries(messages: &[Message]) -> Vec<usize> {
    let mut boundaries = vec![0];
    let mut pending: HashSet<&str> = HashSet::new();
    for (i, message) in messages.iter().enumerate() {
        for block in &message.content {
            match block {
                ContentBlock::ToolUse { id, .. } => {
                    pending.insert(id.as_str());
                }
                ContentBlock::ToolResult { tool_use_id, .. } => {
                    pending.remove(tool_use_id.as_str());
                }
                _ => {}
            }
        }
        if pending.is_empty() {
            boundaries.push(i + 1);
        }
    }
    boundaries
}

/// The largest safe boundary that does not exceed `target`, or `0` if
/// `target` itself is before the first non-trivial boundary.
#[must_use]
pub fn nearest_safe_boundary_at_most(messages: &[Message], target: usize) -> usize {
    safe_boundaries(messages)
        .into_iter()
        .filter(|b| *b <= target)
        .next_back()
        .unwrap_or(0)
}

/// The smallest safe boundary strictly greater than `0`, i.e. the size of
/// the oldest self-contained chunk available to drop. `None` if the only
/// safe boundary is `0` (nothing can be dropped without splitting a
/// pending pair) or the list is empty.
#[must_use]
pub fn oldest_droppable_chunk_len(messages: &[Message]) -> Option<usize> {
    safe_boundaries(messages).into_iter().find(|b| *b > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use basalt_types::ToolResultContent;
    use serde_json::json;

    fn tool_use_message(id: &str) -> Message {
        Message {
            role: basalt_types::Role::Assistant,
            content: vec![ContentBlock::ToolUse { id: id.into(), name: "Read".into(), input: json!({}) }],
            id: None,
            model: None,
            stop_reason: None,
            usage: None,
        }
    }

    fn tool_result_message(id: &str) -> Message {
        Message::tool_results(vec![ContentBlock::ToolResult {
            tool_use_id: id.into(),
            content: ToolResultContent::Text("ok".into()),
            is_error: false,
        }])
    }

    #[test]
    fn plain_text_messages_are_all_boundaries() {
        let messages = vec![Message::user_text("a"), Message::assistant_text("b")];
        assert_eq!(safe_boundaries(&messages), vec![0, 1, 2]);
    }

    #[test]
    fn boundary_inside_a_pending_tool_pair_is_excluded() {
        let messages = vec![Message::user_text("go"), tool_use_message("t1"), tool_result_message("t1")];
        let boundaries = safe_boundaries(&messages);
        assert!(!boundaries.contains(&2), "index 2 splits tool_use from its result");
        assert!(boundaries.contains(&3));
    }

    #[test]
    fn nearest_safe_boundary_backs_off_from_an_unsafe_target() {
        let messages = vec![Message::user_text("go"), tool_use_message("t1"), tool_result_message("t1")];
        assert_eq!(nearest_safe_boundary_at_most(&messages, 2), 1);
    }

    #[test]
    fn oldest_droppable_chunk_skips_past_a_pending_pair() {
        let messages = vec![tool_use_message("t1"), tool_result_message("t1"), Message::user_text("next")];
        assert_eq!(oldest_droppable_chunk_len(&messages), Some(2));
    }
}
