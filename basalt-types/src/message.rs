//! Messages and content blocks — the conversational data model (spec §3).

use serde::{Deserialize, Serialize};

/// Who a message is attributed to.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The human (or tool results fed back on the human's behalf).
    User,
    /// The model.
    Assistant,
}

/// A single turn in the conversation.
///
/// `content` is always stored as a block sequence internally; a bare string
/// on the wire is accepted as shorthand for a single text block (see
/// `ContentBlock::from_plain_text` and the custom `Deserialize` below is not
/// needed because callers that receive a bare string construct the message
/// with `Message::user_text`/`Message::assistant_text`).
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Message role.
    pub role: Role,
    /// Ordered content blocks.
    pub content: Vec<ContentBlock>,
    /// Optional provider-assigned message id.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,
    /// Model that produced this message, if assistant-authored.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub model: Option<String>,
    /// Why generation stopped, if assistant-authored.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub stop_reason: Option<crate::StopReason>,
    /// Token usage for this message, if assistant-authored.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub usage: Option<crate::TokenUsage>,
}

impl Message {
    /// Construct a plain-text user message.
    #[must_use]
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::Text {
                text: text.into(),
                citations: Vec::new(),
            }],
            id: None,
            model: None,
            stop_reason: None,
            usage: None,
        }
    }

    /// Construct a plain-text assistant message.
    #[must_use]
    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: vec![ContentBlock::Text {
                text: text.into(),
                citations: Vec::new(),
            }],
            id: None,
            model: None,
            stop_reason: None,
            usage: None,
        }
    }

    /// Construct a user message carrying only tool results, in the same
    /// order as the `tool_use` blocks they answer (spec §3 invariant).
    #[must_use]
    pub fn tool_results(results: Vec<ContentBlock>) -> Self {
        debug_assert!(
            results.iter().all(|b| matches!(b, ContentBlock::ToolResult { .. })),
            "Message::tool_results requires every block to be a tool_result"
        );
        Self {
            role: Role::User,
            content: results,
            id: None,
            model: None,
            stop_reason: None,
            usage: None,
        }
    }

    /// Concatenate all plain-text content in this message (ignores
    /// thinking/tool_use/tool_result/image blocks). Used for guardrail
    /// checks and summarization previews.
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// All `tool_use` blocks in this message, in order.
    pub fn tool_uses(&self) -> impl Iterator<Item = (&str, &str, &serde_json::Value)> {
        self.content.iter().filter_map(|b| match b {
            ContentBlock::ToolUse { id, name, input } => {
                Some((id.as_str(), name.as_str(), input))
            }
            _ => None,
        })
    }
}

/// A single citation attached to a `text` block.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    /// Source document or URL the citation refers to.
    pub source: String,
    /// Cited excerpt, if the provider includes one.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cited_text: Option<String>,
}

/// Where image bytes for an `image` content block come from.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageSource {
    /// Inline base64-encoded image data.
    Base64 {
        /// MIME type, e.g. `image/png`.
        media_type: String,
        /// Base64-encoded bytes.
        data: String,
    },
    /// A URL the provider fetches directly.
    Url {
        /// The image URL.
        url: String,
    },
}

/// One item of a `tool_result`'s content — either text or an image,
/// matching spec §3's `(text|image)[]` union for non-string tool results.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolResultItem {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
    /// An image.
    Image {
        /// Where the image comes from.
        source: ImageSource,
    },
}

/// The content of a `tool_result` block: either a bare string (the common
/// case) or a typed sequence of text/image items.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolResultContent {
    /// A plain string result.
    Text(String),
    /// A structured sequence of text/image items.
    Items(Vec<ToolResultItem>),
}

impl ToolResultContent {
    /// Best-effort plain-text rendering, used for truncation and for
    /// feeding the local (non-AI) summarization heuristic.
    #[must_use]
    pub fn as_plain_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Items(items) => items
                .iter()
                .map(|item| match item {
                    ToolResultItem::Text { text } => text.clone(),
                    ToolResultItem::Image { .. } => "[image]".to_string(),
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Byte length of the plain-text rendering, for truncation-cap checks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.as_plain_text().len()
    }

    /// Whether the rendered content is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A single content block, tagged by `type` (spec §3).
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Assistant prose, optionally with citations.
    Text {
        /// The text.
        text: String,
        /// Citations attached to this block, if any.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        citations: Vec<Citation>,
    },
    /// Extended-reasoning content. `signature` authenticates the block and
    /// is set once the block is finalized (never present mid-stream).
    Thinking {
        /// The reasoning text.
        thinking: String,
        /// Authenticating signature, present once finalized.
        #[serde(skip_serializing_if = "Option::is_none", default)]
        signature: Option<String>,
    },
    /// A thinking block whose reasoning the provider redacted server-side.
    /// Carried opaquely: never rendered, never re-derived, never fed back
    /// as if it were a normal thinking block.
    RedactedThinking {
        /// Opaque redacted payload.
        data: String,
    },
    /// Assistant requests a tool. `id` is opaque and unique within the
    /// message. `input` is the parsed JSON of the accumulated
    /// `input_json_delta` buffer (spec §3 invariant).
    ToolUse {
        /// Opaque call id, matched by a later `tool_result.tool_use_id`.
        id: String,
        /// Tool name.
        name: String,
        /// Parsed (possibly tolerant-parsed) input.
        input: serde_json::Value,
    },
    /// User-role response pairing with a prior `tool_use.id`.
    ToolResult {
        /// The `tool_use.id` this result answers.
        tool_use_id: String,
        /// The result payload.
        content: ToolResultContent,
        /// Whether this result represents an error.
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
    /// A user-provided image.
    Image {
        /// Where the image bytes come from.
        source: ImageSource,
    },
}

impl ContentBlock {
    /// Construct a plain text block with no citations.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            citations: Vec::new(),
        }
    }

    /// Construct an error tool_result with a plain-text message.
    #[must_use]
    pub fn error_result(tool_use_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: ToolResultContent::Text(message.into()),
            is_error: true,
        }
    }

    /// Construct a successful tool_result with a plain-text payload.
    #[must_use]
    pub fn success_result(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: ToolResultContent::Text(content.into()),
            is_error: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_text_concatenates_text_blocks_only() {
        let msg = Message {
            role: Role::Assistant,
            content: vec![
                ContentBlock::text("Hello, "),
                ContentBlock::Thinking {
                    thinking: "ignored".into(),
                    signature: None,
                },
                ContentBlock::text("world"),
            ],
            id: None,
            model: None,
            stop_reason: None,
            usage: None,
        };
        assert_eq!(msg.text(), "Hello, world");
    }

    #[test]
    fn tool_uses_preserves_order() {
        let msg = Message {
            role: Role::Assistant,
            content: vec![
                ContentBlock::ToolUse {
                    id: "t1".into(),
                    name: "Read".into(),
                    input: serde_json::json!({"path": "a"}),
                },
                ContentBlock::text("thinking out loud"),
                ContentBlock::ToolUse {
                    id: "t2".into(),
                    name: "Write".into(),
                    input: serde_json::json!({}),
                },
            ],
            id: None,
            model: None,
            stop_reason: None,
            usage: None,
        };
        let ids: Vec<&str> = msg.tool_uses().map(|(id, _, _)| id).collect();
        assert_eq!(ids, vec!["t1", "t2"]);
    }

    #[test]
    fn content_block_roundtrips_tagged_json() {
        let block = ContentBlock::ToolResult {
            tool_use_id: "t1".into(),
            content: ToolResultContent::Text("hello".into()),
            is_error: false,
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "tool_result");
        assert_eq!(json["tool_use_id"], "t1");
        // is_error is false and omitted by the skip_serializing predicate
        assert!(json.get("is_error").is_none());

        let back: ContentBlock = serde_json::from_value(json).unwrap();
        match back {
            ContentBlock::ToolResult { tool_use_id, .. } => assert_eq!(tool_use_id, "t1"),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn thinking_block_carries_signature() {
        let block = ContentBlock::Thinking {
            thinking: "because X implies Y".into(),
            signature: Some("sig-abc".into()),
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["signature"], "sig-abc");
    }

    #[test]
    fn tool_result_content_as_plain_text_handles_images() {
        let content = ToolResultContent::Items(vec![
            ToolResultItem::Text { text: "a".into() },
            ToolResultItem::Image {
                source: ImageSource::Url {
                    url: "http://example.com/x.png".into(),
                },
            },
        ]);
        assert_eq!(content.as_plain_text(), "a\n[image]");
    }
}
