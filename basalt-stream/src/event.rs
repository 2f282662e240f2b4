//! Public event and snapshot types emitted by the decoder (spec §4.1).

use basalt_types::{Citation, ContentBlock, Role, StopReason, StreamError, TokenUsage};

/// A snapshot of the assistant message being assembled by one stream.
#[derive(Debug, Clone, Default)]
pub struct MessageState {
    /// Provider-assigned message id, set at `message_start`.
    pub id: Option<String>,
    /// Model that produced this message.
    pub model: Option<String>,
    /// Always `Assistant` for a model stream.
    pub role: Option<Role>,
    /// Content blocks assembled so far, in index order.
    pub content: Vec<ContentBlock>,
    /// Stop reason, set by `message_delta`.
    pub stop_reason: Option<StopReason>,
    /// Stop sequence text, if `stop_reason` is `StopSequence`.
    pub stop_sequence: Option<String>,
    /// Usage, set by `message_delta`.
    pub usage: Option<TokenUsage>,
}

/// Events fired while reducing a stream (spec §4.1's `onX` callbacks,
/// expressed as an enum rather than separate callback registrations).
#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// `message_start`: a fresh, empty message snapshot.
    MessageStart(MessageState),
    /// `text_delta`: appended text at `index`, plus the running snapshot.
    Text {
        /// Content block index.
        index: usize,
        /// The newly appended text.
        delta: String,
        /// The message snapshot after applying this delta.
        snapshot: MessageState,
    },
    /// `thinking_delta`: appended reasoning text at `index`.
    Thinking {
        /// Content block index.
        index: usize,
        /// The newly appended thinking text.
        delta: String,
    },
    /// `signature_delta`: signature set on the thinking block at `index`.
    Signature {
        /// Content block index.
        index: usize,
        /// The signature value.
        signature: String,
    },
    /// `citations_delta`: a citation pushed onto the text block at `index`.
    Citation {
        /// Content block index.
        index: usize,
        /// The citation.
        citation: Citation,
    },
    /// `input_json_delta`: a tool-use input buffer grew at `index`.
    InputJson {
        /// Content block index.
        index: usize,
        /// The raw partial JSON fragment just received.
        partial: String,
        /// The tolerant-parsed value of the buffer so far.
        current_input: serde_json::Value,
    },
    /// `content_block_stop`: the block at `index` is finalized.
    ContentBlockStop {
        /// Content block index.
        index: usize,
    },
    /// `message_delta`: stop metadata and/or usage merged into the snapshot.
    MessageDelta {
        /// Stop reason, if present on this delta.
        stop_reason: Option<StopReason>,
        /// Usage, if present on this delta.
        usage: Option<TokenUsage>,
    },
    /// `message_stop`: the final assembled message.
    MessageStop(MessageState),
    /// A non-fatal or fatal decoding error; fatal errors are followed by no
    /// further events.
    Error(StreamError),
    /// Cancellation was requested; fires at most once, followed by no
    /// further events.
    Abort,
    /// No bytes arrived for the configured heartbeat interval.
    Heartbeat,
}
