//! Wires an Anthropic SSE response body into `basalt-stream`'s decoder.
//!
//! Reference: <https://docs.anthropic.com/en/api/messages-streaming>

use basalt_stream::{decode_stream, DecodeOptions, MessageStream};
use reqwest::Response;

/// Turn an HTTP response body into a [`MessageStream`] of decoded
/// [`basalt_stream::StreamEvent`]s. All SSE parsing lives in
/// `basalt-stream`; this just adapts reqwest's byte stream to its input.
pub(crate) fn stream_completion(response: Response) -> MessageStream {
    Box::pin(decode_stream(response.bytes_stream(), DecodeOptions::default()))
}
