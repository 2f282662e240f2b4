#![deny(missing_docs)]
//! Fault-tolerant SSE decoder for the basalt agent runtime.
//!
//! Three stacked layers, matching the wire path from an HTTP response body
//! down to a typed event: [`line_decoder`] turns bytes into lines,
//! [`sse`] turns lines into raw `event`/`data`/`id` triples, and
//! [`reducer`] turns those into [`StreamEvent`]s against a running
//! [`MessageState`] snapshot. [`decode_stream`] wires all three together
//! with cancellation, timeout, and heartbeat support. [`tolerant_json`] is
//! used internally by the reducer to resolve in-progress tool-use input.

mod decode;
mod event;
mod line_decoder;
mod provider;
mod reducer;
mod sse;
mod tolerant_json;

pub use decode::{decode_stream, DecodeOptions, EVENT_QUEUE_CAPACITY};
pub use event::{MessageState, StreamEvent};
pub use line_decoder::LineDecoder;
pub use provider::{MessageStream, Provider};
pub use reducer::Reducer;
pub use sse::{RawSseEvent, SseLineDecoder};
pub use tolerant_json::tolerant_parse;
