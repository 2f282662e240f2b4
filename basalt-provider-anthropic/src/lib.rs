#![deny(missing_docs)]
//! Anthropic Messages API provider for the basalt agent runtime.
//!
//! Implements [`basalt_stream::Provider`] against Anthropic's hosted API.
//! SSE parsing is not reimplemented here — `basalt-stream::decode_stream`
//! already owns the wire-to-`StreamEvent` pipeline; this crate only maps
//! requests/responses to Anthropic's JSON shape and feeds its response body
//! into that decoder.

mod client;
mod error;
mod mapping;
mod streaming;

pub use client::Anthropic;
