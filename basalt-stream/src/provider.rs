//! The model provider interface consumed by the agent loop and context
//! manager (spec §6 "Model provider interface").

use std::future::Future;
use std::pin::Pin;

use basalt_types::{CompletionRequest, CompletionResponse, ProviderError};
use futures::Stream;

use crate::StreamEvent;

/// A fully decoded streaming completion: the caller polls this for
/// [`StreamEvent`]s the same way it would consume `decode_stream`'s output
/// directly.
pub type MessageStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// A model provider, implemented once per backend (Anthropic-hosted,
/// Bedrock, Vertex, ...) and consumed generically by `basalt-context`'s
/// summarization strategy and `basalt-loop`'s agent loop.
///
/// RPITIT rather than `async_trait`: every caller of `Provider` is generic
/// over a concrete `P`, never stored as `dyn Provider`, so there's no need
/// to pay the boxing cost this trait's implementors would otherwise incur.
pub trait Provider: Send + Sync {
    /// Run a single non-streaming completion.
    fn complete(
        &self,
        req: CompletionRequest,
    ) -> impl Future<Output = Result<CompletionResponse, ProviderError>> + Send;

    /// Run a streaming completion, returning a stream of decoded events.
    fn stream(
        &self,
        req: CompletionRequest,
    ) -> impl Future<Output = Result<MessageStream, ProviderError>> + Send;
}
