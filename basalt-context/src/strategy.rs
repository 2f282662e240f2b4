//! The `ContextStrategy` trait, its type-erased form for dynamic storage,
//! and the `CompositeStrategy` that chains stages in order (spec §4.3.1).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use basalt_types::{ContextError, Message};

use crate::estimate::TokenCounter;

/// One stage of context compaction.
///
/// `compact` is RPITIT rather than `async_trait` so implementors avoid an
/// unnecessary allocation on the hot per-turn path; this makes the trait
/// itself not object-safe, which is why [`CompositeStrategy`] stores
/// [`BoxedStrategy`] wrappers instead of `Vec<dyn ContextStrategy>`.
pub trait ContextStrategy: Send + Sync {
    /// Whether this stage should run given the current messages and an
    /// already-computed token estimate.
    fn should_compact(&self, messages: &[Message], token_count: usize) -> bool;

    /// Run this stage, returning the (possibly unchanged) message list.
    fn compact(&self, messages: Vec<Message>) -> impl Future<Output = Result<Vec<Message>, ContextError>> + Send;

    /// Estimate the token cost of a message sequence, as this stage sees
    /// it (stages may use a custom [`TokenCounter`]).
    fn token_estimate(&self, messages: &[Message]) -> usize;

    /// Number of most-recent messages this stage wants shielded from
    /// every stage in the pipeline, not just itself. Most stages leave
    /// this at the default of `0`; [`crate::tail::TailPreservingStrategy`]
    /// is the one that sets it.
    fn protected_tail(&self) -> usize {
        0
    }
}

type CompactFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<Message>, ContextError>> + Send + 'a>>;

/// Dyn-compatible mirror of [`ContextStrategy`], implemented for every `S:
/// ContextStrategy` via a blanket impl. Internal to this crate —
/// [`BoxedStrategy`] is the public-facing wrapper.
trait ErasedStrategy: Send + Sync {
    fn erased_compact<'a>(&'a self, messages: Vec<Message>) -> CompactFuture<'a>;
    fn erased_token_estimate(&self, messages: &[Message]) -> usize;
    fn erased_should_compact(&self, messages: &[Message], token_count: usize) -> bool;
    fn erased_protected_tail(&self) -> usize;
}

impl<S: ContextStrategy> ErasedStrategy for S {
    fn erased_compact<'a>(&'a self, messages: Vec<Message>) -> CompactFuture<'a> {
        Box::pin(self.compact(messages))
    }

    fn erased_token_estimate(&self, messages: &[Message]) -> usize {
        self.token_estimate(messages)
    }

    fn erased_should_compact(&self, messages: &[Message], token_count: usize) -> bool {
        self.should_compact(messages, token_count)
    }

    fn erased_protected_tail(&self) -> usize {
        self.protected_tail()
    }
}

/// A type-erased [`ContextStrategy`], storable in a `Vec` for
/// [`CompositeStrategy`].
#[derive(Clone)]
pub struct BoxedStrategy(Arc<dyn ErasedStrategy>);

impl BoxedStrategy {
    /// Wrap a concrete strategy.
    #[must_use]
    pub fn new<S: ContextStrategy + 'static>(strategy: S) -> Self {
        Self(Arc::new(strategy))
    }
}

/// Chains compaction stages in order, re-checking the token budget after
/// each one and stopping as soon as the budget is met (spec §4.3:
/// "apply compression in this order until fit or exhaustion").
///
/// The last `protected_tail` messages (the max over every configured
/// stage's own `protected_tail()`) are held out of every stage's `compact`
/// call and reattached unchanged afterward — this is how
/// `TailPreservingStrategy`'s "always keep the last N turns intact"
/// applies across the whole pipeline, not just its own no-op stage.
pub struct CompositeStrategy {
    strategies: Vec<BoxedStrategy>,
    counter: TokenCounter,
    max_tokens: usize,
    protected_tail: usize,
}

impl CompositeStrategy {
    /// Build a composite from an ordered stage list and a token budget.
    #[must_use]
    pub fn new(strategies: Vec<BoxedStrategy>, max_tokens: usize) -> Self {
        let protected_tail = strategies.iter().map(|s| s.0.erased_protected_tail()).max().unwrap_or(0);
        Self { strategies, counter: TokenCounter::new(), max_tokens, protected_tail }
    }

    /// The active token budget.
    #[must_use]
    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }
}

impl ContextStrategy for CompositeStrategy {
    fn should_compact(&self, messages: &[Message], token_count: usize) -> bool {
        let _ = messages;
        token_count > self.max_tokens
    }

    fn compact(&self, messages: Vec<Message>) -> impl Future<Output = Result<Vec<Message>, ContextError>> + Send {
        let protected_tail = self.protected_tail;
        let max_tokens = self.max_tokens;
        let strategies: Vec<Arc<dyn ErasedStrategy>> = self.strategies.iter().map(|s| Arc::clone(&s.0)).collect();
        let counter = TokenCounter::new();

        async move {
            let split = messages.len().saturating_sub(protected_tail);
            let mut current = messages;
            let tail = current.split_off(split);

            for strategy in &strategies {
                let token_count = counter.estimate_messages(&current) + counter.estimate_messages(&tail);
                if token_count <= max_tokens {
                    break;
                }
                current = strategy.erased_compact(current).await?;
            }

            current.extend(tail);
            Ok(current)
        }
    }

    fn token_estimate(&self, messages: &[Message]) -> usize {
        self.counter.estimate_messages(messages)
    }
}
