//! Conversational context window management: token estimation, the
//! five-stage compaction pipeline, and the [`ContextManager`] that
//! orchestrates them (spec §4.3).
#![deny(missing_docs)]

mod code_block;
mod estimate;
mod hard_drop;
mod manager;
mod pairing;
mod strategy;
mod summarization;
mod tail;
mod tool_result;

pub use code_block::{CodeBlockCollapsingStrategy, DEFAULT_LINE_THRESHOLD};
pub use estimate::TokenCounter;
pub use hard_drop::HardDropStrategy;
pub use manager::{CompactionAnalysis, ContextManager, DEFAULT_NEAR_LIMIT_RATIO};
pub use pairing::{nearest_safe_boundary_at_most, oldest_droppable_chunk_len, safe_boundaries};
pub use strategy::{BoxedStrategy, CompositeStrategy, ContextStrategy};
pub use summarization::SummarizationStrategy;
pub use tail::TailPreservingStrategy;
pub use tool_result::{ToolResultTrimmingStrategy, DEFAULT_TOOL_RESULT_CAP};
