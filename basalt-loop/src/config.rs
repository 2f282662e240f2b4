//! Top-level agent loop configuration.

use basalt_types::{SystemPrompt, UsageLimits};
use rust_decimal::Decimal;

use crate::tool_filter::ToolFilter;

/// Per-million-token pricing used to turn [`basalt_types::TokenUsage`] into
/// a running dollar cost for `max_budget_usd` enforcement.
#[derive(Debug, Clone, Copy)]
pub struct ModelPricing {
    /// USD per million input tokens.
    pub input_rate_per_million: Decimal,
    /// USD per million output tokens.
    pub output_rate_per_million: Decimal,
}

/// Configuration for one [`crate::AgentLoop`] run.
///
/// Mirrors the embedder-facing config object of spec §4.5:
/// `{model, maxTokens, maxTurns, maxBudgetUSD, systemPrompt, allowedTools,
/// disallowedTools, permissionMode, verbose}`. `permissionMode` itself is
/// not a field here — it is resolved by the caller into a concrete
/// `PermissionGate` passed to [`crate::AgentLoop::new`], so this crate
/// never needs to know about permission modes directly.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Model identifier passed to the provider on every call.
    pub model: String,
    /// Maximum tokens the model may generate per call.
    pub max_tokens: u32,
    /// Maximum number of turns before the loop terminates with `budget`.
    /// `None` means no turn limit. `Some(0)` returns the first assistant
    /// response regardless of `stop_reason`.
    pub max_turns: Option<usize>,
    /// Maximum cumulative cost (USD) before the loop terminates with
    /// `budget`. Requires `pricing` to be set to have any effect.
    pub max_budget_usd: Option<Decimal>,
    /// Pricing used to compute cumulative cost against `max_budget_usd`.
    pub pricing: Option<ModelPricing>,
    /// Finer-grained usage limits (spec §3.1 supplement), checked in
    /// addition to `max_turns`/`max_budget_usd`.
    pub usage_limits: Option<UsageLimits>,
    /// System prompt sent with every call.
    pub system_prompt: SystemPrompt,
    /// Allow/disallow filter narrowing the tool registry for this run.
    pub tool_filter: ToolFilter,
    /// Per-tool-call output cap, in characters, before truncation.
    pub output_cap: usize,
    /// Whether to emit extra debug-level tracing (request/response bodies).
    pub verbose: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            max_tokens: 4_096,
            max_turns: None,
            max_budget_usd: None,
            pricing: None,
            usage_limits: None,
            system_prompt: SystemPrompt::default(),
            tool_filter: ToolFilter::default(),
            output_cap: basalt_tool::DEFAULT_OUTPUT_CAP,
            verbose: false,
        }
    }
}
