//! The top-level agent loop: drives turns against a [`Provider`], a
//! [`ToolRegistry`], and a [`ContextManager`] until the model stops asking
//! for tools, a budget is exhausted, or a hook halts the run.

use std::sync::Arc;

use basalt_context::ContextManager;
use basalt_session::SessionStore;
use basalt_stream::{Provider, StreamEvent};
use basalt_tool::{dispatch, PermissionGate, ToolRegistry};
use basalt_types::{
    CompletionRequest, CompletionResponse, ContentBlock, ImageSource, LoopError, Message,
    ProviderError, Session, SessionState, StopReason, StreamError, TokenUsage, ToolContext,
    ToolOutputContent, ToolResultContent, ToolResultItem,
};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::config::LoopConfig;
use crate::hook::{fire, HookAction, HookEvent, ObservabilityHook};
use crate::retry::with_backoff;
use crate::state::LoopState;

/// The final assistant message of a completed run, plus run-level
/// accounting an embedder may want to report (turns taken, total usage).
#[derive(Debug, Clone)]
pub struct AgentResult {
    /// The final assistant message.
    pub message: Message,
    /// Token usage accumulated across every model call this run made.
    pub usage: TokenUsage,
    /// Number of (user, assistant) turns appended to the context.
    pub turns: usize,
}

/// Orchestrates one conversational run: per-turn model calls, tool
/// dispatch, context compaction, and session persistence.
///
/// Generic only over the provider — unlike the narrower internal
/// predecessor this was adapted from, the context strategy is not a type
/// parameter here, since the compaction pipeline's shape is fixed
/// regardless of provider.
pub struct AgentLoop<P: Provider> {
    provider: P,
    registry: ToolRegistry,
    gate: Arc<dyn PermissionGate>,
    context: ContextManager,
    config: LoopConfig,
    session: Session,
    store: Option<SessionStore>,
    hooks: Vec<Box<dyn ObservabilityHook>>,
    cancellation: CancellationToken,
    requests_made: u64,
    tool_calls_made: u64,
    cumulative_usage: TokenUsage,
}

impl<P: Provider> AgentLoop<P> {
    /// Build a loop around a provider, tool registry, permission gate,
    /// context manager, configuration, and the session this run belongs to.
    #[must_use]
    pub fn new(
        provider: P,
        registry: ToolRegistry,
        gate: Arc<dyn PermissionGate>,
        context: ContextManager,
        config: LoopConfig,
        session: Session,
    ) -> Self {
        Self {
            provider,
            registry,
            gate,
            context,
            config,
            session,
            store: None,
            hooks: Vec::new(),
            cancellation: CancellationToken::new(),
            requests_made: 0,
            tool_calls_made: 0,
            cumulative_usage: TokenUsage::default(),
        }
    }

    /// Persist the session to `store` after every assistant message.
    #[must_use]
    pub fn with_store(mut self, store: SessionStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Register an observability hook, fired in registration order.
    #[must_use]
    pub fn with_hook(mut self, hook: Box<dyn ObservabilityHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Use an externally-owned cancellation token instead of a fresh one.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// A clone of this run's cancellation token, so a caller can cancel it
    /// from another task.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// The session as it currently stands.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run turns until the model produces a final answer, a configured
    /// budget is exhausted, or a hook halts the run.
    ///
    /// # Errors
    /// Returns `LoopError` if a provider, tool, context, or storage call
    /// fails terminally, if `max_turns`/`max_budget_usd`/`usage_limits` is
    /// exceeded, if a hook terminates the run, or if cancelled.
    pub async fn run(&mut self, input: Message) -> Result<AgentResult, LoopError> {
        self.context.set_system_prompt(self.config.system_prompt.clone());

        if is_empty_input(&input) {
            // No model call is made; the loop stays in IDLE (nothing is
            // appended to the context, nothing is persisted).
            return Ok(AgentResult {
                message: Message::assistant_text(String::new()),
                usage: TokenUsage::default(),
                turns: 0,
            });
        }

        let mut pending = input;
        let mut turns: usize = 0;
        let mut state = LoopState::Idle;
        // Carries the in-flight response between `Streaming`/`Deciding`/
        // `Dispatching`; a plain local would not survive across match arms
        // of the same `loop`.
        let mut response: Option<CompletionResponse> = None;

        loop {
            state = match state {
                LoopState::Idle => {
                    if self.cancellation.is_cancelled() {
                        self.session.metadata.state = SessionState::Halted;
                        self.persist(turns).await?;
                        return Err(LoopError::Cancelled);
                    }
                    self.context.compact_if_needed().await?;
                    LoopState::Planning
                }

                LoopState::Planning => LoopState::Streaming,

                LoopState::Streaming => {
                    let mut messages = self.context.get_messages().to_vec();
                    messages.push(pending.clone());
                    response = Some(self.call_model(messages).await?);
                    LoopState::Deciding
                }

                LoopState::Deciding => {
                    let current = response.take().expect("Streaming always sets a response");
                    if current.stop_reason == StopReason::Compaction {
                        // The provider compacted server-side instead of
                        // returning a normal stop. Not a turn: retry the
                        // identical request from Idle.
                        LoopState::Idle
                    } else {
                        self.context.append(pending.clone(), current.message.clone());
                        turns += 1;
                        self.persist(turns).await?;

                        // `max_turns == 0` means the caller wants the
                        // model's first response as-is, even if it asked
                        // for tools: return before ever dispatching.
                        if current.stop_reason != StopReason::ToolUse || self.config.max_turns == Some(0) {
                            self.session.metadata.state = SessionState::Completed;
                            self.persist(turns).await?;
                            return Ok(AgentResult {
                                message: current.message,
                                usage: self.cumulative_usage,
                                turns,
                            });
                        }

                        if let HookAction::Terminate { reason } =
                            fire(&self.hooks, HookEvent::ExitCheck { turns }).await
                        {
                            return Err(LoopError::HookTerminated(reason));
                        }
                        if let Some(reason) = self.exhaustion_reason(turns) {
                            self.session.metadata.state = SessionState::Exhausted;
                            self.persist(turns).await?;
                            return Err(reason);
                        }

                        response = Some(current);
                        LoopState::Dispatching
                    }
                }

                LoopState::Dispatching => {
                    let current = response.take().expect("Deciding always re-sets a response for this arm");
                    let tool_uses: Vec<(String, String, serde_json::Value)> = current
                        .message
                        .tool_uses()
                        .map(|(id, name, input)| (id.to_string(), name.to_string(), input.clone()))
                        .collect();

                    let turn_index = turns + 1;
                    let all_parallel_safe = !tool_uses.is_empty()
                        && tool_uses.iter().all(|(_, name, _)| {
                            self.registry.get(name).is_some_and(|t| t.descriptor().parallel_safe)
                        });

                    let blocks = if all_parallel_safe && tool_uses.len() > 1 {
                        let futures = tool_uses
                            .iter()
                            .map(|(id, name, input)| self.run_tool_call(id, name, input.clone(), turn_index));
                        futures::future::join_all(futures)
                            .await
                            .into_iter()
                            .collect::<Result<Vec<_>, _>>()?
                    } else {
                        let mut blocks = Vec::with_capacity(tool_uses.len());
                        for (id, name, input) in &tool_uses {
                            blocks.push(self.run_tool_call(id, name, input.clone(), turn_index).await?);
                        }
                        blocks
                    };

                    self.tool_calls_made += tool_uses.len() as u64;
                    pending = Message::tool_results(blocks);
                    LoopState::Idle
                }

                LoopState::Terminated(reason) => {
                    // Every terminal condition above returns directly; this
                    // arm only exists so `LoopState` stays exhaustively
                    // matched if a future caller constructs one explicitly.
                    unreachable!("run() returns before transitioning into Terminated({reason:?})")
                }
            };
        }
    }

    /// `max_turns`/`max_budget_usd`/`usage_limits` violation, if any, ready
    /// to be returned as the run's terminal error.
    fn exhaustion_reason(&self, turns: usize) -> Option<LoopError> {
        if let Some(max_turns) = self.config.max_turns {
            if turns >= max_turns {
                return Some(LoopError::MaxTurns(max_turns));
            }
        }
        if let Some(reason) = self.budget_violation() {
            return Some(LoopError::UsageLimitExceeded(reason));
        }
        if let Some(reason) = self.usage_limit_violation() {
            return Some(LoopError::UsageLimitExceeded(reason));
        }
        None
    }

    fn budget_violation(&self) -> Option<String> {
        self.config.pricing?;
        let max = self.config.max_budget_usd?;
        let total = self.session.total_cost_usd();
        if total >= max {
            Some(format!("budget ${max} reached (spent ${total})"))
        } else {
            None
        }
    }

    fn usage_limit_violation(&self) -> Option<String> {
        let limits = self.config.usage_limits?;
        if let Some(limit) = limits.request_limit {
            if self.requests_made >= limit {
                return Some(format!("request limit ({limit}) reached"));
            }
        }
        if let Some(limit) = limits.tool_calls_limit {
            if self.tool_calls_made >= limit {
                return Some(format!("tool call limit ({limit}) reached"));
            }
        }
        if let Some(limit) = limits.input_tokens_limit {
            if self.cumulative_usage.input_tokens >= limit {
                return Some(format!("input token limit ({limit}) reached"));
            }
        }
        if let Some(limit) = limits.output_tokens_limit {
            if self.cumulative_usage.output_tokens >= limit {
                return Some(format!("output token limit ({limit}) reached"));
            }
        }
        if let Some(limit) = limits.total_tokens_limit {
            let total = self.cumulative_usage.input_tokens + self.cumulative_usage.output_tokens;
            if total >= limit {
                return Some(format!("total token limit ({limit}) reached"));
            }
        }
        None
    }

    async fn call_model(&mut self, messages: Vec<Message>) -> Result<CompletionResponse, LoopError> {
        if let Some(limits) = self.config.usage_limits {
            if let Some(limit) = limits.request_limit {
                if self.requests_made >= limit {
                    return Err(LoopError::UsageLimitExceeded(format!(
                        "request limit ({limit}) reached"
                    )));
                }
            }
        }

        let tools = self.registry.filtered_definitions(
            self.config.tool_filter.allowed.as_deref(),
            self.config.tool_filter.disallowed.as_deref(),
        );

        let request = CompletionRequest {
            model: self.config.model.clone(),
            messages,
            system: Some(self.context.system_prompt().clone()),
            tools,
            max_tokens: self.config.max_tokens,
            temperature: None,
            stop_sequences: Vec::new(),
            tool_choice: None,
            thinking: None,
            enable_thinking: false,
        };

        if let HookAction::Terminate { reason } =
            fire(&self.hooks, HookEvent::PreInference { request: &request }).await
        {
            return Err(LoopError::HookTerminated(reason));
        }

        if self.config.verbose {
            tracing::debug!(model = %request.model, messages = request.messages.len(), "sending completion request");
        }

        let provider = &self.provider;
        let call_started = std::time::Instant::now();
        let stream_handle = with_backoff(|| provider.stream(request.clone())).await?;
        self.requests_made += 1;

        let message_state = self.drive_stream(stream_handle).await?;
        let call_duration_ms = u64::try_from(call_started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let response = CompletionResponse {
            id: message_state.id.clone().unwrap_or_default(),
            model: message_state.model.clone().unwrap_or_else(|| self.config.model.clone()),
            usage: message_state.usage.unwrap_or_default(),
            stop_reason: message_state.stop_reason.unwrap_or(StopReason::EndTurn),
            message: Message {
                role: basalt_types::Role::Assistant,
                content: message_state.content,
                id: message_state.id,
                model: message_state.model,
                stop_reason: message_state.stop_reason,
                usage: message_state.usage,
            },
        };

        self.cumulative_usage.add(&response.usage);
        {
            let (input_rate, output_rate) = self
                .config
                .pricing
                .map(|p| (p.input_rate_per_million, p.output_rate_per_million))
                .unwrap_or((rust_decimal::Decimal::ZERO, rust_decimal::Decimal::ZERO));
            self.session
                .usage_by_model
                .entry(response.model.clone())
                .or_default()
                .record(&response.usage, call_duration_ms, input_rate, output_rate);
        }

        if let HookAction::Terminate { reason } =
            fire(&self.hooks, HookEvent::PostInference { response: &response }).await
        {
            return Err(LoopError::HookTerminated(reason));
        }

        Ok(response)
    }

    async fn drive_stream(
        &self,
        mut stream: basalt_stream::MessageStream,
    ) -> Result<basalt_stream::MessageState, LoopError> {
        loop {
            tokio::select! {
                biased;
                () = self.cancellation.cancelled() => {
                    return Err(LoopError::Cancelled);
                }
                event = stream.next() => {
                    match event {
                        Some(StreamEvent::MessageStop(state)) => return Ok(state),
                        Some(StreamEvent::Error(err)) => {
                            return Err(LoopError::Provider(ProviderError::Stream(err)));
                        }
                        Some(StreamEvent::Abort) => return Err(LoopError::Cancelled),
                        Some(_) => continue,
                        None => {
                            return Err(LoopError::Provider(ProviderError::Stream(StreamError::UnexpectedEof)));
                        }
                    }
                }
            }
        }
    }

    async fn run_tool_call(
        &self,
        tool_use_id: &str,
        name: &str,
        input: serde_json::Value,
        turn_index: usize,
    ) -> Result<ContentBlock, LoopError> {
        match fire(&self.hooks, HookEvent::PreToolUse { tool_name: name, input: &input }).await {
            HookAction::Terminate { reason } => return Err(LoopError::HookTerminated(reason)),
            HookAction::Skip { reason } => {
                return Ok(ContentBlock::error_result(tool_use_id, format!("skipped: {reason}")));
            }
            HookAction::Continue => {}
        }

        let mut ctx = ToolContext::new(self.session.metadata.id.clone(), tool_use_id.to_string(), turn_index);
        ctx.cancellation = self.cancellation.clone();

        let (outcome, _kind) = dispatch(
            &self.registry,
            self.gate.as_ref(),
            name,
            input,
            ctx,
            self.config.output_cap,
        )
        .await;

        if let HookAction::Terminate { reason } =
            fire(&self.hooks, HookEvent::PostToolUse { tool_name: name, outcome: &outcome }).await
        {
            return Err(LoopError::HookTerminated(reason));
        }

        Ok(ContentBlock::ToolResult {
            tool_use_id: tool_use_id.to_string(),
            content: outcome_to_result_content(outcome.content),
            is_error: outcome.is_error,
        })
    }

    async fn persist(&mut self, turns: usize) -> Result<(), LoopError> {
        self.session.messages = self.context.get_messages().to_vec();
        self.session.metadata.turn_count = turns;
        self.session.metadata.updated_at = chrono::Utc::now();
        if let Some(store) = &self.store {
            store.save(&self.session).await?;
        }
        Ok(())
    }
}

/// Whether `message` carries no usable content — an empty content array, or
/// only blank text blocks. A user turn like this never reaches the model.
fn is_empty_input(message: &Message) -> bool {
    message.content.is_empty()
        || message
            .content
            .iter()
            .all(|block| matches!(block, ContentBlock::Text { text, .. } if text.trim().is_empty()))
}

/// `ToolOutcome::content` (the dispatch-facing shape) into the
/// `tool_result` content shape a message actually carries: a bare string
/// when the outcome is a single text item, structured items otherwise.
fn outcome_to_result_content(mut content: Vec<ToolOutputContent>) -> ToolResultContent {
    if content.len() == 1 && matches!(content[0], ToolOutputContent::Text { .. }) {
        if let ToolOutputContent::Text { text } = content.remove(0) {
            return ToolResultContent::Text(text);
        }
    }
    let items = content
        .into_iter()
        .map(|item| match item {
            ToolOutputContent::Text { text } => ToolResultItem::Text { text },
            ToolOutputContent::Image { media_type, data } => {
                ToolResultItem::Image { source: ImageSource::Base64 { media_type, data } }
            }
        })
        .collect();
    ToolResultContent::Items(items)
}
