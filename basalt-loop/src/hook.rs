//! Observability hook points threaded through the agent loop's inner
//! states (spec §4.5.1): pre-inference, post-inference, pre/post tool use,
//! and the exit check. The permission engine and session-persistence
//! requirements are what motivate keeping a hook point here at all, not a
//! goal of exposing a third-party plugin surface.

use basalt_types::{CompletionRequest, CompletionResponse, ToolOutcome};

/// Where in the turn's inner loop a hook fires, and what it can see there.
#[non_exhaustive]
#[derive(Debug, Clone, Copy)]
pub enum HookEvent<'a> {
    /// Before each model call.
    PreInference {
        /// The request about to be sent.
        request: &'a CompletionRequest,
    },
    /// After the model responds, before tool dispatch.
    PostInference {
        /// The response just received.
        response: &'a CompletionResponse,
    },
    /// Before a single tool call is dispatched.
    PreToolUse {
        /// Tool name.
        tool_name: &'a str,
        /// Tool input, prior to schema validation.
        input: &'a serde_json::Value,
    },
    /// After a tool call completes, before its result enters the
    /// conversation.
    PostToolUse {
        /// Tool name.
        tool_name: &'a str,
        /// The dispatched outcome.
        outcome: &'a ToolOutcome,
    },
    /// At each turn boundary, before the budget check runs.
    ExitCheck {
        /// Turns completed so far.
        turns: usize,
    },
}

/// What a hook decides to do at the point it fired.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookAction {
    /// Proceed normally.
    Continue,
    /// Halt the run. Only meaningful outside `PreToolUse`; the loop
    /// terminates with `LoopError::HookTerminated(reason)`.
    Terminate {
        /// Why the run is being halted.
        reason: String,
    },
    /// Skip this tool call without invoking its handler. Only meaningful
    /// at `PreToolUse`; a synthetic error `tool_result` is backfilled.
    Skip {
        /// Why the call was skipped.
        reason: String,
    },
}

/// A hook that observes (and may intervene in) the agent loop's inner
/// iteration. Hooks are registered externally and fired in registration
/// order at each point; the loop doesn't know or care who's watching.
///
/// `async_trait`-based rather than RPITIT: unlike `basalt_stream::Provider`
/// (always consumed through a concrete generic `P`), hooks are stored as a
/// heterogeneous `Vec` and must be dyn-dispatched, so there is no boxing
/// cost to avoid here.
#[async_trait::async_trait]
pub trait ObservabilityHook: Send + Sync {
    /// Called at every hook point the loop reaches. Implementations that
    /// only care about a subset of points should match and fall through to
    /// `HookAction::Continue`.
    async fn on_event(&self, event: HookEvent<'_>) -> HookAction;
}

/// Fire every hook in order for `event`, short-circuiting on the first
/// non-`Continue` action.
pub(crate) async fn fire(hooks: &[Box<dyn ObservabilityHook>], event: HookEvent<'_>) -> HookAction {
    for hook in hooks {
        let action = hook.on_event(event).await;
        if action != HookAction::Continue {
            return action;
        }
    }
    HookAction::Continue
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysTerminate;

    #[async_trait::async_trait]
    impl ObservabilityHook for AlwaysTerminate {
        async fn on_event(&self, _event: HookEvent<'_>) -> HookAction {
            HookAction::Terminate { reason: "stop".to_string() }
        }
    }

    struct AlwaysContinue;

    #[async_trait::async_trait]
    impl ObservabilityHook for AlwaysContinue {
        async fn on_event(&self, _event: HookEvent<'_>) -> HookAction {
            HookAction::Continue
        }
    }

    #[tokio::test]
    async fn fire_short_circuits_on_first_non_continue() {
        let hooks: Vec<Box<dyn ObservabilityHook>> = vec![Box::new(AlwaysContinue), Box::new(AlwaysTerminate), Box::new(AlwaysTerminate)];
        let action = fire(&hooks, HookEvent::ExitCheck { turns: 0 }).await;
        assert_eq!(action, HookAction::Terminate { reason: "stop".to_string() });
    }

    #[tokio::test]
    async fn fire_returns_continue_when_all_continue() {
        let hooks: Vec<Box<dyn ObservabilityHook>> = vec![Box::new(AlwaysContinue), Box::new(AlwaysContinue)];
        let action = fire(&hooks, HookEvent::ExitCheck { turns: 0 }).await;
        assert_eq!(action, HookAction::Continue);
    }
}
