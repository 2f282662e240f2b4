//! The loop's turn-level state machine (spec §4.5.1): each transition is a
//! match arm returning the next state, rather than a handwritten trampoline.

use basalt_types::LoopError;

/// Why a run stopped without producing a final assistant response.
///
/// Mirrors spec §6's exit codes (`2` invalid input/config, `3` budget
/// exceeded, `4` cancelled, `5` fatal model error). Normal end-of-turn is
/// not represented here: it is returned as an `Ok(AgentResult)` from
/// [`crate::AgentLoop::run`], never as a `Terminated` state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// `max_turns` or `max_budget_usd`/`usage_limits` was reached.
    Budget,
    /// The run's cancellation token fired mid-turn.
    Cancelled,
    /// A non-retryable provider error ended the run.
    FatalError(String),
    /// Configuration or caller input was invalid before any call was made.
    InvalidInput(String),
}

impl ExitReason {
    /// The process exit code an embedder should surface for this reason.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            ExitReason::InvalidInput(_) => 2,
            ExitReason::Budget => 3,
            ExitReason::Cancelled => 4,
            ExitReason::FatalError(_) => 5,
        }
    }
}

/// One turn's position in the inner per-call state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting to start the next turn.
    Idle,
    /// Building the request (messages, tools, system prompt) for this call.
    Planning,
    /// Driving the streaming decoder to a complete assistant message.
    Streaming,
    /// Inspecting `stop_reason` to decide whether tools must run.
    Deciding,
    /// Dispatching one or more tool calls.
    Dispatching,
    /// The run has ended; no further turns will be taken.
    Terminated(ExitReason),
}

/// Map an [`AgentLoop::run`](crate::AgentLoop::run) result to the process
/// exit code an embedder's CLI should return (spec §6): `0` on success,
/// otherwise whatever [`ExitReason`] the error corresponds to.
#[must_use]
pub fn exit_code<T>(result: &Result<T, LoopError>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(LoopError::Cancelled) => ExitReason::Cancelled.exit_code(),
        Err(LoopError::MaxTurns(_)) | Err(LoopError::UsageLimitExceeded(_)) => ExitReason::Budget.exit_code(),
        Err(err) => ExitReason::FatalError(err.to_string()).exit_code(),
    }
}
