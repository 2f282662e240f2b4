//! Persisted session state: transcript, todos, and usage accounting
//! (spec §3, §6's session JSON format).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Message, Role};

/// Lifecycle state of a session (spec §6).
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Actively accepting turns.
    Active,
    /// Ended normally (the loop reached `end_turn` with no pending work).
    Completed,
    /// Ended because a budget or limit was exceeded.
    Exhausted,
    /// Ended because a hook halted the run.
    Halted,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Active
    }
}

/// Status of a single todo item tracked during a run (spec §3).
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    /// Not yet started.
    Pending,
    /// Currently being worked.
    InProgress,
    /// Finished.
    Completed,
}

/// A single self-tracked todo item (spec §3).
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodoItem {
    /// Stable id within the session.
    pub id: String,
    /// Short imperative description.
    pub content: String,
    /// Current status.
    pub status: TodoStatus,
    /// Present-continuous label shown while this item is `in_progress`
    /// (e.g. "Running tests" for a "Run tests" item).
    #[serde(rename = "activeForm")]
    pub active_form: String,
}

impl TodoItem {
    /// Construct a new pending todo.
    #[must_use]
    pub fn new(id: impl Into<String>, content: impl Into<String>, active_form: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            status: TodoStatus::Pending,
            active_form: active_form.into(),
        }
    }
}

/// Cumulative model usage for a single model within a session (spec §3,
/// §6).
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelUsage {
    /// Total input tokens billed to this model.
    pub input_tokens: u64,
    /// Total output tokens billed to this model.
    pub output_tokens: u64,
    /// Total tokens served from cache.
    pub cache_read_tokens: u64,
    /// Estimated USD cost attributed to this model.
    pub cost_usd: Decimal,
    /// Cumulative wall-clock time spent in calls to this model, in
    /// milliseconds (spec §3 `usage.totalDuration`, §6
    /// `totalAPIDuration`).
    pub duration_ms: u64,
}

impl ModelUsage {
    /// Accumulate a single completion's usage and call latency into this
    /// running total, pricing the tokens with the given per-million-token
    /// rates.
    pub fn record(
        &mut self,
        usage: &crate::TokenUsage,
        duration_ms: u64,
        input_rate_per_million: Decimal,
        output_rate_per_million: Decimal,
    ) {
        self.input_tokens += usage.input_tokens;
        self.output_tokens += usage.output_tokens;
        self.cache_read_tokens += usage.cache_read_tokens.unwrap_or(0);
        self.duration_ms += duration_ms;
        let million = Decimal::from(1_000_000u32);
        self.cost_usd += Decimal::from(usage.input_tokens) * input_rate_per_million / million;
        self.cost_usd += Decimal::from(usage.output_tokens) * output_rate_per_million / million;
    }
}

/// Metadata about a session, separated from its transcript so summaries and
/// listings don't need to load the full message history (spec §6).
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct SessionMetadata {
    /// Session id, also the storage key.
    pub id: String,
    /// When the session was first created.
    pub created_at: DateTime<Utc>,
    /// When the session was last written.
    pub updated_at: DateTime<Utc>,
    /// Current lifecycle state.
    pub state: SessionState,
    /// Number of completed turns.
    pub turn_count: usize,
    /// Git branch active when the session was created, if detectable.
    pub git_branch: Option<String>,
    /// Working directory the session was started from.
    pub cwd: Option<String>,
    /// Short human-facing summary, set by summarization or the caller.
    /// Produced on disk as `customTitle` (spec §6).
    pub summary: Option<String>,
}

/// A full persisted session: metadata, transcript, todos, and per-model
/// usage accounting (spec §3, §6).
///
/// `Serialize`/`Deserialize` are hand-written rather than derived: the
/// on-disk shape (spec §6 "Session JSON format (produced)") nests `todos`
/// and usage under a `state` envelope and uses field names that don't match
/// this struct's own layout, so a plain derive would produce the wrong
/// wire format.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct Session {
    /// Session metadata.
    pub metadata: SessionMetadata,
    /// Full message transcript, in order.
    pub messages: Vec<Message>,
    /// Self-tracked todo list.
    pub todos: Vec<TodoItem>,
    /// Cumulative usage, keyed by model identifier.
    pub usage_by_model: BTreeMap<String, ModelUsage>,
}

impl Session {
    /// Construct a new, empty active session.
    #[must_use]
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            metadata: SessionMetadata {
                id: id.into(),
                created_at,
                updated_at: created_at,
                state: SessionState::Active,
                turn_count: 0,
                git_branch: None,
                cwd: None,
                summary: None,
            },
            messages: Vec::new(),
            todos: Vec::new(),
            usage_by_model: BTreeMap::new(),
        }
    }

    /// Total USD cost across every model used in this session.
    #[must_use]
    pub fn total_cost_usd(&self) -> Decimal {
        self.usage_by_model.values().map(|u| u.cost_usd).sum()
    }

    /// Total wall-clock time spent across every model call in this session,
    /// in milliseconds (spec §6 `totalAPIDuration`).
    #[must_use]
    pub fn total_api_duration_ms(&self) -> u64 {
        self.usage_by_model.values().map(|u| u.duration_ms).sum()
    }

    fn first_prompt(&self) -> Option<String> {
        self.messages
            .iter()
            .find(|m| m.role == Role::User)
            .map(Message::text)
            .filter(|t| !t.is_empty())
    }
}

/// On-disk shape of the `state` envelope (spec §6).
#[derive(Serialize, Deserialize)]
struct WireState {
    #[serde(rename = "sessionId")]
    session_id: String,
    cwd: String,
    #[serde(rename = "startTime")]
    start_time: i64,
    #[serde(rename = "totalCostUSD")]
    total_cost_usd: Decimal,
    #[serde(rename = "totalAPIDuration")]
    total_api_duration: u64,
    #[serde(rename = "modelUsage")]
    model_usage: BTreeMap<String, ModelUsage>,
    todos: Vec<TodoItem>,
}

/// On-disk shape of the `metadata` envelope (spec §6), plus two fields
/// (`turnCount`, `lifecycleState`) the documented shape doesn't mention but
/// which a resumed session needs to recover its budget accounting and
/// completion state.
#[derive(Serialize, Deserialize)]
struct WireMetadata {
    #[serde(rename = "gitBranch", skip_serializing_if = "Option::is_none", default)]
    git_branch: Option<String>,
    #[serde(rename = "customTitle", skip_serializing_if = "Option::is_none", default)]
    custom_title: Option<String>,
    #[serde(rename = "firstPrompt", skip_serializing_if = "Option::is_none", default)]
    first_prompt: Option<String>,
    #[serde(rename = "projectPath")]
    project_path: String,
    created: i64,
    modified: i64,
    #[serde(rename = "messageCount")]
    message_count: usize,
    #[serde(rename = "turnCount", default)]
    turn_count: usize,
    #[serde(rename = "lifecycleState", default)]
    lifecycle_state: SessionState,
}

#[derive(Serialize, Deserialize)]
struct WireSession {
    state: WireState,
    messages: Vec<Message>,
    metadata: WireMetadata,
}

impl Serialize for Session {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Value, S::Error> {
        let cwd = self.metadata.cwd.clone().unwrap_or_default();
        let wire = WireSession {
            state: WireState {
                session_id: self.metadata.id.clone(),
                cwd: cwd.clone(),
                start_time: self.metadata.created_at.timestamp_millis(),
                total_cost_usd: self.total_cost_usd(),
                total_api_duration: self.total_api_duration_ms(),
                model_usage: self.usage_by_model.clone(),
                todos: self.todos.clone(),
            },
            messages: self.messages.clone(),
            metadata: WireMetadata {
                git_branch: self.metadata.git_branch.clone(),
                custom_title: self.metadata.summary.clone(),
                first_prompt: self.first_prompt(),
                project_path: cwd,
                created: self.metadata.created_at.timestamp_millis(),
                modified: self.metadata.updated_at.timestamp_millis(),
                message_count: self.messages.len(),
                turn_count: self.metadata.turn_count,
                lifecycle_state: self.metadata.state,
            },
        };
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Session {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = WireSession::deserialize(deserializer)?;
        let created_at = DateTime::from_timestamp_millis(wire.state.start_time)
            .ok_or_else(|| serde::de::Error::custom("invalid startTime"))?;
        let updated_at = DateTime::from_timestamp_millis(wire.metadata.modified).unwrap_or(created_at);
        Ok(Session {
            metadata: SessionMetadata {
                id: wire.state.session_id,
                created_at,
                updated_at,
                state: wire.metadata.lifecycle_state,
                turn_count: wire.metadata.turn_count,
                git_branch: wire.metadata.git_branch,
                cwd: Some(wire.state.cwd).filter(|c| !c.is_empty()),
                summary: wire.metadata.custom_title,
            },
            messages: wire.messages,
            todos: wire.state.todos,
            usage_by_model: wire.state.model_usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_usage_record_accumulates_cost_and_duration() {
        let mut usage = ModelUsage::default();
        usage.record(
            &crate::TokenUsage {
                input_tokens: 1_000_000,
                output_tokens: 500_000,
                cache_read_tokens: None,
                cache_creation_tokens: None,
            },
            250,
            Decimal::new(3, 0),
            Decimal::new(15, 0),
        );
        assert_eq!(usage.cost_usd, Decimal::new(3, 0) + Decimal::new(15, 0) / Decimal::new(2, 0));
        assert_eq!(usage.duration_ms, 250);
    }

    #[test]
    fn session_total_cost_and_duration_sum_models() {
        let mut session = Session::new("s1", Utc::now());
        session.usage_by_model.insert(
            "model-a".into(),
            ModelUsage {
                cost_usd: Decimal::new(5, 1),
                duration_ms: 100,
                ..Default::default()
            },
        );
        session.usage_by_model.insert(
            "model-b".into(),
            ModelUsage {
                cost_usd: Decimal::new(25, 2),
                duration_ms: 40,
                ..Default::default()
            },
        );
        assert_eq!(session.total_cost_usd(), Decimal::new(75, 2));
        assert_eq!(session.total_api_duration_ms(), 140);
    }

    #[test]
    fn todo_item_starts_pending() {
        let todo = TodoItem::new("t1", "write tests", "Writing tests");
        assert_eq!(todo.status, TodoStatus::Pending);
        assert_eq!(todo.active_form, "Writing tests");
    }

    #[test]
    fn serializes_to_documented_envelope_shape() {
        let mut session = Session::new("s1", Utc::now());
        session.metadata.cwd = Some("/work/proj".to_string());
        session.messages.push(Message::user_text("hello"));
        session.todos.push(TodoItem::new("t1", "write tests", "Writing tests"));

        let value = serde_json::to_value(&session).unwrap();
        assert!(value.get("state").is_some());
        assert_eq!(value["state"]["sessionId"], "s1");
        assert_eq!(value["state"]["cwd"], "/work/proj");
        assert_eq!(value["state"]["todos"][0]["activeForm"], "Writing tests");
        assert_eq!(value["metadata"]["projectPath"], "/work/proj");
        assert_eq!(value["metadata"]["firstPrompt"], "hello");
        assert_eq!(value["metadata"]["messageCount"], 1);
        assert!(value.get("todos").is_none(), "todos must not live at the top level");
        assert!(value.get("usage_by_model").is_none());
    }

    #[test]
    fn round_trips_through_the_wire_shape() {
        let mut session = Session::new("s1", Utc::now());
        session.metadata.cwd = Some("/work/proj".to_string());
        session.metadata.turn_count = 3;
        session.metadata.state = SessionState::Completed;
        session.messages.push(Message::user_text("hi"));
        session.usage_by_model.insert(
            "claude-x".into(),
            ModelUsage { input_tokens: 10, duration_ms: 50, ..Default::default() },
        );

        let json = serde_json::to_string(&session).unwrap();
        let restored: Session = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.metadata.id, session.metadata.id);
        assert_eq!(restored.metadata.cwd, session.metadata.cwd);
        assert_eq!(restored.metadata.turn_count, 3);
        assert_eq!(restored.metadata.state, SessionState::Completed);
        assert_eq!(restored.messages.len(), 1);
        assert_eq!(restored.usage_by_model["claude-x"].input_tokens, 10);
    }
}
