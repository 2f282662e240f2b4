//! Event → `MessageState` reducer (spec §4.1).

use std::collections::HashMap;

use basalt_types::{Citation, ContentBlock, ImageSource, Role, StopReason, StreamError, TokenUsage};
use serde_json::Value;

use crate::event::{MessageState, StreamEvent};
use crate::sse::RawSseEvent;
use crate::tolerant_json::tolerant_parse;

/// Reduces raw SSE events into `MessageState` snapshots, tracking per-block
/// tool-use JSON buffers across `input_json_delta`s.
#[derive(Debug, Default)]
pub struct Reducer {
    current: Option<MessageState>,
    tool_json_buf: HashMap<usize, String>,
    tool_json_value: HashMap<usize, Value>,
    ended: bool,
}

impl Reducer {
    /// Construct a fresh reducer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this reducer has reached a terminal state (`message_stop` or
    /// a fatal error); no further events should be applied after this.
    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Apply one raw SSE event, returning the `StreamEvent`s it produces.
    /// A fatal decode error is returned as the last element and sets
    /// `is_ended()`.
    pub fn apply(&mut self, raw: &RawSseEvent) -> Vec<StreamEvent> {
        if raw.data.is_empty() || raw.data == "[DONE]" {
            return vec![];
        }
        let json: Value = match serde_json::from_str(&raw.data) {
            Ok(v) => v,
            Err(e) => return self.fatal(StreamError::MalformedEvent(e.to_string())),
        };

        match raw.event.as_str() {
            "message_start" => self.on_message_start(&json),
            "content_block_start" => self.on_content_block_start(&json),
            "content_block_delta" => self.on_content_block_delta(&json),
            "content_block_stop" => self.on_content_block_stop(&json),
            "message_delta" => self.on_message_delta(&json),
            "message_stop" => self.on_message_stop(),
            "ping" => vec![],
            "error" => {
                let message = json["error"]["message"]
                    .as_str()
                    .unwrap_or("unknown streaming error")
                    .to_string();
                self.fatal(StreamError::ProviderReported(message))
            }
            _ => vec![],
        }
    }

    fn fatal(&mut self, err: StreamError) -> Vec<StreamEvent> {
        self.ended = true;
        vec![StreamEvent::Error(err)]
    }

    fn state_mut(&mut self) -> &mut MessageState {
        self.current.get_or_insert_with(MessageState::default)
    }

    fn on_message_start(&mut self, json: &Value) -> Vec<StreamEvent> {
        let message = &json["message"];
        let state = MessageState {
            id: message["id"].as_str().map(str::to_string),
            model: message["model"].as_str().map(str::to_string),
            role: Some(Role::Assistant),
            content: Vec::new(),
            stop_reason: None,
            stop_sequence: None,
            usage: None,
        };
        self.current = Some(state.clone());
        vec![StreamEvent::MessageStart(state)]
    }

    fn on_content_block_start(&mut self, json: &Value) -> Vec<StreamEvent> {
        let Some(index) = json["index"].as_u64().map(|n| n as usize) else {
            return self.fatal(StreamError::MalformedEvent("content_block_start missing index".into()));
        };
        let block = &json["content_block"];
        let block_type = block["type"].as_str().unwrap_or("");

        let content_len = self.state_mut().content.len();
        if index != content_len {
            return self.fatal(StreamError::MalformedEvent(format!(
                "content_block_start index {index} out of range (expected {content_len})"
            )));
        }

        let new_block = match block_type {
            "text" => ContentBlock::Text {
                text: block["text"].as_str().unwrap_or("").to_string(),
                citations: Vec::new(),
            },
            "thinking" => ContentBlock::Thinking {
                thinking: block["thinking"].as_str().unwrap_or("").to_string(),
                signature: None,
            },
            "redacted_thinking" => ContentBlock::RedactedThinking {
                data: block["data"].as_str().unwrap_or("").to_string(),
            },
            "tool_use" => {
                self.tool_json_buf.insert(index, String::new());
                ContentBlock::ToolUse {
                    id: block["id"].as_str().unwrap_or("").to_string(),
                    name: block["name"].as_str().unwrap_or("").to_string(),
                    input: serde_json::json!({}),
                }
            }
            "image" => ContentBlock::Image {
                source: ImageSource::Url {
                    url: block["source"]["url"].as_str().unwrap_or("").to_string(),
                },
            },
            other => {
                return self.fatal(StreamError::MalformedEvent(format!(
                    "unknown content_block type {other:?}"
                )));
            }
        };
        self.state_mut().content.push(new_block);
        vec![]
    }

    fn on_content_block_delta(&mut self, json: &Value) -> Vec<StreamEvent> {
        let Some(index) = json["index"].as_u64().map(|n| n as usize) else {
            return self.fatal(StreamError::MalformedEvent("content_block_delta missing index".into()));
        };
        if index >= self.state_mut().content.len() {
            return self.fatal(StreamError::MalformedEvent(format!(
                "content_block_delta for index {index} with no matching content_block_start"
            )));
        }
        let delta = &json["delta"];
        let delta_type = delta["type"].as_str().unwrap_or("");

        match delta_type {
            "text_delta" => {
                let text_delta = delta["text"].as_str().unwrap_or("").to_string();
                match &mut self.state_mut().content[index] {
                    ContentBlock::Text { text, .. } => text.push_str(&text_delta),
                    _ => return self.fatal(StreamError::MalformedEvent(
                        "text_delta on a non-text block".into(),
                    )),
                }
                vec![StreamEvent::Text {
                    index,
                    delta: text_delta,
                    snapshot: self.current.clone().unwrap_or_default(),
                }]
            }
            "thinking_delta" => {
                let thinking_delta = delta["thinking"].as_str().unwrap_or("").to_string();
                match &mut self.state_mut().content[index] {
                    ContentBlock::Thinking { thinking, .. } => thinking.push_str(&thinking_delta),
                    _ => {
                        return self.fatal(StreamError::MalformedEvent(
                            "thinking_delta on a non-thinking block".into(),
                        ));
                    }
                }
                vec![StreamEvent::Thinking {
                    index,
                    delta: thinking_delta,
                }]
            }
            "signature_delta" => {
                let signature = delta["signature"].as_str().unwrap_or("").to_string();
                match &mut self.state_mut().content[index] {
                    ContentBlock::Thinking { signature: sig, .. } => *sig = Some(signature.clone()),
                    _ => {
                        return self.fatal(StreamError::MalformedEvent(
                            "signature_delta on a non-thinking block".into(),
                        ));
                    }
                }
                vec![StreamEvent::Signature { index, signature }]
            }
            "citations_delta" => {
                let citation = Citation {
                    source: delta["citation"]["source"].as_str().unwrap_or("").to_string(),
                    cited_text: delta["citation"]["cited_text"].as_str().map(str::to_string),
                };
                match &mut self.state_mut().content[index] {
                    ContentBlock::Text { citations, .. } => citations.push(citation.clone()),
                    _ => {
                        return self.fatal(StreamError::MalformedEvent(
                            "citations_delta on a non-text block".into(),
                        ));
                    }
                }
                vec![StreamEvent::Citation { index, citation }]
            }
            "input_json_delta" => {
                let partial = delta["partial_json"].as_str().unwrap_or("").to_string();
                let buf = self.tool_json_buf.entry(index).or_default();
                buf.push_str(&partial);
                let current_input = match tolerant_parse(buf) {
                    Some(v) => {
                        self.tool_json_value.insert(index, v.clone());
                        v
                    }
                    None => self
                        .tool_json_value
                        .get(&index)
                        .cloned()
                        .unwrap_or_else(|| serde_json::json!({})),
                };
                vec![StreamEvent::InputJson {
                    index,
                    partial,
                    current_input,
                }]
            }
            _ => vec![],
        }
    }

    fn on_content_block_stop(&mut self, json: &Value) -> Vec<StreamEvent> {
        let Some(index) = json["index"].as_u64().map(|n| n as usize) else {
            return self.fatal(StreamError::MalformedEvent("content_block_stop missing index".into()));
        };
        if index >= self.state_mut().content.len() {
            return self.fatal(StreamError::MalformedEvent(format!(
                "content_block_stop for index {index} with no matching content_block_start"
            )));
        }

        if let Some(buf) = self.tool_json_buf.remove(&index) {
            let final_input = if buf.is_empty() {
                serde_json::json!({})
            } else {
                tolerant_parse(&buf).unwrap_or_else(|| serde_json::json!({}))
            };
            self.tool_json_value.remove(&index);
            if let ContentBlock::ToolUse { input, .. } = &mut self.state_mut().content[index] {
                *input = final_input;
            }
        }

        vec![StreamEvent::ContentBlockStop { index }]
    }

    fn on_message_delta(&mut self, json: &Value) -> Vec<StreamEvent> {
        let stop_reason = json["delta"]["stop_reason"]
            .as_str()
            .and_then(parse_stop_reason);
        let stop_sequence = json["delta"]["stop_sequence"].as_str().map(str::to_string);
        let usage = json.get("usage").map(|u| TokenUsage {
            input_tokens: u["input_tokens"].as_u64().unwrap_or(0),
            output_tokens: u["output_tokens"].as_u64().unwrap_or(0),
            cache_read_tokens: u.get("cache_read_input_tokens").and_then(Value::as_u64),
            cache_creation_tokens: u.get("cache_creation_input_tokens").and_then(Value::as_u64),
        });

        let state = self.state_mut();
        if stop_reason.is_some() {
            state.stop_reason = stop_reason;
        }
        if stop_sequence.is_some() {
            state.stop_sequence = stop_sequence;
        }
        if let Some(u) = &usage {
            state.usage = Some(*u);
        }

        if stop_reason.is_none() && usage.is_none() {
            return vec![];
        }
        vec![StreamEvent::MessageDelta { stop_reason, usage }]
    }

    fn on_message_stop(&mut self) -> Vec<StreamEvent> {
        self.ended = true;
        let state = self.current.clone().unwrap_or_default();
        vec![StreamEvent::MessageStop(state)]
    }
}

fn parse_stop_reason(s: &str) -> Option<StopReason> {
    match s {
        "end_turn" => Some(StopReason::EndTurn),
        "tool_use" => Some(StopReason::ToolUse),
        "max_tokens" => Some(StopReason::MaxTokens),
        "stop_sequence" => Some(StopReason::StopSequence),
        "compaction" => Some(StopReason::Compaction),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sse::SseLineDecoder;

    fn events_for(sse: &str) -> Vec<StreamEvent> {
        let mut line_dec = SseLineDecoder::new();
        let mut reducer = Reducer::new();
        let mut out = Vec::new();
        for line in sse.lines() {
            if let Some(raw) = line_dec.push_line(line) {
                out.extend(reducer.apply(&raw));
            }
        }
        if let Some(raw) = line_dec.push_line("") {
            out.extend(reducer.apply(&raw));
        }
        out
    }

    #[test]
    fn text_delta_concatenates_and_snapshots() {
        let sse = "event: content_block_start\ndata: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"text\",\"text\":\"\"}}\n\nevent: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hi\"}}\n";
        let events = events_for(sse);
        let deltas: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::Text { delta, .. } => Some(delta.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(deltas, vec!["Hi"]);
    }

    #[test]
    fn tool_use_input_commits_on_stop() {
        let sse = "event: content_block_start\ndata: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"tool_use\",\"id\":\"t1\",\"name\":\"search\"}}\n\nevent: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"input_json_delta\",\"partial_json\":\"{\\\"q\\\":\\\"rust\\\"}\"}}\n\nevent: content_block_stop\ndata: {\"type\":\"content_block_stop\",\"index\":0}\n";
        let events = events_for(sse);
        assert!(events
            .iter()
            .any(|e| matches!(e, StreamEvent::ContentBlockStop { index: 0 })));
    }

    #[test]
    fn zero_byte_tool_input_finalizes_to_empty_object() {
        let mut reducer = Reducer::new();
        reducer.apply(&RawSseEvent {
            event: "content_block_start".into(),
            data: r#"{"type":"content_block_start","index":0,"content_block":{"type":"tool_use","id":"t1","name":"noop"}}"#.into(),
            id: None,
        });
        reducer.apply(&RawSseEvent {
            event: "content_block_stop".into(),
            data: r#"{"type":"content_block_stop","index":0}"#.into(),
            id: None,
        });
        match &reducer.current.unwrap().content[0] {
            ContentBlock::ToolUse { input, .. } => assert_eq!(*input, serde_json::json!({})),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn delta_before_content_block_start_is_fatal() {
        let mut reducer = Reducer::new();
        let events = reducer.apply(&RawSseEvent {
            event: "content_block_delta".into(),
            data: r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"x"}}"#.into(),
            id: None,
        });
        assert!(matches!(events.as_slice(), [StreamEvent::Error(_)]));
        assert!(reducer.is_ended());
    }

    #[test]
    fn message_delta_merges_stop_reason_and_usage() {
        let mut reducer = Reducer::new();
        let events = reducer.apply(&RawSseEvent {
            event: "message_delta".into(),
            data: r#"{"type":"message_delta","delta":{"stop_reason":"end_turn"},"usage":{"input_tokens":10,"output_tokens":5}}"#.into(),
            id: None,
        });
        assert!(matches!(
            events.as_slice(),
            [StreamEvent::MessageDelta { stop_reason: Some(StopReason::EndTurn), usage: Some(_) }]
        ));
    }

    #[test]
    fn message_delta_maps_compaction_stop_reason() {
        let mut reducer = Reducer::new();
        let events = reducer.apply(&RawSseEvent {
            event: "message_delta".into(),
            data: r#"{"type":"message_delta","delta":{"stop_reason":"compaction"}}"#.into(),
            id: None,
        });
        assert!(matches!(
            events.as_slice(),
            [StreamEvent::MessageDelta { stop_reason: Some(StopReason::Compaction), .. }]
        ));
    }

    #[test]
    fn ping_produces_nothing() {
        let mut reducer = Reducer::new();
        assert!(reducer
            .apply(&RawSseEvent { event: "ping".into(), data: "{}".into(), id: None })
            .is_empty());
    }
}
