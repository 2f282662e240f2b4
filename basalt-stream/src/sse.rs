//! Line → SSE event decoder (spec §4.1).
//!
//! Implements the wire-format subset used by the Anthropic Messages API:
//! `:` comment lines are ignored, `field:value` lines accumulate `event`,
//! `data` (joined by `\n` across repeated `data:` lines), `id`, and `retry`,
//! and a blank line emits the accumulated event. A single leading space
//! after the colon is stripped per the SSE spec. The `id` field persists
//! across events until explicitly overwritten, matching the wire spec even
//! though the Anthropic provider does not currently send one.

/// One decoded SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSseEvent {
    /// The `event:` field, defaulting to `"message"` when absent.
    pub event: String,
    /// The joined `data:` field lines.
    pub data: String,
    /// The last-seen `id:` field, if any event has carried one.
    pub id: Option<String>,
}

/// Accumulates SSE fields across lines and emits events on blank lines.
#[derive(Debug, Default)]
pub struct SseLineDecoder {
    event: Option<String>,
    data_lines: Vec<String>,
    id: Option<String>,
}

impl SseLineDecoder {
    /// Construct an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line (without its terminator). Returns `Some` when the line
    /// was blank and an event had been accumulated.
    pub fn push_line(&mut self, line: &str) -> Option<RawSseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if let Some(rest) = line.strip_prefix(':') {
            let _ = rest; // comment line, ignored
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data_lines.push(value.to_string()),
            "id" => self.id = Some(value.to_string()),
            "retry" => {}
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<RawSseEvent> {
        if self.event.is_none() && self.data_lines.is_empty() {
            return None;
        }
        let event = RawSseEvent {
            event: self.event.take().unwrap_or_else(|| "message".to_string()),
            data: self.data_lines.join("\n"),
            id: self.id.clone(),
        };
        self.data_lines.clear();
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_event_on_blank_line() {
        let mut dec = SseLineDecoder::new();
        assert_eq!(dec.push_line("event: ping"), None);
        assert_eq!(dec.push_line(r#"data: {"ok":true}"#), None);
        let ev = dec.push_line("").unwrap();
        assert_eq!(ev.event, "ping");
        assert_eq!(ev.data, r#"{"ok":true}"#);
    }

    #[test]
    fn defaults_event_name_to_message() {
        let mut dec = SseLineDecoder::new();
        dec.push_line("data: hi");
        let ev = dec.push_line("").unwrap();
        assert_eq!(ev.event, "message");
    }

    #[test]
    fn joins_multiple_data_lines_with_newline() {
        let mut dec = SseLineDecoder::new();
        dec.push_line("data: line one");
        dec.push_line("data: line two");
        let ev = dec.push_line("").unwrap();
        assert_eq!(ev.data, "line one\nline two");
    }

    #[test]
    fn comment_lines_are_ignored() {
        let mut dec = SseLineDecoder::new();
        dec.push_line(": this is a comment");
        dec.push_line("data: real");
        let ev = dec.push_line("").unwrap();
        assert_eq!(ev.data, "real");
    }

    #[test]
    fn id_persists_across_events_until_overwritten() {
        let mut dec = SseLineDecoder::new();
        dec.push_line("id: abc");
        dec.push_line("data: first");
        let ev1 = dec.push_line("").unwrap();
        assert_eq!(ev1.id.as_deref(), Some("abc"));

        dec.push_line("data: second");
        let ev2 = dec.push_line("").unwrap();
        assert_eq!(ev2.id.as_deref(), Some("abc"));
    }

    #[test]
    fn blank_line_with_nothing_accumulated_emits_nothing() {
        let mut dec = SseLineDecoder::new();
        assert_eq!(dec.push_line(""), None);
    }
}
