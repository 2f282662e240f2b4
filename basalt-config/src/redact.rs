//! Secret redaction for exported config (spec §4.6).

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn secret_key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)api[_-]?key|token|secret|authorization").expect("static pattern compiles")
    })
}

/// Return a copy of `value` with every object value whose key matches
/// `/api[_-]?key|token|secret|authorization/i` replaced with `"***"`.
/// Recurses into nested objects and arrays; array elements themselves are
/// never redacted (only object values under a matching key are).
#[must_use]
pub fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, val)| {
                    let redacted = if secret_key_pattern().is_match(key) {
                        Value::String("***".to_string())
                    } else {
                        redact(val)
                    };
                    (key.clone(), redacted)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn redacts_matching_keys_at_top_level() {
        let input = json!({"apiKey": "sk-live-123", "model": "claude-sonnet-4-5"});
        let output = redact(&input);
        assert_eq!(output["apiKey"], json!("***"));
        assert_eq!(output["model"], json!("claude-sonnet-4-5"));
    }

    #[test]
    fn redacts_nested_keys() {
        let input = json!({"mcpServers": {"web": {"authorization": "Bearer xyz", "url": "https://x"}}});
        let output = redact(&input);
        assert_eq!(output["mcpServers"]["web"]["authorization"], json!("***"));
        assert_eq!(output["mcpServers"]["web"]["url"], json!("https://x"));
    }

    #[test]
    fn matches_case_insensitively_and_snake_or_camel() {
        let input = json!({"SECRET_TOKEN": "x", "my-secret": "y"});
        let output = redact(&input);
        assert_eq!(output["SECRET_TOKEN"], json!("***"));
        assert_eq!(output["my-secret"], json!("***"));
    }
}
