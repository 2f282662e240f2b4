//! Environment-variable layer: a whitelist of process env vars mapped onto
//! config keys (spec §4.6, §6 "Environment variables honored").

use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Build the env layer from a snapshot of environment variables. Only the
/// whitelisted names are consulted; everything else is ignored so stray
/// environment pollution can't leak into the resolved config.
#[must_use]
pub fn env_layer(vars: &BTreeMap<String, String>) -> Value {
    let mut map = serde_json::Map::new();

    if let Some(raw) = vars.get("CLAUDE_CODE_MAX_OUTPUT_TOKENS") {
        if let Ok(n) = raw.parse::<u32>() {
            map.insert("maxOutputTokens".to_string(), json!(n));
        }
    }
    if let Some(raw) = vars.get("CLAUDE_CODE_USE_BEDROCK") {
        map.insert("useBedrock".to_string(), json!(is_truthy(raw)));
    }
    if vars.contains_key("CLAUDE_CODE_DISABLE_TELEMETRY") || vars.contains_key("DISABLE_TELEMETRY")
    {
        let raw = vars
            .get("CLAUDE_CODE_DISABLE_TELEMETRY")
            .or_else(|| vars.get("DISABLE_TELEMETRY"))
            .expect("checked above");
        map.insert("disableTelemetry".to_string(), json!(is_truthy(raw)));
    }

    Value::Object(map)
}

fn is_truthy(raw: &str) -> bool {
    matches!(raw.trim(), "1" | "true" | "TRUE" | "yes")
}

/// Names of the environment variables this crate honors at all (spec §6),
/// including ones consumed elsewhere (API keys, base URL) rather than
/// folded into [`env_layer`].
pub const HONORED_ENV_VARS: &[&str] = &[
    "CLAUDE_CONFIG_DIR",
    "ANTHROPIC_API_KEY",
    "CLAUDE_API_KEY",
    "ANTHROPIC_BASE_URL",
    "CLAUDE_CODE_MAX_OUTPUT_TOKENS",
    "CLAUDE_CODE_USE_BEDROCK",
    "CLAUDE_CODE_DISABLE_TELEMETRY",
    "DISABLE_TELEMETRY",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn maps_max_output_tokens_when_numeric() {
        let layer = env_layer(&vars(&[("CLAUDE_CODE_MAX_OUTPUT_TOKENS", "4096")]));
        assert_eq!(layer["maxOutputTokens"], json!(4096));
    }

    #[test]
    fn ignores_non_numeric_max_output_tokens() {
        let layer = env_layer(&vars(&[("CLAUDE_CODE_MAX_OUTPUT_TOKENS", "not-a-number")]));
        assert!(layer.get("maxOutputTokens").is_none());
    }

    #[test]
    fn maps_bedrock_flag_truthiness() {
        let layer = env_layer(&vars(&[("CLAUDE_CODE_USE_BEDROCK", "true")]));
        assert_eq!(layer["useBedrock"], json!(true));
    }

    #[test]
    fn unwhitelisted_vars_are_ignored() {
        let layer = env_layer(&vars(&[("SOME_RANDOM_VAR", "1")]));
        assert_eq!(layer, json!({}));
    }

    #[test]
    fn disable_telemetry_falls_back_to_unprefixed_name() {
        let layer = env_layer(&vars(&[("DISABLE_TELEMETRY", "1")]));
        assert_eq!(layer["disableTelemetry"], json!(true));
    }
}
