//! Top-level layered resolution (spec §4.6): hardcoded defaults ← global
//! file ← project file ← environment, merged key-by-key with rightmost
//! winning, then migrated and validated once as a whole.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use basalt_types::ConfigError;
use serde_json::Value;

use crate::env::env_layer;
use crate::mcp::validate_mcp_servers;
use crate::merge::{merge, merge_all};
use crate::migrate::migrate;
use crate::model::Config;

/// The resolved configuration plus any non-fatal warnings collected while
/// rejecting individual sources (spec §4.6: "invalid values cause the
/// *source* to be rejected with a warning, not the whole config").
#[derive(Debug)]
pub struct Resolved {
    /// The merged, validated configuration.
    pub config: Config,
    /// Human-readable descriptions of rejected sources or entries.
    pub warnings: Vec<String>,
}

/// Resolve the effective config for a run rooted at `project_root`, using
/// `env_vars` as the process environment snapshot (a plain map rather than
/// `std::env::vars()` directly, so callers can test with a fixed
/// environment).
#[must_use]
pub fn resolve(project_root: &Path, env_vars: &BTreeMap<String, String>) -> Resolved {
    let mut warnings = Vec::new();
    let mut layers = vec![Config::defaults_value()];

    let config_dir = env_vars
        .get("CLAUDE_CONFIG_DIR")
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".claude")));
    if let Some(dir) = config_dir {
        if let Some(layer) = load_layer_file(&dir.join("settings.json"), "global", &mut warnings) {
            layers.push(layer);
        }
    }

    let project_path = project_root.join(".claude").join("settings.json");
    if let Some(layer) = load_layer_file(&project_path, "project", &mut warnings) {
        layers.push(layer);
    }

    let env_value = env_layer(env_vars);
    if !is_empty_object(&env_value) && validate_layer(&env_value, "env", &mut warnings) {
        layers.push(env_value);
    }

    let mut merged = merge_all(layers);
    migrate(&mut merged);

    let config = match serde_json::from_value::<Config>(merged.clone()) {
        Ok(config) => config,
        Err(e) => {
            warnings.push(format!("merged config failed validation, falling back to defaults: {e}"));
            Config::defaults()
        }
    };

    if let Err(e) = validate_mcp_servers(&config.mcp_servers) {
        warnings.push(format!("dropping invalid mcp servers: {e}"));
        let mut config = config;
        config.mcp_servers.clear();
        return Resolved { config, warnings };
    }

    Resolved { config, warnings }
}

/// Strict validation for runtime config mutation (spec §4.6: "config
/// errors at `set()` time throw", unlike the degrade-with-warning path at
/// load time).
///
/// # Errors
/// Returns the first `ConfigError` the config fails.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_mcp_servers(&config.mcp_servers)?;
    if config.max_turns == 0 {
        return Err(ConfigError::InvalidSource {
            source: "set".to_string(),
            reason: "maxTurns must be greater than zero".to_string(),
        });
    }
    Ok(())
}

/// Export `config` as a JSON value, optionally masking secret-shaped keys
/// (spec §4.6 "export supports a mask flag").
#[must_use]
pub fn export(config: &Config, mask: bool) -> Value {
    let value = serde_json::to_value(config).expect("Config always serializes");
    if mask {
        crate::redact::redact(&value)
    } else {
        value
    }
}

fn is_empty_object(value: &Value) -> bool {
    matches!(value, Value::Object(map) if map.is_empty())
}

fn load_layer_file(path: &Path, source_name: &str, warnings: &mut Vec<String>) -> Option<Value> {
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str::<Value>(&contents) {
            Ok(value) => {
                if validate_layer(&value, source_name, warnings) {
                    Some(value)
                } else {
                    None
                }
            }
            Err(e) => {
                warnings.push(format!(
                    "rejecting {source_name} config at {}: invalid json ({e})",
                    path.display()
                ));
                None
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            warnings.push(format!(
                "rejecting {source_name} config at {}: {e}",
                path.display()
            ));
            None
        }
    }
}

/// A layer is valid if, merged onto the defaults alone, it still produces
/// a parseable `Config`. This lets an invalid field in one layer be
/// rejected without knowing anything about the other layers.
fn validate_layer(value: &Value, source_name: &str, warnings: &mut Vec<String>) -> bool {
    let candidate = merge(Config::defaults_value(), value.clone());
    match serde_json::from_value::<Config>(candidate) {
        Ok(_) => true,
        Err(e) => {
            warnings.push(format!("rejecting {source_name} config: {e}"));
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn resolve_with_no_files_and_no_env_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = resolve(dir.path(), &BTreeMap::new());
        assert_eq!(resolved.config.model, Config::defaults().model);
        assert!(resolved.warnings.is_empty());
    }

    #[test]
    fn project_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let claude_dir = dir.path().join(".claude");
        std::fs::create_dir_all(&claude_dir).unwrap();
        std::fs::write(claude_dir.join("settings.json"), r#"{"maxTurns": 5}"#).unwrap();

        let resolved = resolve(dir.path(), &BTreeMap::new());
        assert_eq!(resolved.config.max_turns, 5);
    }

    #[test]
    fn env_layer_overrides_project_file() {
        let dir = tempfile::tempdir().unwrap();
        let claude_dir = dir.path().join(".claude");
        std::fs::create_dir_all(&claude_dir).unwrap();
        std::fs::write(claude_dir.join("settings.json"), r#"{"maxOutputTokens": 1000}"#).unwrap();

        let mut env_vars = BTreeMap::new();
        env_vars.insert("CLAUDE_CODE_MAX_OUTPUT_TOKENS".to_string(), "2000".to_string());

        let resolved = resolve(dir.path(), &env_vars);
        assert_eq!(resolved.config.max_output_tokens, 2000);
    }

    #[test]
    fn invalid_json_in_project_file_degrades_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let claude_dir = dir.path().join(".claude");
        std::fs::create_dir_all(&claude_dir).unwrap();
        std::fs::write(claude_dir.join("settings.json"), "{ not json").unwrap();

        let resolved = resolve(dir.path(), &BTreeMap::new());
        assert_eq!(resolved.config.model, Config::defaults().model);
        assert_eq!(resolved.warnings.len(), 1);
    }

    #[test]
    fn wrong_typed_field_rejects_only_that_source() {
        let dir = tempfile::tempdir().unwrap();
        let claude_dir = dir.path().join(".claude");
        std::fs::create_dir_all(&claude_dir).unwrap();
        std::fs::write(claude_dir.join("settings.json"), r#"{"maxTurns": "not-a-number"}"#).unwrap();

        let resolved = resolve(dir.path(), &BTreeMap::new());
        assert_eq!(resolved.config.max_turns, Config::defaults().max_turns);
        assert_eq!(resolved.warnings.len(), 1);
    }

    #[test]
    fn legacy_auto_save_field_migrates_through_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let claude_dir = dir.path().join(".claude");
        std::fs::create_dir_all(&claude_dir).unwrap();
        std::fs::write(claude_dir.join("settings.json"), r#"{"autoSave": false}"#).unwrap();

        let resolved = resolve(dir.path(), &BTreeMap::new());
        assert!(!resolved.config.enable_auto_save);
    }

    #[test]
    fn validate_rejects_zero_max_turns() {
        let mut config = Config::defaults();
        config.max_turns = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn export_masks_secret_keys_when_requested() {
        let config = Config::defaults();
        let exported = export(&config, true);
        assert!(exported.is_object());
    }
}
