//! Legacy field migration, run on the raw merged `Value` before the final
//! typed parse (spec §4.6).

use serde_json::Value;

/// Known legacy model aliases mapped onto their canonical ids.
const MODEL_ALIASES: &[(&str, &str)] = &[
    ("claude-3-sonnet", "claude-sonnet-4-5"),
    ("claude-3-opus", "claude-opus-4-5"),
    ("claude-3-haiku", "claude-haiku-4-5"),
];

/// Rename/remap legacy keys in place. Unknown keys are left untouched —
/// migration only ever narrows known legacy shapes, it never drops data it
/// doesn't recognize.
pub fn migrate(value: &mut Value) {
    let Value::Object(map) = value else {
        return;
    };

    if let Some(auto_save) = map.remove("autoSave") {
        map.entry("enableAutoSave").or_insert(auto_save);
    }

    if let Some(Value::String(model)) = map.get("model") {
        if let Some((_, canonical)) = MODEL_ALIASES.iter().find(|(alias, _)| alias == model) {
            map.insert("model".to_string(), Value::String((*canonical).to_string()));
        }
    }

    map.insert("configVersion".to_string(), Value::Number(1.into()));
}
