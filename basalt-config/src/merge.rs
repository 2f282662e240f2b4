//! Key-by-key `serde_json::Value` merging (spec §4.6: "rightmost wins").

use serde_json::Value;

/// Merge `overlay` onto `base`, returning a new value. Objects are merged
/// key-by-key recursively; any other value kind in `overlay` replaces the
/// corresponding value in `base` outright (arrays are not concatenated —
/// a later layer's array always wins in full).
#[must_use]
pub fn merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Fold a sequence of layers in precedence order (first is weakest).
#[must_use]
pub fn merge_all(layers: impl IntoIterator<Item = Value>) -> Value {
    layers.into_iter().fold(Value::Object(serde_json::Map::new()), merge)
}
