//! Deterministic deep merge for generation configuration fragments.

use serde_json::Value;

/// Merge an override fragment onto a base configuration.
///
/// Policy: objects merge recursively with override keys winning; any
/// non-object value (scalars, arrays, null) replaces the base wholesale.
pub fn merge_config(base: &Value, fragment: &Value) -> Value {
    match (base, fragment) {
        (Value::Object(base_map), Value::Object(frag_map)) => {
            let mut merged = base_map.clone();
            for (key, frag_value) in frag_map {
                let entry = match merged.get(key) {
                    Some(base_value) => merge_config(base_value, frag_value),
                    None => frag_value.clone(),
                };
                merged.insert(key.clone(), entry);
            }
            Value::Object(merged)
        }
        (_, fragment) => fragment.clone(),
    }
}
