use serde_json::Value;

use super::resolver;

/// Shallow-merge a page's schema override onto the base schema.
///
/// Top-level override keys replace base keys; nested objects are not merged.
/// An absent, malformed or non-object override leaves the base untouched.
pub fn effective_schema(base: &Value, schema_override: Option<&Value>) -> Value {
    let mut merged = base.clone();
    let overrides = match resolver::content(schema_override) {
        Some(Value::Object(overrides)) => overrides,
        _ => return merged,
    };

    if let Value::Object(target) = &mut merged {
        for (key, value) in overrides {
            target.insert(key, value);
        }
    }
    merged
}
