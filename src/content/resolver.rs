// Content resolution - normalizes page payloads stored either as structured
// JSON or as a JSON-encoded string.

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{AppError, AppResult};

/// Resolve a stored payload into a structured document.
///
/// `None` and JSON `null` resolve to `None`. Strings are decoded as JSON;
/// malformed strings resolve to `None` and are logged. Any other value is
/// returned unchanged.
pub fn content(raw: Option<&Value>) -> Option<Value> {
    match try_content(raw) {
        Ok(value) => value,
        Err(err) => {
            warn!("Ignoring unreadable page payload: {}", err);
            None
        }
    }
}

/// Like [`content`], but absence resolves to an empty object.
pub fn raw_or_empty(raw: Option<&Value>) -> Value {
    content(raw).unwrap_or_else(|| Value::Object(Map::new()))
}

/// Strict resolution used when accepting writes.
pub fn try_content(raw: Option<&Value>) -> AppResult<Option<Value>> {
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(encoded)) => {
            let decoded: Value = serde_json::from_str(encoded)
                .map_err(|e| AppError::MalformedContent(e.to_string()))?;
            match decoded {
                Value::Null => Ok(None),
                other => Ok(Some(other)),
            }
        }
        Some(other) => Ok(Some(other.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_content() {
        assert_eq!(content(None), None);
        assert_eq!(content(Some(&Value::Null)), None);
        assert_eq!(raw_or_empty(None), json!({}));
    }

    #[test]
    fn test_string_and_object_are_equivalent() {
        let object = json!({"title": "Home", "sections": {"hero": {"fields": {}}}});
        let encoded = Value::String(object.to_string());
        assert_eq!(content(Some(&encoded)), content(Some(&object)));
        assert_eq!(raw_or_empty(Some(&encoded)), raw_or_empty(Some(&object)));
    }

    #[test]
    fn test_malformed_string_is_tolerated() {
        let broken = Value::String("{\"title\": ".to_string());
        assert_eq!(content(Some(&broken)), None);
        assert_eq!(raw_or_empty(Some(&broken)), json!({}));
    }

    #[test]
    fn test_try_content_surfaces_malformed() {
        let broken = Value::String("not json".to_string());
        assert!(matches!(
            try_content(Some(&broken)),
            Err(AppError::MalformedContent(_))
        ));
    }

    #[test]
    fn test_encoded_null_is_absent() {
        let encoded = Value::String("null".to_string());
        assert_eq!(content(Some(&encoded)), None);
    }
}
