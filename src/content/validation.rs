// Validation of incoming page payloads against the effective schema

use serde_json::Value;

use super::sections::{content_field, flag, schema_sections};

/// Check `content` against the field definitions of `schema`.
///
/// Returns every violation found; an empty vector means the payload is valid.
pub fn validate_content(content: Option<&Value>, schema: &Value) -> Vec<String> {
    let mut errors = Vec::new();

    if let Some(content) = content {
        if !content.is_object() {
            errors.push("content must be a JSON object".to_string());
            return errors;
        }
    }

    for section in schema_sections(schema) {
        for (field, definition) in section.fields() {
            let value = content.and_then(|c| content_field(c, section.slug, field));
            match value {
                None if flag(definition, "required") => {
                    errors.push(format!("sections.{}.fields.{} is required", section.slug, field));
                }
                Some(value) => {
                    if let Some(expected) = definition.get("type").and_then(Value::as_str) {
                        if !matches_type(value, expected) {
                            errors.push(format!(
                                "sections.{}.fields.{} must be of type {}",
                                section.slug, field, expected
                            ));
                        }
                    }
                }
                None => {}
            }
        }
    }
    errors
}

fn matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        // Unknown types (e.g. editor widgets) are not constrained
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Value {
        json!({"sections": [{"slug": "hero", "fields": {
            "title": {"type": "string", "required": true},
            "count": {"type": "integer"},
            "image": {"type": "image"}
        }}]})
    }

    #[test]
    fn test_valid_content() {
        let content = json!({"sections": {"hero": {"fields": {"title": "Hi", "count": 2, "image": 5}}}});
        assert!(validate_content(Some(&content), &schema()).is_empty());
    }

    #[test]
    fn test_missing_required_and_wrong_type() {
        let content = json!({"sections": {"hero": {"fields": {"count": "two"}}}});
        let errors = validate_content(Some(&content), &schema());
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("title is required"));
        assert!(errors[1].contains("must be of type integer"));
    }

    #[test]
    fn test_non_object_content() {
        let errors = validate_content(Some(&json!([1, 2])), &schema());
        assert_eq!(errors, vec!["content must be a JSON object".to_string()]);
    }

    #[test]
    fn test_absent_content_only_checks_required() {
        let errors = validate_content(None, &schema());
        assert_eq!(errors.len(), 1);
    }
}
