// Derived page fields computed from resolved content and the effective schema

use serde_json::Value;

use super::sections::{content_field, flag, schema_sections};

/// Schema category marking a page as one of the default pages.
pub const DEFAULTS_CATEGORY: &str = "defaults";

/// Field-definition flag naming the thumbnail field.
pub const THUMBNAIL_FLAG: &str = "isThumbnail";

/// Value of the first field flagged `isThumbnail` in the schema.
///
/// Sections and fields are visited in declaration order and the walk stops at
/// the first flagged field: if the content has no value for it, the page has
/// no thumbnail even when later fields are also flagged.
pub fn thumbnail(content: Option<&Value>, schema: &Value) -> Option<Value> {
    let content = content?;
    content.get("sections")?;

    for section in schema_sections(schema) {
        if let Some((field, _)) = section
            .fields()
            .find(|(_, definition)| flag(definition, THUMBNAIL_FLAG))
        {
            return content_field(content, section.slug, field).cloned();
        }
    }
    None
}

/// Number of entries under `versions` in the page content.
pub fn versions_count(content: Option<&Value>) -> usize {
    match content.and_then(|c| c.get("versions")) {
        Some(Value::Array(versions)) => versions.len(),
        Some(Value::Object(versions)) => versions.len(),
        _ => 0,
    }
}

/// Whether the effective schema places the page in the defaults category.
pub fn is_default_page(schema: Option<&Value>) -> bool {
    schema
        .and_then(|s| s.get("category"))
        .and_then(Value::as_str)
        .map(|category| category == DEFAULTS_CATEGORY)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hero_schema() -> Value {
        json!({
            "category": "post",
            "sections": [
                {"slug": "intro", "fields": {"headline": {"type": "string"}}},
                {"slug": "hero", "fields": {
                    "caption": {"type": "string"},
                    "image": {"type": "string", "isThumbnail": true},
                    "backdrop": {"type": "string", "isThumbnail": true}
                }}
            ]
        })
    }

    #[test]
    fn test_thumbnail_found() {
        let content = json!({"sections": {"hero": {"fields": {"image": "cat.png", "backdrop": "dog.png"}}}});
        assert_eq!(thumbnail(Some(&content), &hero_schema()), Some(json!("cat.png")));
    }

    #[test]
    fn test_thumbnail_stops_at_first_flagged_field() {
        let content = json!({"sections": {"hero": {"fields": {"backdrop": "dog.png"}}}});
        assert_eq!(thumbnail(Some(&content), &hero_schema()), None);
    }

    #[test]
    fn test_thumbnail_without_flag() {
        let schema = json!({"sections": [{"slug": "hero", "fields": {"image": {"isThumbnail": false}}}]});
        let content = json!({"sections": {"hero": {"fields": {"image": "cat.png"}}}});
        assert_eq!(thumbnail(Some(&content), &schema), None);
        assert_eq!(thumbnail(None, &hero_schema()), None);
        assert_eq!(thumbnail(Some(&json!({})), &hero_schema()), None);
    }

    #[test]
    fn test_versions_count() {
        assert_eq!(versions_count(Some(&json!({"versions": [1, 2, 3]}))), 3);
        assert_eq!(versions_count(Some(&json!({"versions": {"a": 1, "b": 2}}))), 2);
        assert_eq!(versions_count(Some(&json!({"versions": "three"}))), 0);
        assert_eq!(versions_count(Some(&json!({}))), 0);
        assert_eq!(versions_count(None), 0);
    }

    #[test]
    fn test_is_default_page() {
        assert!(is_default_page(Some(&json!({"category": "defaults"}))));
        assert!(!is_default_page(Some(&json!({"category": "post"}))));
        assert!(!is_default_page(Some(&json!({"category": null}))));
        assert!(!is_default_page(Some(&json!({}))));
        assert!(!is_default_page(None));
    }

    #[test]
    fn test_extractors_are_idempotent() {
        let schema = hero_schema();
        let content = json!({"versions": [1], "sections": {"hero": {"fields": {"image": "cat.png"}}}});
        assert_eq!(thumbnail(Some(&content), &schema), thumbnail(Some(&content), &schema));
        assert_eq!(versions_count(Some(&content)), versions_count(Some(&content)));
        assert_eq!(is_default_page(Some(&schema)), is_default_page(Some(&schema)));
    }
}
