// Walking the `sections` node of a page schema and the matching content node

use serde_json::{Map, Value};

/// A section declared by a schema, borrowed from the schema document.
#[derive(Debug, Clone, Copy)]
pub struct Section<'a> {
    pub slug: &'a str,
    pub fields: Option<&'a Map<String, Value>>,
}

impl<'a> Section<'a> {
    fn from_node(node: &'a Value, key: Option<&'a str>) -> Option<Self> {
        let node = node.as_object()?;
        let slug = node.get("slug").and_then(Value::as_str).or(key)?;
        Some(Self {
            slug,
            fields: node.get("fields").and_then(Value::as_object),
        })
    }

    /// Field definitions in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&'a str, &'a Value)> {
        self.fields
            .into_iter()
            .flat_map(|fields| fields.iter().map(|(name, def)| (name.as_str(), def)))
    }
}

/// Sections declared by `schema`, in declaration order.
///
/// `sections` may be an array of section nodes or an object keyed by name;
/// in the latter case the key stands in for a missing `slug`.
pub fn schema_sections(schema: &Value) -> Vec<Section<'_>> {
    match schema.get("sections") {
        Some(Value::Array(nodes)) => nodes
            .iter()
            .filter_map(|node| Section::from_node(node, None))
            .collect(),
        Some(Value::Object(nodes)) => nodes
            .iter()
            .filter_map(|(key, node)| Section::from_node(node, Some(key.as_str())))
            .collect(),
        _ => Vec::new(),
    }
}

/// The value stored for `field` of section `slug` in page content, if any.
pub fn content_field<'a>(content: &'a Value, slug: &str, field: &str) -> Option<&'a Value> {
    content
        .get("sections")?
        .get(slug)?
        .get("fields")?
        .get(field)
        .filter(|value| !value.is_null())
}

/// Whether a field definition carries a boolean flag set to `true`.
pub fn flag(definition: &Value, name: &str) -> bool {
    definition
        .get(name)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_array_sections_keep_order() {
        let schema = json!({"sections": [
            {"slug": "hero", "fields": {"image": {}, "title": {}}},
            {"slug": "body", "fields": {"text": {}}},
            {"fields": {"orphan": {}}}
        ]});
        let sections = schema_sections(&schema);
        let slugs: Vec<_> = sections.iter().map(|s| s.slug).collect();
        assert_eq!(slugs, vec!["hero", "body"]);
        let fields: Vec<_> = sections[0].fields().map(|(name, _)| name).collect();
        assert_eq!(fields, vec!["image", "title"]);
    }

    #[test]
    fn test_object_sections_fall_back_to_key() {
        let schema = json!({"sections": {
            "intro": {"fields": {"a": {}}},
            "gallery": {"slug": "photos", "fields": {}}
        }});
        let slugs: Vec<_> = schema_sections(&schema).iter().map(|s| s.slug).collect();
        assert_eq!(slugs, vec!["intro", "photos"]);
    }

    #[test]
    fn test_content_field_lookup() {
        let content = json!({"sections": {"hero": {"fields": {"image": "cat.png", "alt": null}}}});
        assert_eq!(content_field(&content, "hero", "image"), Some(&json!("cat.png")));
        assert_eq!(content_field(&content, "hero", "alt"), None);
        assert_eq!(content_field(&content, "body", "image"), None);
    }
}
