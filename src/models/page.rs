// Page entity and its API representation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::content::{self, extractors};

/// Attributes recorded in the audit trail.
pub const AUDIT_INCLUDE: [&str; 8] = [
    "title",
    "meta_excerpt",
    "meta_description",
    "json",
    "user_id",
    "created_at",
    "updated_at",
    "deleted_at",
];

/// A stored page. `raw_content` and `schema_override` hold whatever the
/// client sent: structured JSON or a JSON-encoded string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: i64,
    pub title: String,
    pub slug: Option<String>,
    #[serde(rename = "json")]
    pub raw_content: Option<Value>,
    #[serde(rename = "schema")]
    pub schema_override: Option<Value>,
    pub user_id: Option<i64>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Page {
    /// Resolved page content, `None` when absent.
    pub fn content(&self) -> Option<Value> {
        content::content(self.raw_content.as_ref())
    }

    /// Resolved page content, an empty object when absent.
    pub fn raw_or_empty(&self) -> Value {
        content::raw_or_empty(self.raw_content.as_ref())
    }

    /// Resolved schema override.
    pub fn schema(&self) -> Option<Value> {
        content::content(self.schema_override.as_ref())
    }

    pub fn schema_to_string(&self) -> Option<String> {
        self.schema().map(|schema| schema.to_string())
    }

    pub fn effective_schema(&self, base: &Value) -> Value {
        content::effective_schema(base, self.schema_override.as_ref())
    }

    pub fn thumbnail(&self, base: &Value) -> Option<Value> {
        extractors::thumbnail(self.content().as_ref(), &self.effective_schema(base))
    }

    pub fn versions_count(&self) -> usize {
        extractors::versions_count(self.content().as_ref())
    }

    pub fn is_default_page(&self, base: &Value) -> bool {
        extractors::is_default_page(Some(&self.effective_schema(base)))
    }

    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Audited attributes of the stored row. Metadata-backed attributes are
    /// merged in by the audit service.
    pub fn audit_attributes(&self) -> Map<String, Value> {
        let mut attributes = Map::new();
        attributes.insert("title".to_string(), json!(self.title));
        attributes.insert(
            "json".to_string(),
            self.raw_content.clone().unwrap_or(Value::Null),
        );
        attributes.insert("user_id".to_string(), json!(self.user_id));
        attributes.insert("created_at".to_string(), json!(self.created_at));
        attributes.insert("updated_at".to_string(), json!(self.updated_at));
        attributes.insert("deleted_at".to_string(), json!(self.deleted_at));
        attributes
    }

    pub fn snapshot(&self) -> PageSnapshot {
        PageSnapshot {
            title: self.title.clone(),
            slug: self.slug.clone(),
            json: self.raw_content.clone(),
            schema: self.schema_override.clone(),
        }
    }

    /// Build the API representation, computing every derived field.
    pub fn to_resource(&self, base_schema: &Value, tags: Vec<String>) -> PageResource {
        let content = self.content();
        let effective = self.effective_schema(base_schema);
        PageResource {
            id: self.id,
            title: self.title.clone(),
            slug: self.slug.clone(),
            thumbnail: extractors::thumbnail(content.as_ref(), &effective),
            versions_count: extractors::versions_count(content.as_ref()),
            is_default_page: extractors::is_default_page(Some(&effective)),
            json: content,
            schema: self.schema(),
            schema_string: self.schema_to_string(),
            effective_schema: effective,
            tags,
            user_id: self.user_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        }
    }
}

/// Fillable page attributes accepted on create and update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageInput {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub json: Option<Value>,
    #[serde(default)]
    pub schema: Option<Value>,
}

/// Versioned state of a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub title: String,
    pub slug: Option<String>,
    pub json: Option<Value>,
    pub schema: Option<Value>,
}

impl From<PageSnapshot> for PageInput {
    fn from(snapshot: PageSnapshot) -> Self {
        Self {
            title: snapshot.title,
            slug: snapshot.slug,
            json: snapshot.json,
            schema: snapshot.schema,
        }
    }
}

/// Page as exposed over the API, derived fields included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResource {
    pub id: i64,
    pub title: String,
    pub slug: Option<String>,
    pub json: Option<Value>,
    pub schema: Option<Value>,
    pub schema_string: Option<String>,
    pub effective_schema: Value,
    pub thumbnail: Option<Value>,
    pub versions_count: usize,
    pub is_default_page: bool,
    pub tags: Vec<String>,
    pub user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}
