// Page Hooks System - Middleware pattern for page mutations
// Auditing, versioning, validation and slugs run as independent hooks around
// the store operation instead of living on the entity.

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::SqliteConnection;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
    content,
    core::slugify,
    error::{AppError, AppResult},
    infrastructure::{AuditStore, MetaStore, VersionStore},
    models::{AuditEvent, Page, PageInput, AUDIT_INCLUDE},
};

const MAX_TITLE_LENGTH: usize = 255;

/// Hook context containing mutation information
#[derive(Debug, Clone)]
pub struct HookContext {
    pub operation: HookOperation,
    pub page_id: Option<i64>,
    /// Attributes being written; before-hooks may rewrite them
    pub input: Option<PageInput>,
    /// Stored page prior to the mutation
    pub before: Option<Page>,
    /// Stored page after the mutation, set for after-hooks
    pub after: Option<Page>,
    pub user_id: Option<i64>,
    pub base_schema: Arc<Value>,
}

impl HookContext {
    pub fn new(operation: HookOperation, user_id: Option<i64>, base_schema: Arc<Value>) -> Self {
        Self {
            operation,
            page_id: None,
            input: None,
            before: None,
            after: None,
            user_id,
            base_schema,
        }
    }

    pub fn with_input(mut self, input: PageInput) -> Self {
        self.input = Some(input);
        self
    }

    pub fn with_before(mut self, page: Page) -> Self {
        self.page_id = Some(page.id);
        self.before = Some(page);
        self
    }
}

/// Types of operations that can trigger hooks
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HookOperation {
    Create,
    Update,
    Delete,
    Restore,
}

/// Hook execution timing
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HookTiming {
    Before,
    After,
}

/// Trait for implementing page hooks
#[async_trait]
pub trait PageHook: Send + Sync {
    /// Execute the hook logic. `conn` is the transaction of the mutation;
    /// an error from any hook rolls the whole mutation back.
    async fn execute(&self, ctx: &mut HookContext, conn: &mut SqliteConnection) -> AppResult<()>;

    /// Get hook name for debugging
    fn name(&self) -> &str;

    /// Get supported operations
    fn operations(&self) -> Vec<HookOperation>;

    /// Get hook timing
    fn timing(&self) -> HookTiming;
}

/// Hook registry, hooks run in registration order
#[derive(Default)]
pub struct HookRegistry {
    hooks: Vec<Box<dyn PageHook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_hook(&mut self, hook: Box<dyn PageHook>) {
        self.hooks.push(hook);
    }

    pub fn hook_names(&self) -> Vec<&str> {
        self.hooks.iter().map(|h| h.name()).collect()
    }

    /// Execute all applicable hooks for an operation
    pub async fn execute_hooks(
        &self,
        operation: HookOperation,
        timing: HookTiming,
        ctx: &mut HookContext,
        conn: &mut SqliteConnection,
    ) -> AppResult<()> {
        for hook in &self.hooks {
            if hook.operations().contains(&operation) && hook.timing() == timing {
                debug!("Running hook '{}' for {:?}", hook.name(), operation);
                hook.execute(ctx, &mut *conn).await.inspect_err(|e| {
                    warn!("Hook '{}' failed: {}", hook.name(), e);
                })?;
            }
        }
        Ok(())
    }
}

/// Slug hook - derives the slug from the title when none was given
pub struct SlugHook;

#[async_trait]
impl PageHook for SlugHook {
    async fn execute(&self, ctx: &mut HookContext, _conn: &mut SqliteConnection) -> AppResult<()> {
        if let Some(input) = &mut ctx.input {
            let source = match input.slug.as_deref().map(str::trim) {
                Some(given) if !given.is_empty() => given.to_string(),
                _ => input.title.trim().to_string(),
            };
            let slug = slugify(&source);
            if slug.is_empty() && !source.is_empty() {
                return Err(AppError::Validation(format!(
                    "Slug for '{}' must contain a letter or digit",
                    source
                )));
            }
            input.slug = Some(slug);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "slug_hook"
    }

    fn operations(&self) -> Vec<HookOperation> {
        vec![HookOperation::Create, HookOperation::Update]
    }

    fn timing(&self) -> HookTiming {
        HookTiming::Before
    }
}

/// Validation hook - validates page input against its effective schema
pub struct ValidationHook;

#[async_trait]
impl PageHook for ValidationHook {
    async fn execute(&self, ctx: &mut HookContext, _conn: &mut SqliteConnection) -> AppResult<()> {
        let Some(input) = &ctx.input else {
            return Ok(());
        };

        let title = input.title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("Title cannot be empty".to_string()));
        }
        if title.chars().count() > MAX_TITLE_LENGTH {
            return Err(AppError::Validation(format!(
                "Title must be at most {} characters",
                MAX_TITLE_LENGTH
            )));
        }

        // Writes are strict: unreadable payloads are rejected, not tolerated
        let schema_override = content::try_content(input.schema.as_ref())?;
        if let Some(schema) = &schema_override {
            if !schema.is_object() {
                return Err(AppError::Validation("Schema must be a JSON object".to_string()));
            }
        }
        let page_content = content::try_content(input.json.as_ref())?;

        let effective = content::effective_schema(&ctx.base_schema, schema_override.as_ref());
        let errors = content::validate_content(page_content.as_ref(), &effective);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors.join("; ")))
        }
    }

    fn name(&self) -> &str {
        "validation_hook"
    }

    fn operations(&self) -> Vec<HookOperation> {
        vec![HookOperation::Create, HookOperation::Update]
    }

    fn timing(&self) -> HookTiming {
        HookTiming::Before
    }
}

/// Audit hook - records included attributes of every mutation
pub struct AuditHook {
    audits: AuditStore,
}

impl AuditHook {
    pub fn new(audits: AuditStore) -> Self {
        Self { audits }
    }

    async fn audited_attributes(
        &self,
        conn: &mut SqliteConnection,
        page: &Page,
    ) -> AppResult<Map<String, Value>> {
        let mut attributes = page.audit_attributes();
        for (key, value) in MetaStore::all_meta_on(conn, page.id).await? {
            attributes.insert(key, value);
        }
        attributes.retain(|key, _| AUDIT_INCLUDE.contains(&key.as_str()));
        Ok(attributes)
    }
}

#[async_trait]
impl PageHook for AuditHook {
    async fn execute(&self, ctx: &mut HookContext, conn: &mut SqliteConnection) -> AppResult<()> {
        let Some(page) = ctx.after.as_ref().or(ctx.before.as_ref()) else {
            return Ok(());
        };

        let (event, old_values, new_values) = match ctx.operation {
            HookOperation::Create => {
                (AuditEvent::Created, Map::new(), self.audited_attributes(&mut *conn, page).await?)
            }
            HookOperation::Update => {
                let old = match &ctx.before {
                    Some(before) => self.audited_attributes(&mut *conn, before).await?,
                    None => Map::new(),
                };
                let new = self.audited_attributes(&mut *conn, page).await?;
                changed_attributes(old, new)
            }
            HookOperation::Delete => {
                let old = match &ctx.before {
                    Some(before) => self.audited_attributes(&mut *conn, before).await?,
                    None => Map::new(),
                };
                (AuditEvent::Deleted, old, Map::new())
            }
            HookOperation::Restore => {
                let deleted_at = ctx
                    .before
                    .as_ref()
                    .and_then(|b| serde_json::to_value(b.deleted_at).ok())
                    .unwrap_or(Value::Null);
                let mut old = Map::new();
                old.insert("deleted_at".to_string(), deleted_at);
                let mut new = Map::new();
                new.insert("deleted_at".to_string(), Value::Null);
                (AuditEvent::Restored, old, new)
            }
        };

        self.audits
            .record(conn, page.id, event, &old_values, &new_values, ctx.user_id)
            .await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "audit_hook"
    }

    fn operations(&self) -> Vec<HookOperation> {
        vec![
            HookOperation::Create,
            HookOperation::Update,
            HookOperation::Delete,
            HookOperation::Restore,
        ]
    }

    fn timing(&self) -> HookTiming {
        HookTiming::After
    }
}

/// Keep only attributes whose value changed.
fn changed_attributes(
    old: Map<String, Value>,
    new: Map<String, Value>,
) -> (AuditEvent, Map<String, Value>, Map<String, Value>) {
    let mut old_changed = Map::new();
    let mut new_changed = Map::new();
    for (key, previous) in &old {
        if !new.contains_key(key) {
            old_changed.insert(key.clone(), previous.clone());
            new_changed.insert(key.clone(), Value::Null);
        }
    }
    for (key, value) in new {
        let previous = old.get(&key).cloned().unwrap_or(Value::Null);
        if previous != value {
            old_changed.insert(key.clone(), previous);
            new_changed.insert(key, value);
        }
    }
    (AuditEvent::Updated, old_changed, new_changed)
}

/// Version hook - snapshots the page after every write, named by its title
pub struct VersionHook {
    versions: VersionStore,
}

impl VersionHook {
    pub fn new(versions: VersionStore) -> Self {
        Self { versions }
    }
}

#[async_trait]
impl PageHook for VersionHook {
    async fn execute(&self, ctx: &mut HookContext, conn: &mut SqliteConnection) -> AppResult<()> {
        if let Some(page) = &ctx.after {
            self.versions
                .create(conn, page.id, &page.title, &page.snapshot(), ctx.user_id)
                .await?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "version_hook"
    }

    fn operations(&self) -> Vec<HookOperation> {
        vec![HookOperation::Create, HookOperation::Update]
    }

    fn timing(&self) -> HookTiming {
        HookTiming::After
    }
}

/// Create the default hook registry for pages
pub fn create_default_hook_registry(
    audits: AuditStore,
    versions: VersionStore,
) -> HookRegistry {
    let mut registry = HookRegistry::new();
    registry.register_hook(Box::new(SlugHook));
    registry.register_hook(Box::new(ValidationHook));
    registry.register_hook(Box::new(AuditHook::new(audits)));
    registry.register_hook(Box::new(VersionHook::new(versions)));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sqlx::Connection;

    async fn conn() -> SqliteConnection {
        SqliteConnection::connect("sqlite::memory:").await.unwrap()
    }

    fn base() -> Arc<Value> {
        Arc::new(json!({"category": "post", "sections": [
            {"slug": "hero", "fields": {"title": {"type": "string", "required": true}}}
        ]}))
    }

    fn ctx(input: PageInput) -> HookContext {
        HookContext::new(HookOperation::Create, None, base()).with_input(input)
    }

    #[tokio::test]
    async fn test_slug_hook_fills_missing_slug() {
        let mut ctx = ctx(PageInput {
            title: "Hello World".to_string(),
            ..Default::default()
        });
        SlugHook.execute(&mut ctx, &mut conn().await).await.unwrap();
        assert_eq!(ctx.input.unwrap().slug.as_deref(), Some("hello-world"));
    }

    #[tokio::test]
    async fn test_validation_hook_accepts_encoded_content() {
        let content = json!({"sections": {"hero": {"fields": {"title": "Hi"}}}});
        let mut ctx = ctx(PageInput {
            title: "Home".to_string(),
            json: Some(Value::String(content.to_string())),
            ..Default::default()
        });
        ValidationHook.execute(&mut ctx, &mut conn().await).await.unwrap();
    }

    #[tokio::test]
    async fn test_validation_hook_rejects_malformed_and_invalid() {
        let mut malformed = ctx(PageInput {
            title: "Home".to_string(),
            json: Some(Value::String("{oops".to_string())),
            ..Default::default()
        });
        assert!(matches!(
            ValidationHook.execute(&mut malformed, &mut conn().await).await,
            Err(AppError::MalformedContent(_))
        ));

        let mut missing = ctx(PageInput {
            title: "Home".to_string(),
            json: Some(json!({"sections": {}})),
            ..Default::default()
        });
        assert!(matches!(
            ValidationHook.execute(&mut missing, &mut conn().await).await,
            Err(AppError::Validation(_))
        ));

        let mut untitled = ctx(PageInput::default());
        assert!(matches!(
            ValidationHook.execute(&mut untitled, &mut conn().await).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_schema_override_relaxes_validation() {
        let mut ctx = ctx(PageInput {
            title: "Landing".to_string(),
            json: Some(json!({})),
            schema: Some(json!({"sections": []})),
            ..Default::default()
        });
        ValidationHook.execute(&mut ctx, &mut conn().await).await.unwrap();
    }

    #[test]
    fn test_changed_attributes() {
        let old = json!({"title": "A", "json": {"x": 1}}).as_object().unwrap().clone();
        let new = json!({"title": "B", "json": {"x": 1}}).as_object().unwrap().clone();
        let (event, old_changed, new_changed) = changed_attributes(old, new);
        assert_eq!(event, AuditEvent::Updated);
        assert_eq!(Value::Object(old_changed), json!({"title": "A"}));
        assert_eq!(Value::Object(new_changed), json!({"title": "B"}));
    }

    #[test]
    fn test_changed_attributes_records_removed_keys() {
        let old = json!({"title": "A", "meta_excerpt": "Short"}).as_object().unwrap().clone();
        let new = json!({"title": "A"}).as_object().unwrap().clone();
        let (_, old_changed, new_changed) = changed_attributes(old, new);
        assert_eq!(Value::Object(old_changed), json!({"meta_excerpt": "Short"}));
        assert_eq!(Value::Object(new_changed), json!({"meta_excerpt": null}));
    }

    #[tokio::test]
    async fn test_slug_hook_keeps_non_ascii_titles() {
        let mut ctx = ctx(PageInput {
            title: "東京 ganda".to_string(),
            ..Default::default()
        });
        SlugHook.execute(&mut ctx, &mut conn().await).await.unwrap();
        assert_eq!(ctx.input.unwrap().slug.as_deref(), Some("東京-ganda"));
    }

    #[tokio::test]
    async fn test_slug_hook_rejects_titles_without_letters() {
        let mut ctx = ctx(PageInput {
            title: "!!!".to_string(),
            ..Default::default()
        });
        assert!(matches!(
            SlugHook.execute(&mut ctx, &mut conn().await).await,
            Err(AppError::Validation(_))
        ));
    }
}
