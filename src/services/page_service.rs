// PageService - page persistence with lifecycle hooks and derived fields
// This sits above the stores and is what HTTP handlers talk to.

use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;

use crate::{
    content::SchemaStore,
    ent_framework::{create_default_hook_registry, HookContext, HookOperation, HookRegistry, HookTiming},
    error::{AppError, AppResult},
    infrastructure::{
        middleware::Viewer, AuditStore, MetaStore, PageQuery, PageStore, SqliteDatabase, TagStore,
        TrashedScope, VersionStore, ViewStore,
    },
    models::{AuditRecord, Page, PageInput, PageResource, PageVersion, PageView},
};

/// Default look-back window for view analytics
pub const DEFAULT_VIEW_WINDOW_DAYS: i64 = 30;

pub struct PageService {
    pool: SqlitePool,
    schemas: Arc<SchemaStore>,
    pages: PageStore,
    audits: AuditStore,
    versions: VersionStore,
    tags: TagStore,
    meta: MetaStore,
    views: ViewStore,
    hooks: HookRegistry,
}

// Every mutation runs its before-hooks, the store write and its after-hooks
// in one transaction: a failing hook leaves no page, audit or version behind.
impl PageService {
    pub fn new(db: &SqliteDatabase, schemas: Arc<SchemaStore>) -> Self {
        let pool = db.pool().clone();
        let audits = AuditStore::new(pool.clone());
        let versions = VersionStore::new(pool.clone());
        let hooks = create_default_hook_registry(audits.clone(), versions.clone());
        Self {
            schemas,
            pages: PageStore::new(pool.clone()),
            audits,
            versions,
            tags: TagStore::new(pool.clone()),
            meta: MetaStore::new(pool.clone()),
            views: ViewStore::new(pool.clone()),
            hooks,
            pool,
        }
    }

    /// Replace the hook registry, e.g. to add project-specific hooks.
    pub fn with_hooks(mut self, hooks: HookRegistry) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn base_schema(&self) -> AppResult<Arc<Value>> {
        self.schemas.base()
    }

    pub async fn create(&self, input: PageInput, viewer: &Viewer) -> AppResult<Page> {
        let mut ctx = HookContext::new(HookOperation::Create, viewer.user_id, self.base_schema()?)
            .with_input(input);
        let mut tx = self.pool.begin().await?;
        self.hooks
            .execute_hooks(HookOperation::Create, HookTiming::Before, &mut ctx, &mut tx)
            .await?;

        let input = take_input(&mut ctx)?;
        let page = self.pages.insert(&mut tx, &input, viewer.user_id).await?;

        ctx.page_id = Some(page.id);
        ctx.after = Some(page.clone());
        self.hooks
            .execute_hooks(HookOperation::Create, HookTiming::After, &mut ctx, &mut tx)
            .await?;
        tx.commit().await?;
        info!("Created page {} ({})", page.id, page.title);
        Ok(page)
    }

    pub async fn update(&self, id: i64, input: PageInput, viewer: &Viewer) -> AppResult<Page> {
        let mut tx = self.pool.begin().await?;
        let before = PageStore::find_or_fail_on(&mut tx, id, TrashedScope::Default).await?;
        let mut ctx = HookContext::new(HookOperation::Update, viewer.user_id, self.base_schema()?)
            .with_before(before)
            .with_input(input);
        self.hooks
            .execute_hooks(HookOperation::Update, HookTiming::Before, &mut ctx, &mut tx)
            .await?;

        let input = take_input(&mut ctx)?;
        let page = self.pages.update(&mut tx, id, &input).await?;

        ctx.after = Some(page.clone());
        self.hooks
            .execute_hooks(HookOperation::Update, HookTiming::After, &mut ctx, &mut tx)
            .await?;
        tx.commit().await?;
        info!("Updated page {}", page.id);
        Ok(page)
    }

    /// Soft delete: the row stays and can be restored.
    pub async fn delete(&self, id: i64, viewer: &Viewer) -> AppResult<Page> {
        let mut tx = self.pool.begin().await?;
        let before = PageStore::find_or_fail_on(&mut tx, id, TrashedScope::Default).await?;
        let mut ctx = HookContext::new(HookOperation::Delete, viewer.user_id, self.base_schema()?)
            .with_before(before);
        self.hooks
            .execute_hooks(HookOperation::Delete, HookTiming::Before, &mut ctx, &mut tx)
            .await?;

        let page = self.pages.soft_delete(&mut tx, id).await?;

        ctx.after = Some(page.clone());
        self.hooks
            .execute_hooks(HookOperation::Delete, HookTiming::After, &mut ctx, &mut tx)
            .await?;
        tx.commit().await?;
        info!("Deleted page {}", page.id);
        Ok(page)
    }

    pub async fn restore(&self, id: i64, viewer: &Viewer) -> AppResult<Page> {
        let mut tx = self.pool.begin().await?;
        let before = PageStore::find_or_fail_on(&mut tx, id, TrashedScope::OnlyTrashed).await?;
        let mut ctx = HookContext::new(HookOperation::Restore, viewer.user_id, self.base_schema()?)
            .with_before(before);
        self.hooks
            .execute_hooks(HookOperation::Restore, HookTiming::Before, &mut ctx, &mut tx)
            .await?;

        let page = self.pages.restore(&mut tx, id).await?;

        ctx.after = Some(page.clone());
        self.hooks
            .execute_hooks(HookOperation::Restore, HookTiming::After, &mut ctx, &mut tx)
            .await?;
        tx.commit().await?;
        info!("Restored page {}", page.id);
        Ok(page)
    }

    pub async fn find(&self, id: i64, scope: TrashedScope) -> AppResult<Page> {
        self.pages.find_or_fail(id, scope).await
    }

    /// API representation with derived fields recomputed from current state
    pub async fn resource(&self, page: &Page) -> AppResult<PageResource> {
        let base = self.base_schema()?;
        let tags = self.tags.tag_names(page.id).await?;
        Ok(page.to_resource(&base, tags))
    }

    pub async fn show(&self, id: i64, scope: TrashedScope) -> AppResult<PageResource> {
        let page = self.find(id, scope).await?;
        self.resource(&page).await
    }

    pub async fn list(&self, query: &PageQuery) -> AppResult<Vec<PageResource>> {
        let pages = self.pages.list(query).await?;
        let mut resources = Vec::with_capacity(pages.len());
        for page in &pages {
            resources.push(self.resource(page).await?);
        }
        Ok(resources)
    }

    pub async fn versions(&self, id: i64) -> AppResult<Vec<PageVersion>> {
        self.find(id, TrashedScope::WithTrashed).await?;
        self.versions.for_page(id).await
    }

    /// Re-apply a stored version; the revert itself becomes a new version.
    pub async fn revert(&self, id: i64, version: i64, viewer: &Viewer) -> AppResult<Page> {
        let stored = self
            .versions
            .get(id, version)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Version {} of page {} not found", version, id)))?;
        info!("Reverting page {} to version {} ({})", id, version, stored.name);
        self.update(id, stored.snapshot.into(), viewer).await
    }

    pub async fn audits(&self, id: i64) -> AppResult<Vec<AuditRecord>> {
        self.find(id, TrashedScope::WithTrashed).await?;
        self.audits.for_page(id).await
    }

    pub async fn tag(&self, id: i64, names: &[String]) -> AppResult<Vec<String>> {
        self.find(id, TrashedScope::Default).await?;
        let mut tx = self.pool.begin().await?;
        self.tags.tag(&mut tx, id, names).await?;
        tx.commit().await?;
        self.tags.tag_names(id).await
    }

    pub async fn untag(&self, id: i64, names: &[String]) -> AppResult<Vec<String>> {
        self.find(id, TrashedScope::Default).await?;
        let mut tx = self.pool.begin().await?;
        self.tags.untag(&mut tx, id, names).await?;
        tx.commit().await?;
        self.tags.tag_names(id).await
    }

    pub async fn retag(&self, id: i64, names: &[String]) -> AppResult<Vec<String>> {
        self.find(id, TrashedScope::Default).await?;
        let mut tx = self.pool.begin().await?;
        self.tags.retag(&mut tx, id, names).await?;
        tx.commit().await?;
        self.tags.tag_names(id).await
    }

    pub async fn meta(&self, id: i64) -> AppResult<Map<String, Value>> {
        self.find(id, TrashedScope::WithTrashed).await?;
        self.meta.all_meta(id).await
    }

    pub async fn get_meta(&self, id: i64, key: &str) -> AppResult<Option<Value>> {
        self.find(id, TrashedScope::WithTrashed).await?;
        self.meta.get_meta(id, key).await
    }

    /// Set metadata entries; `null` values remove the key.
    pub async fn set_meta(&self, id: i64, entries: Map<String, Value>) -> AppResult<Map<String, Value>> {
        self.find(id, TrashedScope::Default).await?;
        let mut tx = self.pool.begin().await?;
        for (key, value) in &entries {
            if value.is_null() {
                self.meta.unset_meta(&mut tx, id, key).await?;
            } else {
                self.meta.set_meta(&mut tx, id, key, value).await?;
            }
        }
        let meta = MetaStore::all_meta_on(&mut tx, id).await?;
        tx.commit().await?;
        Ok(meta)
    }

    pub async fn record_view(&self, id: i64) -> AppResult<PageView> {
        self.find(id, TrashedScope::Default).await?;
        self.views.record_view(id).await
    }

    /// Views between `start` and `end`; the window defaults to the 30 days up to `end`.
    pub async fn views(
        &self,
        id: i64,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<PageView>> {
        self.find(id, TrashedScope::WithTrashed).await?;
        let end = end.unwrap_or_else(Utc::now);
        let start = start.unwrap_or_else(|| end - Duration::days(DEFAULT_VIEW_WINDOW_DAYS));
        if start > end {
            return Err(AppError::BadRequest("startDate must not be after endDate".to_string()));
        }
        self.views.views(id, start, end).await
    }
}

fn take_input(ctx: &mut HookContext) -> AppResult<PageInput> {
    ctx.input
        .take()
        .ok_or_else(|| AppError::Internal("Hook removed page input".to_string()))
}
