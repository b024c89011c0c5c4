// Page persistence. Soft-deleted rows are excluded by the default query
// builder unless a query explicitly asks for them.

use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use super::sqlite_database::{decode_json, encode_json};
use crate::core::{current_time_millis, from_millis};
use crate::error::{AppError, AppResult};
use crate::models::{Page, PageInput};

const PAGE_COLUMNS: &str =
    "p.id, p.title, p.slug, p.json, p.schema, p.user_id, p.deleted_at, p.created_at, p.updated_at";

/// Which rows a query sees with respect to soft deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrashedScope {
    #[default]
    Default,
    WithTrashed,
    OnlyTrashed,
}

#[derive(Debug, Clone, Default)]
pub struct PageQuery {
    pub scope: TrashedScope,
    /// Free-text match against title, slug and the stored payload
    pub search: Option<String>,
    /// Tag slug the page must carry
    pub tag: Option<String>,
    pub limit: Option<i64>,
}

impl PageQuery {
    pub fn with_scope(mut self, scope: TrashedScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn tagged(mut self, tag_slug: impl Into<String>) -> Self {
        self.tag = Some(tag_slug.into());
        self
    }

    /// Start a SELECT over pages with every filter of this query applied.
    pub fn builder(&self) -> QueryBuilder<'static, Sqlite> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM pages p WHERE 1 = 1", PAGE_COLUMNS));
        apply_scope(&mut qb, self.scope);

        if let Some(tag) = &self.tag {
            qb.push(" AND EXISTS (SELECT 1 FROM page_tags t WHERE t.page_id = p.id AND t.tag_slug = ");
            qb.push_bind(tag.clone());
            qb.push(")");
        }

        if let Some(term) = self.search.as_deref().filter(|t| !t.is_empty()) {
            let pattern = format!("%{}%", escape_like(term));
            qb.push(" AND (p.title LIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" ESCAPE '\\' OR p.slug LIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" ESCAPE '\\' OR p.json LIKE ");
            qb.push_bind(pattern);
            qb.push(" ESCAPE '\\')");
        }

        qb.push(" ORDER BY p.id");
        if let Some(limit) = self.limit {
            qb.push(" LIMIT ");
            qb.push_bind(limit);
        }
        qb
    }
}

/// Escape `LIKE` wildcards so the term matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn apply_scope(qb: &mut QueryBuilder<'static, Sqlite>, scope: TrashedScope) {
    match scope {
        TrashedScope::Default => {
            qb.push(" AND p.deleted_at IS NULL");
        }
        TrashedScope::OnlyTrashed => {
            qb.push(" AND p.deleted_at IS NOT NULL");
        }
        TrashedScope::WithTrashed => {}
    }
}

#[derive(Clone)]
pub struct PageStore {
    pool: SqlitePool,
}

// Writes take the caller's connection so they commit together with the
// audit and version rows of the same mutation.
impl PageStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        conn: &mut SqliteConnection,
        input: &PageInput,
        user_id: Option<i64>,
    ) -> AppResult<Page> {
        let now = current_time_millis();
        let result = sqlx::query(
            "INSERT INTO pages (title, slug, json, schema, user_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&input.title)
        .bind(&input.slug)
        .bind(encode_json(&input.json)?)
        .bind(encode_json(&input.schema)?)
        .bind(user_id)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create page: {}", e)))?;

        let id = result.last_insert_rowid();
        debug!("Inserted page {}", id);
        Self::find_on(conn, id, TrashedScope::Default)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Page with id {} not found", id)))
    }

    pub async fn find(&self, id: i64, scope: TrashedScope) -> AppResult<Option<Page>> {
        let mut conn = self.pool.acquire().await?;
        Self::find_on(&mut conn, id, scope).await
    }

    /// Look a page up on an already open connection or transaction.
    pub async fn find_on(
        conn: &mut SqliteConnection,
        id: i64,
        scope: TrashedScope,
    ) -> AppResult<Option<Page>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM pages p WHERE p.id = ", PAGE_COLUMNS));
        qb.push_bind(id);
        apply_scope(&mut qb, scope);

        let row = qb
            .build()
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to get page {}: {}", id, e)))?;
        row.as_ref().map(page_from_row).transpose()
    }

    pub async fn find_or_fail(&self, id: i64, scope: TrashedScope) -> AppResult<Page> {
        self.find(id, scope).await?.ok_or_else(|| not_found(id))
    }

    pub async fn find_or_fail_on(
        conn: &mut SqliteConnection,
        id: i64,
        scope: TrashedScope,
    ) -> AppResult<Page> {
        Self::find_on(conn, id, scope).await?.ok_or_else(|| not_found(id))
    }

    pub async fn list(&self, query: &PageQuery) -> AppResult<Vec<Page>> {
        let rows = query
            .builder()
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to list pages: {}", e)))?;
        rows.iter().map(page_from_row).collect()
    }

    pub async fn update(
        &self,
        conn: &mut SqliteConnection,
        id: i64,
        input: &PageInput,
    ) -> AppResult<Page> {
        let result = sqlx::query(
            "UPDATE pages SET title = ?, slug = ?, json = ?, schema = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(&input.title)
        .bind(&input.slug)
        .bind(encode_json(&input.json)?)
        .bind(encode_json(&input.schema)?)
        .bind(current_time_millis())
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to update page {}: {}", id, e)))?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Self::find_or_fail_on(conn, id, TrashedScope::Default).await
    }

    pub async fn soft_delete(&self, conn: &mut SqliteConnection, id: i64) -> AppResult<Page> {
        let now = current_time_millis();
        let result = sqlx::query(
            "UPDATE pages SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to delete page {}: {}", id, e)))?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Self::find_or_fail_on(conn, id, TrashedScope::OnlyTrashed).await
    }

    pub async fn restore(&self, conn: &mut SqliteConnection, id: i64) -> AppResult<Page> {
        let result = sqlx::query(
            "UPDATE pages SET deleted_at = NULL, updated_at = ? WHERE id = ? AND deleted_at IS NOT NULL",
        )
        .bind(current_time_millis())
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to restore page {}: {}", id, e)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Deleted page with id {} not found", id)));
        }
        Self::find_or_fail_on(conn, id, TrashedScope::Default).await
    }
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Page with id {} not found", id))
}

fn page_from_row(row: &SqliteRow) -> AppResult<Page> {
    Ok(Page {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        raw_content: decode_json(row.try_get("json")?)?,
        schema_override: decode_json(row.try_get("schema")?)?,
        user_id: row.try_get("user_id")?,
        deleted_at: row.try_get::<Option<i64>, _>("deleted_at")?.map(from_millis),
        created_at: from_millis(row.try_get("created_at")?),
        updated_at: from_millis(row.try_get("updated_at")?),
    })
}
