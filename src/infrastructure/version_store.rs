use sqlx::{sqlite::SqliteRow, Row, SqliteConnection, SqlitePool};

use crate::core::{current_time_millis, from_millis};
use crate::error::{AppError, AppResult};
use crate::models::{PageSnapshot, PageVersion};

/// Numbered snapshots of page state
#[derive(Clone)]
pub struct VersionStore {
    pool: SqlitePool,
}

impl VersionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Store `snapshot` as the next version of the page. Run inside the
    /// transaction of the page write so the number stays unique.
    pub async fn create(
        &self,
        conn: &mut SqliteConnection,
        page_id: i64,
        name: &str,
        snapshot: &PageSnapshot,
        user_id: Option<i64>,
    ) -> AppResult<PageVersion> {
        let next: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(version), 0) + 1 FROM page_versions WHERE page_id = ?",
        )
        .bind(page_id)
        .fetch_one(&mut *conn)
        .await?;

        let now = current_time_millis();
        sqlx::query(
            "INSERT INTO page_versions (page_id, version, name, model_data, user_id, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(page_id)
        .bind(next)
        .bind(name)
        .bind(serde_json::to_string(snapshot)?)
        .bind(user_id)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to version page {}: {}", page_id, e)))?;

        Ok(PageVersion {
            page_id,
            version: next,
            name: name.to_string(),
            snapshot: snapshot.clone(),
            user_id,
            created_at: from_millis(now),
        })
    }

    pub async fn for_page(&self, page_id: i64) -> AppResult<Vec<PageVersion>> {
        let rows = sqlx::query(
            "SELECT page_id, version, name, model_data, user_id, created_at FROM page_versions WHERE page_id = ? ORDER BY version",
        )
        .bind(page_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(version_from_row).collect()
    }

    pub async fn get(&self, page_id: i64, version: i64) -> AppResult<Option<PageVersion>> {
        let row = sqlx::query(
            "SELECT page_id, version, name, model_data, user_id, created_at FROM page_versions WHERE page_id = ? AND version = ?",
        )
        .bind(page_id)
        .bind(version)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(version_from_row).transpose()
    }
}

fn version_from_row(row: &SqliteRow) -> AppResult<PageVersion> {
    let model_data: String = row.try_get("model_data")?;
    Ok(PageVersion {
        page_id: row.try_get("page_id")?,
        version: row.try_get("version")?,
        name: row.try_get("name")?,
        snapshot: serde_json::from_str(&model_data)?,
        user_id: row.try_get("user_id")?,
        created_at: from_millis(row.try_get("created_at")?),
    })
}
