use serde_json::{Map, Value};
use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::core::{current_time_millis, from_millis};
use crate::error::{AppError, AppResult};
use crate::models::{AuditEvent, AuditRecord};

#[derive(Clone)]
pub struct AuditStore {
    pool: SqlitePool,
}

impl AuditStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn record(
        &self,
        conn: &mut SqliteConnection,
        page_id: i64,
        event: AuditEvent,
        old_values: &Map<String, Value>,
        new_values: &Map<String, Value>,
        user_id: Option<i64>,
    ) -> AppResult<i64> {
        let result = sqlx::query(
            "INSERT INTO page_audits (page_id, event, old_values, new_values, user_id, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(page_id)
        .bind(event.as_str())
        .bind(serde_json::to_string(old_values)?)
        .bind(serde_json::to_string(new_values)?)
        .bind(user_id)
        .bind(current_time_millis())
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to audit page {}: {}", page_id, e)))?;
        Ok(result.last_insert_rowid())
    }

    /// Audit trail of a page, oldest first
    pub async fn for_page(&self, page_id: i64) -> AppResult<Vec<AuditRecord>> {
        let rows = sqlx::query(
            "SELECT id, page_id, event, old_values, new_values, user_id, created_at FROM page_audits WHERE page_id = ? ORDER BY id",
        )
        .bind(page_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to get audits for page {}: {}", page_id, e)))?;

        rows.into_iter()
            .map(|row| -> AppResult<AuditRecord> {
                let event: String = row.try_get("event")?;
                let old_values: String = row.try_get("old_values")?;
                let new_values: String = row.try_get("new_values")?;
                Ok(AuditRecord {
                    id: row.try_get("id")?,
                    page_id: row.try_get("page_id")?,
                    event: AuditEvent::parse(&event).ok_or_else(|| {
                        AppError::DatabaseError(format!("Unknown audit event {}", event))
                    })?,
                    old_values: serde_json::from_str(&old_values)?,
                    new_values: serde_json::from_str(&new_values)?,
                    user_id: row.try_get("user_id")?,
                    created_at: from_millis(row.try_get("created_at")?),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::sqlite_database::SqliteDatabase;
    use serde_json::json;

    #[tokio::test]
    async fn test_record_and_list() {
        let db = SqliteDatabase::new_in_memory().await.unwrap();
        let audits = AuditStore::new(db.pool().clone());
        let old = json!({"title": "A"}).as_object().unwrap().clone();
        let new = json!({"title": "B"}).as_object().unwrap().clone();

        let mut tx = db.pool().begin().await.unwrap();
        audits
            .record(&mut tx, 1, AuditEvent::Updated, &old, &new, Some(3))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let trail = audits.for_page(1).await.unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].event, AuditEvent::Updated);
        assert_eq!(trail[0].old_values["title"], "A");
        assert_eq!(trail[0].user_id, Some(3));
        assert!(audits.for_page(2).await.unwrap().is_empty());
    }
}
