use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::core::{current_time_millis, from_millis};
use crate::error::AppResult;
use crate::models::PageView;

pub const PAGE_VIEWED: &str = "page viewed";

/// Page view analytics events
#[derive(Clone)]
pub struct ViewStore {
    pool: SqlitePool,
}

impl ViewStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn record_view(&self, page_id: i64) -> AppResult<PageView> {
        let now = current_time_millis();
        let result = sqlx::query(
            "INSERT INTO analytic_events (model_id, event_type, created_at) VALUES (?, ?, ?)",
        )
        .bind(page_id)
        .bind(PAGE_VIEWED)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(PageView {
            id: result.last_insert_rowid(),
            model_id: page_id,
            event_type: PAGE_VIEWED.to_string(),
            created_at: from_millis(now),
        })
    }

    /// Views of a page between `start` and `end`, both inclusive.
    pub async fn views(
        &self,
        page_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<PageView>> {
        let rows = sqlx::query(
            "SELECT id, model_id, event_type, created_at FROM analytic_events WHERE model_id = ? AND event_type = ? AND created_at >= ? AND created_at <= ? ORDER BY created_at",
        )
        .bind(page_id)
        .bind(PAGE_VIEWED)
        .bind(start.timestamp_millis())
        .bind(end.timestamp_millis())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> AppResult<PageView> {
                Ok(PageView {
                    id: row.try_get("id")?,
                    model_id: row.try_get("model_id")?,
                    event_type: row.try_get("event_type")?,
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
    use chrono::Duration;

    #[tokio::test]
    async fn test_views_in_range() {
        let db = SqliteDatabase::new_in_memory().await.unwrap();
        let views = ViewStore::new(db.pool().clone());
        views.record_view(1).await.unwrap();
        views.record_view(1).await.unwrap();
        views.record_view(2).await.unwrap();

        let now = Utc::now();
        let recent = views.views(1, now - Duration::days(1), now + Duration::seconds(1)).await.unwrap();
        assert_eq!(recent.len(), 2);

        let past = views
            .views(1, now - Duration::days(10), now - Duration::days(5))
            .await
            .unwrap();
        assert!(past.is_empty());
    }
}
