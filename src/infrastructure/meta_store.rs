use serde_json::{Map, Value};
use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::error::AppResult;

/// Free-form key/value metadata attached to pages
#[derive(Clone)]
pub struct MetaStore {
    pool: SqlitePool,
}

impl MetaStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn set_meta(
        &self,
        conn: &mut SqliteConnection,
        page_id: i64,
        key: &str,
        value: &Value,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO page_meta (page_id, key, value) VALUES (?, ?, ?) ON CONFLICT(page_id, key) DO UPDATE SET value = excluded.value",
        )
        .bind(page_id)
        .bind(key)
        .bind(serde_json::to_string(value)?)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn get_meta(&self, page_id: i64, key: &str) -> AppResult<Option<Value>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM page_meta WHERE page_id = ? AND key = ?")
                .bind(page_id)
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value.map(|v| serde_json::from_str(&v)).transpose()?)
    }

    pub async fn all_meta(&self, page_id: i64) -> AppResult<Map<String, Value>> {
        let mut conn = self.pool.acquire().await?;
        Self::all_meta_on(&mut conn, page_id).await
    }

    pub async fn all_meta_on(conn: &mut SqliteConnection, page_id: i64) -> AppResult<Map<String, Value>> {
        let rows = sqlx::query("SELECT key, value FROM page_meta WHERE page_id = ? ORDER BY key")
            .bind(page_id)
            .fetch_all(&mut *conn)
            .await?;

        let mut meta = Map::new();
        for row in rows {
            let key: String = row.try_get("key")?;
            let value: String = row.try_get("value")?;
            meta.insert(key, serde_json::from_str(&value)?);
        }
        Ok(meta)
    }

    pub async fn unset_meta(&self, conn: &mut SqliteConnection, page_id: i64, key: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM page_meta WHERE page_id = ? AND key = ?")
            .bind(page_id)
            .bind(key)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::sqlite_database::SqliteDatabase;
    use serde_json::json;

    #[tokio::test]
    async fn test_meta_lifecycle() {
        let db = SqliteDatabase::new_in_memory().await.unwrap();
        let meta = MetaStore::new(db.pool().clone());

        let mut conn = db.pool().acquire().await.unwrap();
        meta.set_meta(&mut conn, 1, "meta_excerpt", &json!("Short")).await.unwrap();
        meta.set_meta(&mut conn, 1, "meta_excerpt", &json!("Shorter")).await.unwrap();
        meta.set_meta(&mut conn, 1, "order", &json!(3)).await.unwrap();
        assert_eq!(MetaStore::all_meta_on(&mut conn, 1).await.unwrap().len(), 2);
        assert!(meta.unset_meta(&mut conn, 1, "order").await.unwrap());
        assert!(!meta.unset_meta(&mut conn, 1, "order").await.unwrap());
        drop(conn);

        assert_eq!(meta.get_meta(1, "meta_excerpt").await.unwrap(), Some(json!("Shorter")));
        assert_eq!(meta.all_meta(1).await.unwrap().len(), 1);
        assert_eq!(meta.get_meta(2, "meta_excerpt").await.unwrap(), None);
    }
}
