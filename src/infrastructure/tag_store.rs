use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::core::slugify;
use crate::error::{AppError, AppResult};
use crate::models::Tag;

#[derive(Clone)]
pub struct TagStore {
    pool: SqlitePool,
}

impl TagStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Add tags to a page; tags it already carries are left alone. A name
    /// without any letter or digit is rejected.
    pub async fn tag(&self, conn: &mut SqliteConnection, page_id: i64, names: &[String]) -> AppResult<()> {
        for name in names {
            let name = name.trim();
            let slug = slugify(name);
            if slug.is_empty() {
                return Err(AppError::Validation(format!(
                    "Tag '{}' must contain a letter or digit",
                    name
                )));
            }
            sqlx::query(
                "INSERT OR IGNORE INTO page_tags (page_id, tag_name, tag_slug) VALUES (?, ?, ?)",
            )
            .bind(page_id)
            .bind(name)
            .bind(slug)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    pub async fn untag(&self, conn: &mut SqliteConnection, page_id: i64, names: &[String]) -> AppResult<()> {
        for name in names {
            sqlx::query("DELETE FROM page_tags WHERE page_id = ? AND tag_slug = ?")
                .bind(page_id)
                .bind(slugify(name))
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }

    /// Replace every tag of a page. Run inside a transaction so a rejected
    /// name leaves the previous tags in place.
    pub async fn retag(&self, conn: &mut SqliteConnection, page_id: i64, names: &[String]) -> AppResult<()> {
        sqlx::query("DELETE FROM page_tags WHERE page_id = ?")
            .bind(page_id)
            .execute(&mut *conn)
            .await?;
        self.tag(conn, page_id, names).await
    }

    pub async fn tags(&self, page_id: i64) -> AppResult<Vec<Tag>> {
        let rows = sqlx::query(
            "SELECT tag_name, tag_slug FROM page_tags WHERE page_id = ? ORDER BY tag_slug",
        )
        .bind(page_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| -> AppResult<Tag> {
                Ok(Tag {
                    name: row.try_get("tag_name")?,
                    slug: row.try_get("tag_slug")?,
                })
            })
            .collect()
    }

    pub async fn tag_names(&self, page_id: i64) -> AppResult<Vec<String>> {
        Ok(self.tags(page_id).await?.into_iter().map(|t| t.name).collect())
    }
}
