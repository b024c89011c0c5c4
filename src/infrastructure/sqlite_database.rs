use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use crate::error::{AppError, AppResult};

/// SQLite connection pool holding pages and their satellite tables
#[derive(Clone)]
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    pub async fn connect(url: &str) -> AppResult<Self> {
        if let Some(parent) = database_file(url).and_then(|file| file.parent()) {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AppError::ConfigurationError(format!(
                        "Failed to create database directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| AppError::ConfigurationError(format!("Invalid database URL {}: {}", url, e)))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect to {}: {}", url, e)))?;

        let db = Self { pool };
        db.initialize().await?;
        info!("Connected to {}", url);
        Ok(db)
    }

    pub async fn new_in_memory() -> AppResult<Self> {
        // One connection only: every in-memory connection is its own database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to connect to in-memory SQLite: {}", e))
            })?;

        let db = Self { pool };
        db.initialize().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create page tables if they do not exist yet
    pub async fn initialize(&self) -> AppResult<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS pages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                slug TEXT,
                json TEXT,
                schema TEXT,
                user_id INTEGER,
                deleted_at INTEGER,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS page_audits (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                page_id INTEGER NOT NULL,
                event TEXT NOT NULL,
                old_values TEXT NOT NULL,
                new_values TEXT NOT NULL,
                user_id INTEGER,
                created_at INTEGER NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS page_versions (
                page_id INTEGER NOT NULL,
                version INTEGER NOT NULL,
                name TEXT NOT NULL,
                model_data TEXT NOT NULL,
                user_id INTEGER,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (page_id, version)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS page_tags (
                page_id INTEGER NOT NULL,
                tag_name TEXT NOT NULL,
                tag_slug TEXT NOT NULL,
                PRIMARY KEY (page_id, tag_slug)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS page_meta (
                page_id INTEGER NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (page_id, key)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS analytic_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                model_id INTEGER NOT NULL,
                event_type TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_pages_deleted_at ON pages(deleted_at)",
            "CREATE INDEX IF NOT EXISTS idx_page_audits_page ON page_audits(page_id, id)",
            "CREATE INDEX IF NOT EXISTS idx_page_tags_slug ON page_tags(tag_slug)",
            "CREATE INDEX IF NOT EXISTS idx_analytic_events_model ON analytic_events(model_id, event_type, created_at)",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to initialize schema: {}", e)))?;
        }
        Ok(())
    }
}

/// Path of the database file behind a `sqlite:` URL, if it names one.
fn database_file(url: &str) -> Option<&Path> {
    let rest = url.strip_prefix("sqlite:")?;
    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let file = rest.split('?').next()?;
    if file.is_empty() || file == ":memory:" {
        return None;
    }
    Some(Path::new(file))
}

pub(crate) fn encode_json(value: &Option<Value>) -> AppResult<Option<String>> {
    value
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(AppError::from)
}

pub(crate) fn decode_json(column: Option<String>) -> AppResult<Option<Value>> {
    column
        .map(|text| serde_json::from_str(&text))
        .transpose()
        .map_err(AppError::from)
}
