// Base schema storage - the canonical page schema read once from disk

use once_cell::sync::OnceCell;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::error::{AppError, AppResult};

/// Holds the base page schema. The document is read on first use (or by an
/// explicit [`SchemaStore::preload`] at startup) and never reloaded.
#[derive(Debug)]
pub struct SchemaStore {
    path: PathBuf,
    base: OnceCell<Arc<Value>>,
}

impl SchemaStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            base: OnceCell::new(),
        }
    }

    /// Build a store around an already-parsed schema.
    pub fn from_value(schema: Value) -> AppResult<Self> {
        ensure_object(&schema, Path::new("<inline>"))?;
        let store = Self::new("<inline>");
        // A fresh cell is always empty
        let _ = store.base.set(Arc::new(schema));
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the schema now; a failure here is a fatal configuration error.
    pub fn preload(&self) -> AppResult<()> {
        self.base().map(|_| ())
    }

    pub fn base(&self) -> AppResult<Arc<Value>> {
        self.base
            .get_or_try_init(|| load_schema(&self.path).map(Arc::new))
            .cloned()
    }
}

fn load_schema(path: &Path) -> AppResult<Value> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        AppError::ConfigurationError(format!(
            "Failed to read base schema {}: {}",
            path.display(),
            e
        ))
    })?;
    let schema: Value = serde_json::from_str(&raw).map_err(|e| {
        AppError::ConfigurationError(format!(
            "Base schema {} is not valid JSON: {}",
            path.display(),
            e
        ))
    })?;
    ensure_object(&schema, path)?;
    info!("Loaded base schema from {}", path.display());
    Ok(schema)
}

fn ensure_object(schema: &Value, path: &Path) -> AppResult<()> {
    if schema.is_object() {
        Ok(())
    } else {
        Err(AppError::ConfigurationError(format!(
            "Base schema {} must be a JSON object",
            path.display()
        )))
    }
}
