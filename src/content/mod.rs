// Page content model - payload resolution, schema merging and derived fields

pub mod extractors;
pub mod markdown;
pub mod merger;
pub mod resolver;
pub mod schema_store;
pub mod sections;
pub mod validation;

pub use extractors::{is_default_page, thumbnail, versions_count};
pub use markdown::render_markdown;
pub use merger::effective_schema;
pub use resolver::{content, raw_or_empty, try_content};
pub use schema_store::SchemaStore;
pub use validation::validate_content;
