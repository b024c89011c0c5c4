// Core infrastructure modules
pub mod audit_store;           // Audit trail of page mutations
pub mod meta_store;            // Page metadata
pub mod middleware;            // Request extractors
pub mod page_store;            // Pages and the soft-delete query scope
pub mod sqlite_database;       // Connection pool and table setup
pub mod tag_store;             // Page tags
pub mod version_store;         // Page version history
pub mod view_store;            // Page view analytics

pub use audit_store::AuditStore;
pub use meta_store::MetaStore;
pub use page_store::{PageQuery, PageStore, TrashedScope};
pub use sqlite_database::SqliteDatabase;
pub use tag_store::TagStore;
pub use version_store::VersionStore;
pub use view_store::ViewStore;
