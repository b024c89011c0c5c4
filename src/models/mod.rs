pub mod page;
pub mod records;

pub use page::{Page, PageInput, PageResource, PageSnapshot, AUDIT_INCLUDE};
pub use records::{AuditEvent, AuditRecord, PageVersion, PageView, Tag};
