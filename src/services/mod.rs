pub mod page_service;
pub mod raw_content;

pub use page_service::PageService;
pub use raw_content::RawContentClient;
