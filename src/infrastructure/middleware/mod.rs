pub mod viewer_context_extractor;

pub use viewer_context_extractor::Viewer;
